//! Email Channel
//!
//! Renders the alert and hands it to an [`EmailTransport`]. The crate ships
//! [`LogTransport`], which logs the message instead of sending it; plug an SMTP
//! or provider-API transport in through [`EmailChannel::new`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{payload_lines, ChannelAdapter};
use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, Channel, Payload, PayloadValue, Severity};

/// Rendered email ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// External email-sending collaborator
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Transport that logs the message it would send
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        info!(
            "Would send email to {:?} with subject '{}':\n{}",
            message.to, message.subject, message.text
        );
        Ok(())
    }
}

/// Email delivery through a pluggable transport
pub struct EmailChannel {
    transport: Arc<dyn EmailTransport>,
}

impl EmailChannel {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }

    pub fn subject(alert: &Alert) -> String {
        format!(
            "[{}] Performance Alert: {}",
            alert.severity.as_str().to_uppercase(),
            alert.kind
        )
    }

    pub fn render_text(alert: &Alert) -> String {
        format!(
            "Performance Alert\n\nSeverity: {}\nType: {}\nTime: {}\nAlert ID: {}\n\nData:\n{}\n\nContext:\n{}\n",
            alert.severity.as_str().to_uppercase(),
            alert.kind,
            alert.timestamp.to_rfc3339(),
            alert.id,
            payload_lines(&alert.data, "  "),
            payload_lines(&alert.context, "  "),
        )
    }

    pub fn render_html(alert: &Alert) -> String {
        let color = match alert.severity {
            Severity::Critical => "#d32f2f",
            Severity::Warning => "#f57c00",
            Severity::Info => "#1976d2",
        };
        format!(
            concat!(
                "<html><body>",
                "<h2 style=\"color: {color}\">{severity} Performance Alert: {kind}</h2>",
                "<p><strong>Time:</strong> {time}<br><strong>Alert ID:</strong> {id}</p>",
                "<h3>Data</h3>{data}",
                "<h3>Context</h3>{context}",
                "</body></html>"
            ),
            color = color,
            severity = alert.severity.as_str().to_uppercase(),
            kind = escape_html(alert.kind.as_str()),
            time = alert.timestamp.to_rfc3339(),
            id = escape_html(&alert.id),
            data = html_table(&alert.data),
            context = html_table(&alert.context),
        )
    }

    pub fn build_message(alert: &Alert, config: &AlertingConfig) -> EmailMessage {
        EmailMessage {
            from: config.channels.email.from.clone(),
            to: config.channels.email.recipients.clone(),
            subject: Self::subject(alert),
            html: Self::render_html(alert),
            text: Self::render_text(alert),
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailChannel {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn attempt_deliver(&self, alert: &Alert, config: &AlertingConfig) -> Result<(), DeliveryError> {
        if config.channels.email.recipients.is_empty() {
            return Err(DeliveryError::Misconfigured("no email recipients".to_string()));
        }
        let message = Self::build_message(alert, config);
        self.transport.send(&message).await
    }
}

fn html_table(payload: &Payload) -> String {
    if payload.is_empty() {
        return "<p><em>none</em></p>".to_string();
    }
    let rows: String = payload
        .iter()
        .map(|(k, v)| {
            let value = match v {
                PayloadValue::Map(inner) => html_table(inner),
                other => escape_html(&other.to_string()),
            };
            format!("<tr><th align=\"left\">{}</th><td>{}</td></tr>", escape_html(k), value)
        })
        .collect();
    format!("<table>{}</table>", rows)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
