//! Webhook Channel

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ChannelAdapter;
use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, AlertKind, Channel, Payload, Severity};

/// JSON body posted to the webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub alert_type: AlertKind,
    pub severity: Severity,
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub data: Payload,
    pub context: Payload,
    pub alert_id: String,
}

impl From<&Alert> for WebhookPayload {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_type: alert.kind.clone(),
            severity: alert.severity,
            event: "performance_alert".to_string(),
            timestamp: alert.timestamp,
            data: alert.data.clone(),
            context: alert.context.clone(),
            alert_id: alert.id.clone(),
        }
    }
}

/// Posts alerts to an HTTP endpoint
#[derive(Debug, Clone, Default)]
pub struct WebhookChannel {
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookChannel {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn attempt_deliver(&self, alert: &Alert, config: &AlertingConfig) -> Result<(), DeliveryError> {
        let webhook = &config.channels.webhook;
        let url = webhook
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| DeliveryError::Misconfigured("webhook URL not set".to_string()))?;

        let mut request = self.client.post(url).json(&WebhookPayload::from(alert));
        for (key, value) in &webhook.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("Webhook {} answered {}", url, status);
            return Err(DeliveryError::Status(status.as_u16()));
        }

        info!("Sent webhook notification for alert {}", alert.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one request, answer with `status`, and hand back the raw request text
    async fn serve_once(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hooks/alerts", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let body_len = text[..head_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= head_end + 4 + body_len
    }

    fn webhook_config(url: String) -> AlertingConfig {
        let mut config = AlertingConfig::default();
        config.channels.enable_webhook = true;
        config.channels.webhook.url = Some(url);
        config
            .channels
            .webhook
            .headers
            .insert("X-Team".to_string(), "db".to_string());
        config
    }

    #[test]
    fn test_payload_shape() {
        let alert = Alert::new(
            AlertKind::HighErrorRate,
            Severity::Critical,
            payload! { "operation" => "checkout", "error_rate" => 0.2 },
            payload! { "region" => "eu-west-1" },
        );

        let body = serde_json::to_value(WebhookPayload::from(&alert)).unwrap();
        assert_eq!(body["alert_type"], "high_error_rate");
        assert_eq!(body["severity"], "critical");
        assert_eq!(body["event"], "performance_alert");
        assert_eq!(body["alert_id"], alert.id.as_str());
        assert_eq!(body["data"]["operation"], "checkout");
        assert_eq!(body["context"]["region"], "eu-west-1");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_missing_url_is_misconfigured() {
        let mut config = AlertingConfig::default();
        config.channels.enable_webhook = true;

        let alert = Alert::new(AlertKind::TestAlert, Severity::Info, payload! {}, payload! {});
        let result = WebhookChannel::new().attempt_deliver(&alert, &config).await;
        assert!(matches!(result, Err(DeliveryError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let mut config = AlertingConfig::default();
        config.channels.enable_webhook = true;
        config.channels.webhook.url = Some("http://127.0.0.1:9/alerts".to_string());

        let alert = Alert::new(AlertKind::TestAlert, Severity::Info, payload! {}, payload! {});
        let result = WebhookChannel::new().attempt_deliver(&alert, &config).await;
        assert!(matches!(result, Err(DeliveryError::Http(_))));
    }

    #[tokio::test]
    async fn test_posts_json_with_configured_headers() {
        let (url, server) = serve_once("200 OK").await;
        let config = webhook_config(url);
        let alert = Alert::new(
            AlertKind::SlowQuery,
            Severity::Warning,
            payload! { "query_name" => "orders_by_user", "duration_ms" => 2500.0 },
            payload! { "endpoint" => "/orders" },
        );

        let result = WebhookChannel::new().attempt_deliver(&alert, &config).await;
        assert!(result.is_ok());

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let head = head.to_ascii_lowercase();
        assert!(head.starts_with("post /hooks/alerts"));
        assert!(head.contains("x-team: db"));
        assert!(head.contains("content-type: application/json"));

        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["alert_type"], "slow_query");
        assert_eq!(body["severity"], "warning");
        assert_eq!(body["event"], "performance_alert");
        assert_eq!(body["alert_id"], alert.id.as_str());
        assert_eq!(body["data"]["query_name"], "orders_by_user");
        assert_eq!(body["context"]["endpoint"], "/orders");
    }

    #[tokio::test]
    async fn test_server_error_is_a_failure() {
        let (url, server) = serve_once("500 Internal Server Error").await;
        let config = webhook_config(url);
        let alert = Alert::new(AlertKind::TestAlert, Severity::Info, payload! {}, payload! {});

        let result = WebhookChannel::new().attempt_deliver(&alert, &config).await;
        assert!(matches!(result, Err(DeliveryError::Status(500))));
        server.await.unwrap();
    }
}
