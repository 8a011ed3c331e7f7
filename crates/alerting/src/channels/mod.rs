//! Delivery Channels
//!
//! Each channel implements [`ChannelAdapter`]. Adapters receive the
//! configuration snapshot taken for the alert, so settings changed through
//! `update_config` apply from the next alert onwards.

mod console;
mod email;
mod file;
mod webhook;

pub use console::ConsoleChannel;
pub use email::{EmailChannel, EmailMessage, EmailTransport, LogTransport};
pub use file::{FileChannel, FileRecord};
pub use webhook::{WebhookChannel, WebhookPayload};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, Channel};

/// A pluggable delivery backend
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Channel this adapter delivers to
    fn channel(&self) -> Channel;

    /// Attempt to deliver one alert. `Ok(())` is the only positive acknowledgment.
    async fn attempt_deliver(&self, alert: &Alert, config: &AlertingConfig) -> Result<(), DeliveryError>;
}

/// The four built-in adapters, with email going through `transport`
pub fn default_adapters(transport: Arc<dyn EmailTransport>) -> Vec<Arc<dyn ChannelAdapter>> {
    vec![
        Arc::new(ConsoleChannel::new()),
        Arc::new(FileChannel::new()),
        Arc::new(WebhookChannel::new()),
        Arc::new(EmailChannel::new(transport)),
    ]
}

/// Render a payload as `key: value` lines with the given indent
pub(crate) fn payload_lines(payload: &crate::types::Payload, indent: &str) -> String {
    if payload.is_empty() {
        return format!("{}(none)", indent);
    }
    payload
        .iter()
        .map(|(k, v)| format!("{}{}: {}", indent, k, v))
        .collect::<Vec<_>>()
        .join("\n")
}
