//! Console Channel

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{payload_lines, ChannelAdapter};
use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, Channel, Severity};

/// Emits a multi-line record through the process log
#[derive(Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }

    /// Human-readable record for one alert
    pub fn render(alert: &Alert) -> String {
        format!(
            "PERFORMANCE ALERT [{}] {}\n  id: {}\n  time: {}\n  data:\n{}\n  context:\n{}",
            alert.severity.as_str().to_uppercase(),
            alert.kind,
            alert.id,
            alert.timestamp.to_rfc3339(),
            payload_lines(&alert.data, "    "),
            payload_lines(&alert.context, "    "),
        )
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn channel(&self) -> Channel {
        Channel::Console
    }

    async fn attempt_deliver(&self, alert: &Alert, _config: &AlertingConfig) -> Result<(), DeliveryError> {
        let record = Self::render(alert);
        match alert.severity {
            Severity::Critical => error!(target: "perf_alerting::console", alert_id = %alert.id, kind = %alert.kind, "{}", record),
            Severity::Warning => warn!(target: "perf_alerting::console", alert_id = %alert.id, kind = %alert.kind, "{}", record),
            Severity::Info => info!(target: "perf_alerting::console", alert_id = %alert.id, kind = %alert.kind, "{}", record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use crate::types::AlertKind;

    #[test]
    fn test_render_contains_fields() {
        let alert = Alert::new(
            AlertKind::SlowQuery,
            Severity::Critical,
            payload! { "query_name" => "orders_by_user", "duration_ms" => 7000.0 },
            payload! { "endpoint" => "/orders" },
        );

        let text = ConsoleChannel::render(&alert);
        assert!(text.starts_with("PERFORMANCE ALERT [CRITICAL] slow_query"));
        assert!(text.contains("query_name: orders_by_user"));
        assert!(text.contains("endpoint: /orders"));
        assert!(text.contains(&alert.id));
    }

    #[tokio::test]
    async fn test_console_always_acknowledges() {
        let alert = Alert::new(AlertKind::TestAlert, Severity::Info, payload! {}, payload! {});
        let result = ConsoleChannel::new()
            .attempt_deliver(&alert, &AlertingConfig::default())
            .await;
        assert!(result.is_ok());
    }
}
