//! Fan-out Dispatcher

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::channels::ChannelAdapter;
use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, Channel};

tokio::task_local! {
    static DISPATCH_SCOPE: ();
}

/// Whether the current task is a channel delivery attempt
pub fn in_dispatch_scope() -> bool {
    DISPATCH_SCOPE.try_with(|_| ()).is_ok()
}

/// Per-channel outcome of one dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Channels that acknowledged delivery
    pub delivered: BTreeSet<Channel>,
    /// Channels that were attempted and failed
    pub failures: Vec<(Channel, DeliveryError)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delivers one alert to all enabled adapters concurrently
pub struct Dispatcher {
    adapters: Vec<Arc<dyn ChannelAdapter>>,
}

impl Dispatcher {
    pub fn new(adapters: Vec<Arc<dyn ChannelAdapter>>) -> Self {
        Self { adapters }
    }

    /// Channels with an adapter
    pub fn channels(&self) -> BTreeSet<Channel> {
        self.adapters.iter().map(|a| a.channel()).collect()
    }

    /// Run every adapter whose channel is in `enabled`, each in its own task
    /// and under the configured timeout. Returns once all attempts settle.
    pub async fn dispatch(
        &self,
        alert: Arc<Alert>,
        enabled: &BTreeSet<Channel>,
        config: Arc<AlertingConfig>,
    ) -> DispatchReport {
        let deadline = config.channel_timeout();

        // Spawn everything first so attempts overlap
        let attempts: Vec<_> = self
            .adapters
            .iter()
            .filter(|a| enabled.contains(&a.channel()))
            .map(|adapter| {
                let channel = adapter.channel();
                let adapter = Arc::clone(adapter);
                let alert = Arc::clone(&alert);
                let config = Arc::clone(&config);
                let handle = tokio::spawn(DISPATCH_SCOPE.scope((), async move {
                    match timeout(deadline, adapter.attempt_deliver(&alert, &config)).await {
                        Ok(result) => result,
                        Err(_) => Err(DeliveryError::TimedOut(deadline)),
                    }
                }));
                (channel, handle)
            })
            .collect();

        let mut report = DispatchReport::default();
        for (channel, handle) in attempts {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DeliveryError::Panicked(e.to_string())),
            };

            match outcome {
                Ok(()) => {
                    debug!("Alert {} delivered via {}", alert.id, channel);
                    report.delivered.insert(channel);
                }
                Err(e) => {
                    warn!("Alert {} not delivered via {}: {}", alert.id, channel, e);
                    metrics::counter!("alert_delivery_failures_total", "channel" => channel.as_str())
                        .increment(1);
                    report.failures.push((channel, e));
                }
            }
        }

        report
    }
}
