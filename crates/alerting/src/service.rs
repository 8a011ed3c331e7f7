//! Alert Service
//!
//! Orchestrates the pipeline: signature, cooldown gate, fan-out dispatch and
//! history. Construct one instance at startup and share it (usually as
//! `Arc<AlertService>`) with every instrumented component.

use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

use crate::channels::{default_adapters, ChannelAdapter, LogTransport};
use crate::classifier::{self, HealthStatus};
use crate::config::{AlertingConfig, ConfigUpdate};
use crate::cooldown::CooldownTracker;
use crate::dispatcher::{in_dispatch_scope, Dispatcher};
use crate::error::AlertError;
use crate::history::{AlertStats, HistoryStore};
use crate::payload;
use crate::signature::signature;
use crate::throttle::DispatchThrottle;
use crate::types::{Alert, AlertKind, Payload, Severity};

/// Default number of alerts returned by `get_alert_history`
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Alerting façade shared by all callers
pub struct AlertService {
    config: RwLock<Arc<AlertingConfig>>,
    cooldowns: CooldownTracker,
    throttle: DispatchThrottle,
    dispatcher: Arc<Dispatcher>,
    history: Arc<HistoryStore>,
}

impl AlertService {
    /// Create a service with the built-in console, file, webhook and email adapters
    pub fn new(config: AlertingConfig) -> Self {
        Self::with_adapters(config, default_adapters(Arc::new(LogTransport)))
    }

    /// Create a service with an explicit adapter set
    pub fn with_adapters(config: AlertingConfig, adapters: Vec<Arc<dyn ChannelAdapter>>) -> Self {
        let dispatcher = Dispatcher::new(adapters);
        info!(
            "Creating alert service: adapters {:?}, enabled channels {:?}",
            dispatcher.channels(),
            config.channels.enabled()
        );
        log_problems(&config);

        Self {
            history: Arc::new(HistoryStore::new(config.history_capacity)),
            cooldowns: CooldownTracker::new(),
            throttle: DispatchThrottle::new(),
            dispatcher: Arc::new(dispatcher),
            config: RwLock::new(Arc::new(config)),
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<AlertingConfig> {
        let guard = self.config.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Merge settings into the configuration; applies to subsequent alerts
    pub fn update_config(&self, update: ConfigUpdate) {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = AlertingConfig::clone(&**guard);
        next.merge(update);
        log_problems(&next);
        info!("Alert configuration updated: enabled channels {:?}", next.channels.enabled());
        *guard = Arc::new(next);
    }

    /// Gate, dispatch and record one alert.
    ///
    /// Returns `None` when the alert's signature is inside its cooldown window,
    /// when the per-minute dispatch budget is spent, or when called from within
    /// a channel delivery.
    ///
    /// Delivery and the history append run in their own task, so an alert that
    /// passed the gate is recorded even if this future is dropped mid-dispatch.
    pub async fn send_alert(
        &self,
        kind: AlertKind,
        severity: Severity,
        data: Payload,
        context: Payload,
    ) -> Option<Alert> {
        if in_dispatch_scope() {
            warn!("Dropping {} alert raised during channel delivery", kind);
            return None;
        }

        let config = self.config();
        let sig = signature(&kind, &data);
        if self.cooldowns.check_and_record(&sig, &kind, &config.cooldowns) {
            metrics::counter!("alerts_suppressed_total", "kind" => kind.to_string()).increment(1);
            return None;
        }
        if !self.throttle.try_acquire(config.max_alerts_per_minute) {
            warn!(
                "Dropping {} alert: more than {} alerts dispatched in the last minute",
                kind, config.max_alerts_per_minute
            );
            metrics::counter!("alerts_throttled_total", "kind" => kind.to_string()).increment(1);
            return None;
        }

        let enabled = config.channels.enabled();
        let alert = Arc::new(Alert::new(kind, severity, data, context));
        let dispatcher = Arc::clone(&self.dispatcher);
        let history = Arc::clone(&self.history);

        let delivery = tokio::spawn(async move {
            let report = dispatcher.dispatch(Arc::clone(&alert), &enabled, config).await;
            let alert = Arc::try_unwrap(alert)
                .unwrap_or_else(|shared| Alert::clone(&shared))
                .with_delivered(report.delivered);

            if alert.delivered_channels.is_empty() {
                warn!("Alert {} ({}) reached no channel", alert.id, alert.kind);
            }
            metrics::counter!(
                "alerts_sent_total",
                "kind" => alert.kind.to_string(),
                "severity" => alert.severity.as_str()
            )
            .increment(1);

            history.append(alert.clone());
            alert
        });

        match delivery.await {
            Ok(alert) => Some(alert),
            Err(e) => {
                error!("Alert delivery task failed: {}", e);
                None
            }
        }
    }

    /// Slow query; `threshold_ms` defaults to the configured threshold
    pub async fn slow_query(
        &self,
        query_name: &str,
        duration_ms: f64,
        threshold_ms: Option<f64>,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold_ms = threshold_ms.unwrap_or(self.config().thresholds.slow_query_ms);
        let (severity, data) = classifier::slow_query_payload(query_name, duration_ms, threshold_ms)?;
        Ok(self.send_alert(AlertKind::SlowQuery, severity, data, context).await)
    }

    /// High error rate; `rate` is the measured error fraction
    pub async fn high_error_rate(
        &self,
        operation: &str,
        rate: f64,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold = self.config().thresholds.high_error_rate;
        let (severity, data) = classifier::error_rate_payload(operation, rate, threshold)?;
        Ok(self.send_alert(AlertKind::HighErrorRate, severity, data, context).await)
    }

    /// High error rate measured as `error_count` failures out of `total_count` requests
    pub async fn high_error_rate_from_counts(
        &self,
        operation: &str,
        error_count: u64,
        total_count: u64,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold = self.config().thresholds.high_error_rate;
        let (severity, data) =
            classifier::error_rate_payload_from_counts(operation, error_count, total_count, threshold)?;
        Ok(self.send_alert(AlertKind::HighErrorRate, severity, data, context).await)
    }

    /// Recent average latency compared with an older baseline
    pub async fn performance_degradation(
        &self,
        operation: &str,
        recent_avg_ms: f64,
        older_avg_ms: f64,
        degradation_factor: f64,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold = self.config().thresholds.degradation_factor;
        let (severity, data) = classifier::degradation_payload(
            operation,
            recent_avg_ms,
            older_avg_ms,
            degradation_factor,
            threshold,
        )?;
        Ok(self.send_alert(AlertKind::PerformanceDegradation, severity, data, context).await)
    }

    /// Connection pool saturation; `usage` is the busy fraction of the pool
    pub async fn connection_pool_usage(
        &self,
        pool_name: &str,
        usage: f64,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold = self.config().thresholds.connection_pool_usage;
        let (severity, data) = classifier::pool_usage_payload(pool_name, usage, threshold)?;
        Ok(self.send_alert(AlertKind::HighConnectionPoolUsage, severity, data, context).await)
    }

    pub async fn connection_pool_usage_from_counts(
        &self,
        pool_name: &str,
        active_connections: u32,
        max_connections: u32,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let threshold = self.config().thresholds.connection_pool_usage;
        let (severity, data) = classifier::pool_usage_payload_from_counts(
            pool_name,
            active_connections,
            max_connections,
            threshold,
        )?;
        Ok(self.send_alert(AlertKind::HighConnectionPoolUsage, severity, data, context).await)
    }

    /// Database health state change
    pub async fn database_health(
        &self,
        status: HealthStatus,
        details: Payload,
        context: Payload,
    ) -> Option<Alert> {
        let (severity, data) = classifier::health_payload(status, details);
        self.send_alert(AlertKind::DatabaseHealthIssue, severity, data, context).await
    }

    /// The monitored database could not be reached
    pub async fn database_connection_failed(
        &self,
        database: &str,
        error: &str,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let (severity, data) = classifier::connection_failed_payload(database, error)?;
        Ok(self.send_alert(AlertKind::DatabaseConnectionFailed, severity, data, context).await)
    }

    /// A monitored operation failed
    pub async fn database_error(
        &self,
        operation: &str,
        error: &str,
        context: Payload,
    ) -> Result<Option<Alert>, AlertError> {
        let (severity, data) = classifier::database_error_payload(operation, error)?;
        Ok(self.send_alert(AlertKind::DatabaseError, severity, data, context).await)
    }

    /// Send a synthetic info alert through the whole pipeline
    pub async fn test_alerts(&self) -> Option<Alert> {
        let now = Utc::now();
        let data = payload! {
            "message" => "Test alert to verify channel configuration",
            "sent_at" => now.to_rfc3339(),
        };
        let context = payload! { "source" => "test_alerts" };
        self.send_alert(AlertKind::TestAlert, Severity::Info, data, context).await
    }

    pub fn get_alert_stats(&self) -> AlertStats {
        self.history.stats()
    }

    /// Most recent alerts first
    pub fn get_alert_history(&self, limit: usize) -> Vec<Alert> {
        self.history.recent(limit)
    }

    /// Clear history and counters; cooldown state is kept
    pub fn clear_alert_history(&self) {
        self.history.clear();
    }

    /// Forget all cooldown state
    pub fn reset_cooldowns(&self) {
        self.cooldowns.clear();
    }
}

fn log_problems(config: &AlertingConfig) {
    for (channel, reason) in config.channels.problems() {
        warn!("Channel {} disabled: {}", channel, reason);
    }
}
