//! Alerting Configuration

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AlertError;
use crate::types::{AlertKind, Channel};

/// Default number of alerts retained in history
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

/// Default dispatch budget per rolling minute
pub const DEFAULT_MAX_ALERTS_PER_MINUTE: u32 = 1000;

/// Detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Slow query threshold in milliseconds (default: 1000)
    pub slow_query_ms: f64,
    /// Error rate threshold as a fraction (default: 0.05)
    pub high_error_rate: f64,
    /// Connection pool usage threshold as a fraction (default: 0.8)
    pub connection_pool_usage: f64,
    /// Degradation factor threshold (default: 2.0)
    pub degradation_factor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            slow_query_ms: 1000.0,
            high_error_rate: 0.05,
            connection_pool_usage: 0.8,
            degradation_factor: 2.0,
        }
    }
}

/// Cooldown windows between repeated alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub slow_query_secs: u64,
    pub high_error_rate_secs: u64,
    pub performance_degradation_secs: u64,
    /// Window for every other kind
    pub default_secs: u64,
    /// Per-kind windows keyed by kind name, taking precedence over the above
    pub overrides: HashMap<String, u64>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            slow_query_secs: 300,            // 5 minutes
            high_error_rate_secs: 600,       // 10 minutes
            performance_degradation_secs: 900, // 15 minutes
            default_secs: 300,
            overrides: HashMap::new(),
        }
    }
}

impl CooldownConfig {
    /// Cooldown window for an alert kind
    pub fn window_for(&self, kind: &AlertKind) -> Duration {
        if let Some(secs) = self.overrides.get(kind.as_str()) {
            return Duration::from_secs(*secs);
        }
        let secs = match kind {
            AlertKind::SlowQuery => self.slow_query_secs,
            AlertKind::HighErrorRate => self.high_error_rate_secs,
            AlertKind::PerformanceDegradation => self.performance_degradation_secs,
            _ => self.default_secs,
        };
        Duration::from_secs(secs)
    }
}

/// File channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChannelConfig {
    pub path: PathBuf,
}

impl Default for FileChannelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/alerts.log"),
        }
    }
}

/// Webhook channel settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Email channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub recipients: Vec<String>,
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            from: "alerts@localhost".to_string(),
        }
    }
}

/// Channel enable flags and per-channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub enable_console: bool,
    pub enable_file: bool,
    pub enable_webhook: bool,
    pub enable_email: bool,
    pub file: FileChannelConfig,
    pub webhook: WebhookConfig,
    pub email: EmailConfig,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            enable_console: true,
            enable_file: false,
            enable_webhook: false,
            enable_email: false,
            file: FileChannelConfig::default(),
            webhook: WebhookConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl ChannelsConfig {
    /// Only the console channel enabled
    pub fn console_only() -> Self {
        Self::default()
    }

    fn flag(&self, channel: Channel) -> bool {
        match channel {
            Channel::Console => self.enable_console,
            Channel::File => self.enable_file,
            Channel::Webhook => self.enable_webhook,
            Channel::Email => self.enable_email,
        }
    }

    /// Reason an enabled channel cannot deliver, if any
    pub fn misconfiguration(&self, channel: Channel) -> Option<&'static str> {
        match channel {
            Channel::Webhook if self.webhook.url.as_deref().map_or(true, str::is_empty) => {
                Some("webhook enabled without a URL")
            }
            Channel::Email if self.email.recipients.is_empty() => {
                Some("email enabled without recipients")
            }
            Channel::File if self.file.path.as_os_str().is_empty() => {
                Some("file enabled without a path")
            }
            _ => None,
        }
    }

    /// Channels that are switched on and fully configured
    pub fn enabled(&self) -> BTreeSet<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.flag(*c) && self.misconfiguration(*c).is_none())
            .collect()
    }

    /// Enabled channels that are missing settings, with the reason
    pub fn problems(&self) -> Vec<(Channel, &'static str)> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.flag(*c))
            .filter_map(|c| self.misconfiguration(c).map(|reason| (c, reason)))
            .collect()
    }
}

/// Alerting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    pub thresholds: Thresholds,
    pub cooldowns: CooldownConfig,
    pub channels: ChannelsConfig,
    /// Deadline for a single channel delivery attempt (default: 10000)
    pub channel_timeout_ms: u64,
    /// Maximum alerts kept in history (default: 500)
    pub history_capacity: usize,
    /// Alerts dispatched per rolling minute before new ones are dropped; 0 disables (default: 1000)
    pub max_alerts_per_minute: u32,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            cooldowns: CooldownConfig::default(),
            channels: ChannelsConfig::default(),
            channel_timeout_ms: 10_000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_alerts_per_minute: DEFAULT_MAX_ALERTS_PER_MINUTE,
        }
    }
}

impl AlertingConfig {
    /// Load configuration from a file with environment variable overrides.
    ///
    /// The file is optional. Variables prefixed with `PERF_ALERTS__` override any
    /// value, using `__` between nested keys
    /// (e.g. `PERF_ALERTS__CHANNELS__ENABLE_FILE=true`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AlertError> {
        let settings = Config::builder()
            .add_source(File::with_name(&path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("PERF_ALERTS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from `PERF_ALERTS_CONFIG`, falling back to `config/alerting.toml`
    pub fn load() -> Result<Self, AlertError> {
        let path = std::env::var("PERF_ALERTS_CONFIG")
            .unwrap_or_else(|_| "config/alerting.toml".to_string());
        Self::from_file(path)
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    /// Merge a partial update into this configuration
    pub fn merge(&mut self, update: ConfigUpdate) {
        let ConfigUpdate {
            slow_query_threshold_ms,
            high_error_rate_threshold,
            connection_pool_threshold,
            degradation_threshold,
            slow_query_cooldown_secs,
            high_error_rate_cooldown_secs,
            performance_degradation_cooldown_secs,
            default_cooldown_secs,
            cooldown_overrides,
            enable_console,
            enable_file,
            enable_webhook,
            enable_email,
            file_path,
            webhook_url,
            webhook_headers,
            email_recipients,
            email_from,
            channel_timeout_ms,
            max_alerts_per_minute,
        } = update;

        let t = &mut self.thresholds;
        apply(&mut t.slow_query_ms, slow_query_threshold_ms);
        apply(&mut t.high_error_rate, high_error_rate_threshold);
        apply(&mut t.connection_pool_usage, connection_pool_threshold);
        apply(&mut t.degradation_factor, degradation_threshold);

        let c = &mut self.cooldowns;
        apply(&mut c.slow_query_secs, slow_query_cooldown_secs);
        apply(&mut c.high_error_rate_secs, high_error_rate_cooldown_secs);
        apply(&mut c.performance_degradation_secs, performance_degradation_cooldown_secs);
        apply(&mut c.default_secs, default_cooldown_secs);
        if let Some(overrides) = cooldown_overrides {
            c.overrides.extend(overrides);
        }

        let ch = &mut self.channels;
        apply(&mut ch.enable_console, enable_console);
        apply(&mut ch.enable_file, enable_file);
        apply(&mut ch.enable_webhook, enable_webhook);
        apply(&mut ch.enable_email, enable_email);
        apply(&mut ch.file.path, file_path);
        if webhook_url.is_some() {
            ch.webhook.url = webhook_url;
        }
        if let Some(headers) = webhook_headers {
            ch.webhook.headers.extend(headers);
        }
        apply(&mut ch.email.recipients, email_recipients);
        apply(&mut ch.email.from, email_from);

        apply(&mut self.channel_timeout_ms, channel_timeout_ms);
        apply(&mut self.max_alerts_per_minute, max_alerts_per_minute);
    }
}

fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Partial configuration update; `None` leaves a setting unchanged.
///
/// Header and cooldown override maps are merged key by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub slow_query_threshold_ms: Option<f64>,
    pub high_error_rate_threshold: Option<f64>,
    pub connection_pool_threshold: Option<f64>,
    pub degradation_threshold: Option<f64>,
    pub slow_query_cooldown_secs: Option<u64>,
    pub high_error_rate_cooldown_secs: Option<u64>,
    pub performance_degradation_cooldown_secs: Option<u64>,
    pub default_cooldown_secs: Option<u64>,
    pub cooldown_overrides: Option<HashMap<String, u64>>,
    pub enable_console: Option<bool>,
    pub enable_file: Option<bool>,
    pub enable_webhook: Option<bool>,
    pub enable_email: Option<bool>,
    pub file_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub webhook_headers: Option<HashMap<String, String>>,
    pub email_recipients: Option<Vec<String>>,
    pub email_from: Option<String>,
    pub channel_timeout_ms: Option<u64>,
    pub max_alerts_per_minute: Option<u32>,
}
