//! Alert Type Definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Key-ordered payload map carried by `Alert::data` and `Alert::context`
pub type Payload = BTreeMap<String, PayloadValue>;

/// Scalar or nested value inside an alert payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Map(Payload),
}

impl PayloadValue {
    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
            Self::Map(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for PayloadValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for PayloadValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Payload> for PayloadValue {
    fn from(v: Payload) -> Self {
        Self::Map(v)
    }
}

/// Build a `Payload` from `key => value` pairs
#[macro_export]
macro_rules! payload {
    () => { $crate::Payload::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Payload::new();
        $(map.insert(($key).to_string(), $crate::PayloadValue::from($value));)+
        map
    }};
}

/// Severity level of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Requires immediate attention
    Critical,
    /// Potential issue
    Warning,
    /// Informational
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of condition an alert reports
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    SlowQuery,
    HighErrorRate,
    PerformanceDegradation,
    HighConnectionPoolUsage,
    DatabaseHealthIssue,
    DatabaseConnectionFailed,
    DatabaseError,
    TestAlert,
    /// Any kind not known to this crate
    Custom(String),
}

impl AlertKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SlowQuery => "slow_query",
            Self::HighErrorRate => "high_error_rate",
            Self::PerformanceDegradation => "performance_degradation",
            Self::HighConnectionPoolUsage => "high_connection_pool_usage",
            Self::DatabaseHealthIssue => "database_health_issue",
            Self::DatabaseConnectionFailed => "database_connection_failed",
            Self::DatabaseError => "database_error",
            Self::TestAlert => "test_alert",
            Self::Custom(name) => name,
        }
    }

    /// Payload fields that identify the recurring condition.
    ///
    /// `None` means the whole payload is the identity.
    pub fn identity_fields(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::SlowQuery => Some(&["query_name"]),
            Self::HighErrorRate | Self::PerformanceDegradation => Some(&["operation"]),
            Self::HighConnectionPoolUsage => Some(&["pool_name"]),
            Self::DatabaseHealthIssue => Some(&["status"]),
            Self::DatabaseConnectionFailed => Some(&["database"]),
            Self::DatabaseError => Some(&["operation", "error"]),
            Self::TestAlert | Self::Custom(_) => None,
        }
    }
}

impl From<&str> for AlertKind {
    fn from(s: &str) -> Self {
        match s {
            "slow_query" => Self::SlowQuery,
            "high_error_rate" => Self::HighErrorRate,
            "performance_degradation" => Self::PerformanceDegradation,
            "high_connection_pool_usage" => Self::HighConnectionPoolUsage,
            "database_health_issue" => Self::DatabaseHealthIssue,
            "database_connection_failed" => Self::DatabaseConnectionFailed,
            "database_error" => Self::DatabaseError,
            "test_alert" => Self::TestAlert,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for AlertKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Console,
    File,
    Webhook,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Self::Console, Self::File, Self::Webhook, Self::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::File => "file",
            Self::Webhook => "webhook",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier
    pub id: String,
    /// Reported condition
    pub kind: AlertKind,
    /// Severity level
    pub severity: Severity,
    /// Kind-specific payload
    pub data: Payload,
    /// Caller-supplied supplementary fields
    pub context: Payload,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Channels that acknowledged delivery
    pub delivered_channels: BTreeSet<Channel>,
}

impl Alert {
    /// Create a new, not yet delivered alert
    pub fn new(kind: AlertKind, severity: Severity, data: Payload, context: Payload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            severity,
            data,
            context,
            timestamp: Utc::now(),
            delivered_channels: BTreeSet::new(),
        }
    }

    /// Finalize the alert with the channels that delivered it
    pub fn with_delivered(mut self, channels: BTreeSet<Channel>) -> Self {
        self.delivered_channels = channels;
        self
    }
}
