//! Severity Classification and Payload Builders
//!
//! One severity rule and one payload builder per alert kind. Builders validate
//! the raw measurement before anything reaches the send path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AlertError;
use crate::payload;
use crate::types::{Payload, Severity};

/// Connection pool usage above which an alert is critical
pub const POOL_CRITICAL_USAGE: f64 = 0.95;

/// Degradation factor above which an alert is critical
pub const DEGRADATION_CRITICAL_FACTOR: f64 = 5.0;

/// Reported health of the monitored database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn slow_query_severity(duration_ms: f64, threshold_ms: f64) -> Severity {
    if duration_ms > 3.0 * threshold_ms {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

pub fn error_rate_severity(rate: f64, threshold: f64) -> Severity {
    if rate > 2.0 * threshold {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

pub fn degradation_severity(factor: f64) -> Severity {
    if factor > DEGRADATION_CRITICAL_FACTOR {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

pub fn pool_usage_severity(usage: f64) -> Severity {
    if usage > POOL_CRITICAL_USAGE {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

pub fn health_severity(status: HealthStatus) -> Severity {
    match status {
        HealthStatus::Unhealthy => Severity::Critical,
        HealthStatus::Degraded => Severity::Warning,
        HealthStatus::Healthy => Severity::Info,
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, AlertError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AlertError::invalid(field, format!("{} is not a finite non-negative number", value)));
    }
    Ok(value)
}

fn positive(field: &'static str, value: f64) -> Result<f64, AlertError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AlertError::invalid(field, format!("{} is not a finite positive number", value)));
    }
    Ok(value)
}

fn fraction(field: &'static str, value: f64) -> Result<f64, AlertError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(AlertError::invalid(field, format!("{} is outside [0, 1]", value)));
    }
    Ok(value)
}

fn count(field: &'static str, value: u64) -> Result<i64, AlertError> {
    i64::try_from(value)
        .map_err(|_| AlertError::invalid(field, format!("{} does not fit a signed 64-bit count", value)))
}

fn name<'a>(field: &'static str, value: &'a str) -> Result<&'a str, AlertError> {
    if value.trim().is_empty() {
        return Err(AlertError::invalid(field, "must not be empty"));
    }
    Ok(value)
}

/// Slow query payload: `query_name`, `duration_ms`, `threshold_ms`, `slowdown_factor`
pub fn slow_query_payload(
    query_name: &str,
    duration_ms: f64,
    threshold_ms: f64,
) -> Result<(Severity, Payload), AlertError> {
    let query_name = name("query_name", query_name)?;
    let duration_ms = non_negative("duration_ms", duration_ms)?;
    let threshold_ms = positive("threshold_ms", threshold_ms)?;

    let data = payload! {
        "query_name" => query_name,
        "duration_ms" => duration_ms,
        "threshold_ms" => threshold_ms,
        "slowdown_factor" => duration_ms / threshold_ms,
    };
    Ok((slow_query_severity(duration_ms, threshold_ms), data))
}

/// Error rate payload: `operation`, `error_rate`, `threshold`
pub fn error_rate_payload(
    operation: &str,
    rate: f64,
    threshold: f64,
) -> Result<(Severity, Payload), AlertError> {
    let operation = name("operation", operation)?;
    let rate = fraction("error_rate", rate)?;
    let threshold = fraction("threshold", positive("threshold", threshold)?)?;

    let data = payload! {
        "operation" => operation,
        "error_rate" => rate,
        "threshold" => threshold,
    };
    Ok((error_rate_severity(rate, threshold), data))
}

/// Error rate payload computed from request counts; adds `error_count` and `total_count`
pub fn error_rate_payload_from_counts(
    operation: &str,
    error_count: u64,
    total_count: u64,
    threshold: f64,
) -> Result<(Severity, Payload), AlertError> {
    if total_count == 0 {
        return Err(AlertError::invalid("total_count", "no requests observed"));
    }
    if error_count > total_count {
        return Err(AlertError::invalid(
            "error_count",
            format!("{} errors exceed {} requests", error_count, total_count),
        ));
    }

    let rate = error_count as f64 / total_count as f64;
    let (severity, mut data) = error_rate_payload(operation, rate, threshold)?;
    data.insert("error_count".to_string(), count("error_count", error_count)?.into());
    data.insert("total_count".to_string(), count("total_count", total_count)?.into());
    Ok((severity, data))
}

/// Degradation payload: `operation`, `recent_avg_ms`, `older_avg_ms`, `degradation_factor`, `threshold`
pub fn degradation_payload(
    operation: &str,
    recent_avg_ms: f64,
    older_avg_ms: f64,
    degradation_factor: f64,
    threshold: f64,
) -> Result<(Severity, Payload), AlertError> {
    let operation = name("operation", operation)?;
    let recent_avg_ms = non_negative("recent_avg_ms", recent_avg_ms)?;
    let older_avg_ms = non_negative("older_avg_ms", older_avg_ms)?;
    let degradation_factor = non_negative("degradation_factor", degradation_factor)?;
    let threshold = positive("threshold", threshold)?;

    let data = payload! {
        "operation" => operation,
        "recent_avg_ms" => recent_avg_ms,
        "older_avg_ms" => older_avg_ms,
        "degradation_factor" => degradation_factor,
        "threshold" => threshold,
    };
    Ok((degradation_severity(degradation_factor), data))
}

/// Pool payload: `pool_name`, `usage`, `threshold`
pub fn pool_usage_payload(
    pool_name: &str,
    usage: f64,
    threshold: f64,
) -> Result<(Severity, Payload), AlertError> {
    let pool_name = name("pool_name", pool_name)?;
    let usage = fraction("usage", usage)?;
    let threshold = fraction("threshold", threshold)?;

    let data = payload! {
        "pool_name" => pool_name,
        "usage" => usage,
        "threshold" => threshold,
    };
    Ok((pool_usage_severity(usage), data))
}

/// Pool payload computed from connection counts; adds `active_connections` and `max_connections`
pub fn pool_usage_payload_from_counts(
    pool_name: &str,
    active_connections: u32,
    max_connections: u32,
    threshold: f64,
) -> Result<(Severity, Payload), AlertError> {
    if max_connections == 0 {
        return Err(AlertError::invalid("max_connections", "pool has no capacity"));
    }
    if active_connections > max_connections {
        return Err(AlertError::invalid(
            "active_connections",
            format!("{} exceeds pool size {}", active_connections, max_connections),
        ));
    }

    let usage = f64::from(active_connections) / f64::from(max_connections);
    let (severity, mut data) = pool_usage_payload(pool_name, usage, threshold)?;
    data.insert("active_connections".to_string(), active_connections.into());
    data.insert("max_connections".to_string(), max_connections.into());
    Ok((severity, data))
}

/// Health payload: `status`, `details`
pub fn health_payload(status: HealthStatus, details: Payload) -> (Severity, Payload) {
    let data = payload! {
        "status" => status.as_str(),
        "details" => details,
    };
    (health_severity(status), data)
}

/// Connection failure payload: `database`, `error`
pub fn connection_failed_payload(database: &str, error: &str) -> Result<(Severity, Payload), AlertError> {
    let database = name("database", database)?;
    Ok((Severity::Critical, payload! { "database" => database, "error" => error }))
}

/// Database error payload: `operation`, `error`
pub fn database_error_payload(operation: &str, error: &str) -> Result<(Severity, Payload), AlertError> {
    let operation = name("operation", operation)?;
    Ok((Severity::Warning, payload! { "operation" => operation, "error" => error }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_query_severity() {
        // 1.25x threshold
        assert_eq!(slow_query_severity(2500.0, 2000.0), Severity::Warning);
        // 3.5x threshold
        assert_eq!(slow_query_severity(7000.0, 2000.0), Severity::Critical);
        // Exactly 3x is not critical
        assert_eq!(slow_query_severity(6000.0, 2000.0), Severity::Warning);
    }

    #[test]
    fn test_error_rate_severity() {
        assert_eq!(error_rate_severity(0.08, 0.05), Severity::Warning);
        assert_eq!(error_rate_severity(0.11, 0.05), Severity::Critical);
    }

    #[test]
    fn test_degradation_and_pool_severity() {
        assert_eq!(degradation_severity(10.0), Severity::Critical);
        assert_eq!(degradation_severity(5.0), Severity::Warning);
        assert_eq!(pool_usage_severity(0.96), Severity::Critical);
        assert_eq!(pool_usage_severity(0.95), Severity::Warning);
    }

    #[test]
    fn test_health_severity() {
        assert_eq!(health_severity(HealthStatus::Unhealthy), Severity::Critical);
        assert_eq!(health_severity(HealthStatus::Degraded), Severity::Warning);
        assert_eq!(health_severity(HealthStatus::Healthy), Severity::Info);
    }

    #[test]
    fn test_slow_query_payload_fields() {
        let (severity, data) = slow_query_payload("orders_by_user", 2500.0, 2000.0).unwrap();
        assert_eq!(severity, Severity::Warning);
        assert_eq!(data["query_name"].as_str(), Some("orders_by_user"));
        assert_eq!(data["duration_ms"].as_f64(), Some(2500.0));
        assert_eq!(data["slowdown_factor"].as_f64(), Some(1.25));
    }

    #[test]
    fn test_error_rate_payload_takes_measured_rate() {
        let (severity, data) = error_rate_payload("checkout", 0.08, 0.05).unwrap();
        assert_eq!(severity, Severity::Warning);
        assert_eq!(data["error_rate"].as_f64(), Some(0.08));
        assert_eq!(data["threshold"].as_f64(), Some(0.05));
        assert!(!data.contains_key("total_count"));
    }

    #[test]
    fn test_error_rate_payload_from_counts() {
        let (severity, data) = error_rate_payload_from_counts("checkout", 15, 100, 0.05).unwrap();
        assert_eq!(severity, Severity::Critical);
        assert_eq!(data["error_rate"].as_f64(), Some(0.15));
        assert_eq!(data["total_count"].as_f64(), Some(100.0));
    }

    #[test]
    fn test_counts_beyond_i64_rejected() {
        let huge = u64::MAX;
        let err = error_rate_payload_from_counts("checkout", huge - 1, huge, 0.05).unwrap_err();
        assert!(matches!(
            err,
            AlertError::InvalidMeasurement { field: "error_count", .. }
        ));

        let big = i64::MAX as u64;
        let (_, data) = error_rate_payload_from_counts("checkout", 1, big, 0.05).unwrap();
        assert_eq!(data["total_count"], crate::PayloadValue::Integer(i64::MAX));
    }

    #[test]
    fn test_pool_payload_takes_measured_usage() {
        let (severity, data) = pool_usage_payload("primary", 0.97, 0.8).unwrap();
        assert_eq!(severity, Severity::Critical);
        assert_eq!(data["usage"].as_f64(), Some(0.97));
        assert!(!data.contains_key("max_connections"));
    }

    #[test]
    fn test_pool_payload_from_counts() {
        let (severity, data) = pool_usage_payload_from_counts("primary", 85, 100, 0.8).unwrap();
        assert_eq!(severity, Severity::Warning);
        assert_eq!(data["usage"].as_f64(), Some(0.85));
        assert_eq!(data["max_connections"].as_f64(), Some(100.0));
    }

    #[test]
    fn test_degradation_payload_records_threshold() {
        let (severity, data) = degradation_payload("search", 1000.0, 100.0, 10.0, 2.0).unwrap();
        assert_eq!(severity, Severity::Critical);
        assert_eq!(data["threshold"].as_f64(), Some(2.0));
    }

    #[test]
    fn test_invalid_measurements_rejected() {
        assert!(slow_query_payload("q", f64::NAN, 1000.0).is_err());
        assert!(slow_query_payload("q", 10.0, 0.0).is_err());
        assert!(slow_query_payload("  ", 10.0, 1000.0).is_err());
        assert!(error_rate_payload("op", 1.2, 0.05).is_err());
        assert!(error_rate_payload("op", f64::NAN, 0.05).is_err());
        assert!(error_rate_payload_from_counts("op", 5, 0, 0.05).is_err());
        assert!(error_rate_payload_from_counts("op", 11, 10, 0.05).is_err());
        assert!(pool_usage_payload("pool", -0.1, 0.8).is_err());
        assert!(pool_usage_payload("pool", 0.5, 1.5).is_err());
        assert!(pool_usage_payload_from_counts("pool", 11, 10, 0.8).is_err());
        assert!(degradation_payload("op", -1.0, 10.0, 2.0, 2.0).is_err());
        assert!(degradation_payload("op", 10.0, 1.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_health_payload_nests_details() {
        let details = payload! { "replication_lag_s" => 42i64 };
        let (severity, data) = health_payload(HealthStatus::Degraded, details);
        assert_eq!(severity, Severity::Warning);
        assert_eq!(data["status"].as_str(), Some("degraded"));
        assert!(matches!(data["details"], crate::PayloadValue::Map(_)));
    }
}
