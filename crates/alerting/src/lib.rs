//! Performance Alerting
//!
//! Receives performance-degradation events from instrumentation, deduplicates
//! them per recurring condition, classifies severity, and fans notifications
//! out to console, file, webhook and email channels.
//!
//! ```no_run
//! use perf_alerting::{payload, AlertService, AlertingConfig};
//!
//! # async fn run() -> Result<(), perf_alerting::AlertError> {
//! let service = AlertService::new(AlertingConfig::load()?);
//! let alert = service
//!     .slow_query("orders_by_user", 2500.0, None, payload! { "endpoint" => "/orders" })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod classifier;
pub mod config;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod service;
pub mod signature;
pub mod throttle;
mod types;

pub use crate::channels::{ChannelAdapter, EmailMessage, EmailTransport};
pub use crate::classifier::HealthStatus;
pub use crate::config::{AlertingConfig, ConfigUpdate};
pub use crate::dispatcher::{DispatchReport, Dispatcher};
pub use crate::error::{AlertError, DeliveryError};
pub use crate::history::{AlertStats, HistoryStore};
pub use crate::service::{AlertService, DEFAULT_HISTORY_LIMIT};
pub use crate::types::{Alert, AlertKind, Channel, Payload, PayloadValue, Severity};
