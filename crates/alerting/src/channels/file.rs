//! File Channel

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::ChannelAdapter;
use crate::config::AlertingConfig;
use crate::error::DeliveryError;
use crate::types::{Alert, AlertKind, Channel, Payload, Severity};

/// One line of the alert log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub alert_id: String,
    pub data: Payload,
    pub context: Payload,
}

impl From<&Alert> for FileRecord {
    fn from(alert: &Alert) -> Self {
        Self {
            timestamp: alert.timestamp,
            level: "ALERT".to_string(),
            severity: alert.severity,
            kind: alert.kind.clone(),
            alert_id: alert.id.clone(),
            data: alert.data.clone(),
            context: alert.context.clone(),
        }
    }
}

/// Appends JSON lines to the configured path
#[derive(Debug, Default)]
pub struct FileChannel {
    /// Serializes appends so concurrent alerts never interleave a line
    write_lock: Mutex<()>,
}

impl FileChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelAdapter for FileChannel {
    fn channel(&self) -> Channel {
        Channel::File
    }

    async fn attempt_deliver(&self, alert: &Alert, config: &AlertingConfig) -> Result<(), DeliveryError> {
        let path = &config.channels.file.path;
        if path.as_os_str().is_empty() {
            return Err(DeliveryError::Misconfigured("file path is empty".to_string()));
        }

        let mut line = serde_json::to_vec(&FileRecord::from(alert))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!("Appended alert {} to {}", alert.id, path.display());
        Ok(())
    }
}
