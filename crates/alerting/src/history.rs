//! Alert History and Statistics

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::types::{Alert, Severity};

/// Running counters over every recorded alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStats {
    /// Alerts recorded since start or last clear, including evicted ones
    pub total: u64,
    pub by_severity: BTreeMap<Severity, u64>,
    pub by_type: BTreeMap<String, u64>,
}

impl AlertStats {
    fn record(&mut self, alert: &Alert) {
        self.total += 1;
        *self.by_severity.entry(alert.severity).or_insert(0) += 1;
        *self.by_type.entry(alert.kind.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug)]
struct Inner {
    buffer: VecDeque<Alert>,
    stats: AlertStats,
}

/// Bounded FIFO of recent alerts plus unbounded counters
#[derive(Debug)]
pub struct HistoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl HistoryStore {
    /// Create a store holding at most `capacity` alerts
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        info!("Creating alert history with capacity {}", capacity);
        Self {
            inner: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(capacity),
                stats: AlertStats::default(),
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an alert, evicting the oldest when full
    pub fn append(&self, alert: Alert) {
        let mut inner = self.lock();
        inner.stats.record(&alert);

        // Enforce retention
        while inner.buffer.len() >= self.capacity {
            if let Some(evicted) = inner.buffer.pop_front() {
                debug!("Evicted alert {} from history", evicted.id);
            }
        }
        inner.buffer.push_back(alert);
    }

    /// Most recent alerts first, at most `limit`
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.lock().buffer.iter().rev().take(limit).cloned().collect()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> AlertStats {
        self.lock().stats.clone()
    }

    /// Reset history and counters
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.buffer.clear();
        inner.stats = AlertStats::default();
        info!("Alert history cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
