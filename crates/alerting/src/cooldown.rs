//! Cooldown Tracking

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CooldownConfig;
use crate::types::AlertKind;

/// Entry count above which expired entries are pruned on insert
const PRUNE_THRESHOLD: usize = 1024;

/// Cooldown state of one signature
#[derive(Debug, Clone, Copy)]
pub struct CooldownEntry {
    /// Last time this signature was attempted
    pub last_fired: Instant,
    /// Window that applied at that time
    pub window: Duration,
}

impl CooldownEntry {
    fn is_active(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_fired) < self.window
    }
}

/// Gate for repeated notifications sharing a signature
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: Mutex<HashMap<String, CooldownEntry>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CooldownEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether a signature is inside its cooldown window (no update)
    pub fn should_suppress(&self, signature: &str, kind: &AlertKind, cooldowns: &CooldownConfig) -> bool {
        let window = cooldowns.window_for(kind);
        self.lock()
            .get(signature)
            .map_or(false, |e| Instant::now().saturating_duration_since(e.last_fired) < window)
    }

    /// Record a fire attempt for a signature
    pub fn record_fire(&self, signature: &str, kind: &AlertKind, cooldowns: &CooldownConfig) {
        let entry = CooldownEntry {
            last_fired: Instant::now(),
            window: cooldowns.window_for(kind),
        };
        let mut entries = self.lock();
        entries.insert(signature.to_string(), entry);
        Self::prune_locked(&mut entries, entry.last_fired);
    }

    /// Gate check and timestamp overwrite under one lock.
    ///
    /// Returns `true` when the attempt is suppressed. The timestamp is
    /// overwritten either way.
    pub fn check_and_record(
        &self,
        signature: &str,
        kind: &AlertKind,
        cooldowns: &CooldownConfig,
    ) -> bool {
        let now = Instant::now();
        let window = cooldowns.window_for(kind);
        let mut entries = self.lock();

        let suppressed = entries
            .get(signature)
            .map_or(false, |e| now.saturating_duration_since(e.last_fired) < window);

        entries.insert(
            signature.to_string(),
            CooldownEntry {
                last_fired: now,
                window,
            },
        );
        Self::prune_locked(&mut entries, now);

        if suppressed {
            debug!("Alert suppressed: {} in cooldown ({:?})", signature, window);
        }
        suppressed
    }

    fn prune_locked(entries: &mut HashMap<String, CooldownEntry>, now: Instant) {
        if entries.len() > PRUNE_THRESHOLD {
            let before = entries.len();
            entries.retain(|_, e| e.is_active(now));
            debug!("Pruned {} expired cooldown entries", before - entries.len());
        }
    }

    /// Drop entries whose window has elapsed
    pub fn prune(&self) {
        let now = Instant::now();
        self.lock().retain(|_, e| e.is_active(now));
    }

    /// Number of tracked signatures
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all cooldown state
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_deduplication() {
        let tracker = CooldownTracker::new();
        let cooldowns = CooldownConfig::default();

        // First attempt passes
        assert!(!tracker.check_and_record("slow_query:a", &AlertKind::SlowQuery, &cooldowns));

        // Immediate duplicate is suppressed
        assert!(tracker.check_and_record("slow_query:a", &AlertKind::SlowQuery, &cooldowns));

        // Other signatures are independent
        assert!(!tracker.check_and_record("slow_query:b", &AlertKind::SlowQuery, &cooldowns));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapses() {
        let tracker = CooldownTracker::new();
        let cooldowns = CooldownConfig::default();

        assert!(!tracker.check_and_record("sig", &AlertKind::HighErrorRate, &cooldowns));
        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(tracker.should_suppress("sig", &AlertKind::HighErrorRate, &cooldowns));

        // Suppressed attempts refresh the timestamp too
        tokio::time::advance(Duration::from_secs(1)).await;
        tracker.record_fire("sig", &AlertKind::HighErrorRate, &cooldowns);
        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(!tracker.check_and_record("sig", &AlertKind::HighErrorRate, &cooldowns));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_attempt_extends_window() {
        let tracker = CooldownTracker::new();
        let cooldowns = CooldownConfig::default();

        assert!(!tracker.check_and_record("sig", &AlertKind::SlowQuery, &cooldowns));
        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(tracker.check_and_record("sig", &AlertKind::SlowQuery, &cooldowns));
        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(tracker.check_and_record("sig", &AlertKind::SlowQuery, &cooldowns));
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!tracker.check_and_record("sig", &AlertKind::SlowQuery, &cooldowns));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_removes_expired() {
        let tracker = CooldownTracker::new();
        let cooldowns = CooldownConfig::default();

        tracker.record_fire("old", &AlertKind::SlowQuery, &cooldowns);
        tokio::time::advance(Duration::from_secs(301)).await;
        tracker.record_fire("new", &AlertKind::SlowQuery, &cooldowns);

        tracker.prune();
        assert_eq!(tracker.len(), 1);
        assert!(tracker.should_suppress("new", &AlertKind::SlowQuery, &cooldowns));
    }

    #[test]
    fn test_concurrent_burst_passes_once() {
        let tracker = Arc::new(CooldownTracker::new());
        let cooldowns = Arc::new(CooldownConfig::default());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let cooldowns = Arc::clone(&cooldowns);
                std::thread::spawn(move || {
                    !tracker.check_and_record("burst", &AlertKind::DatabaseError, &cooldowns)
                })
            })
            .collect();

        let passed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|passed| *passed)
            .count();
        assert_eq!(passed, 1);
    }
}
