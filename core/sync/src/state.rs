//! Sync state tracking: the watermark and pass bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which strategy a sync pass used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStrategy {
    /// Clear the target and copy every source record.
    Full,
    /// Same end state as `Full`, copied page by page.
    Batched { batch_size: usize },
    /// Apply only records created or updated since the watermark.
    Incremental,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::Full => write!(f, "full"),
            SyncStrategy::Batched { batch_size } => write!(f, "batched({})", batch_size),
            SyncStrategy::Incremental => write!(f, "incremental"),
        }
    }
}

/// Outcome of a single sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub strategy: SyncStrategy,
    /// Records written to the target as new documents.
    pub inserted: usize,
    /// Target documents overwritten from an updated source record.
    pub updated: usize,
    /// Target documents removed before copying.
    pub cleared: usize,
    /// Updated source records with no counterpart in the target.
    pub missing: usize,
    /// Pages fetched (batched sync only; includes the final empty page).
    pub batches: usize,
    /// Instant the pass captured before reading the source.
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl SyncReport {
    pub(crate) fn new(strategy: SyncStrategy, started_at: DateTime<Utc>) -> Self {
        Self {
            strategy,
            inserted: 0,
            updated: 0,
            cleared: 0,
            missing: 0,
            batches: 0,
            started_at,
            duration: Duration::ZERO,
        }
    }

    /// Number of records sent to the target.
    pub fn events(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Watermark plus bookkeeping about completed passes.
///
/// The watermark only moves forward and only when a pass completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    last_synced_at: DateTime<Utc>,
    passes: u64,
    last_report: Option<SyncReport>,
}

impl SyncState {
    /// Create state whose watermark starts at the Unix epoch.
    pub fn new() -> Self {
        Self::with_watermark(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Create state with an explicit starting watermark.
    pub fn with_watermark(last_synced_at: DateTime<Utc>) -> Self {
        Self {
            last_synced_at,
            passes: 0,
            last_report: None,
        }
    }

    /// The last synchronized instant.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    /// Completed passes since creation.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    /// Record a completed pass and move the watermark to its start.
    ///
    /// Returns false if the watermark was already ahead; it is never set
    /// backwards.
    pub fn complete(&mut self, report: SyncReport) -> bool {
        let advanced = report.started_at > self.last_synced_at;
        if advanced {
            self.last_synced_at = report.started_at;
        }
        self.passes += 1;
        self.last_report = Some(report);
        advanced
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_at_epoch() {
        let state = SyncState::new();
        assert_eq!(state.watermark(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(state.passes(), 0);
        assert!(state.last_report().is_none());
    }

    #[test]
    fn test_complete_advances_watermark() {
        let mut state = SyncState::new();
        let now = Utc::now();

        assert!(state.complete(SyncReport::new(SyncStrategy::Full, now)));
        assert_eq!(state.watermark(), now);
        assert_eq!(state.passes(), 1);
        assert_eq!(state.last_report().unwrap().strategy, SyncStrategy::Full);
    }

    #[test]
    fn test_watermark_never_moves_backwards() {
        let now = Utc::now();
        let mut state = SyncState::with_watermark(now);

        let earlier = now - chrono::Duration::seconds(30);
        assert!(!state.complete(SyncReport::new(SyncStrategy::Incremental, earlier)));
        assert_eq!(state.watermark(), now);
        assert_eq!(state.passes(), 1);
    }

    #[test]
    fn test_report_events() {
        let mut report = SyncReport::new(SyncStrategy::Incremental, Utc::now());
        report.inserted = 2;
        report.updated = 1;
        assert_eq!(report.events(), 3);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(SyncStrategy::Full.to_string(), "full");
        assert_eq!(SyncStrategy::Batched { batch_size: 4 }.to_string(), "batched(4)");
    }
}
