//! Core sync engine implementing the four sync strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use docsync_common::{Error, Record, RecordPatch, Result};
use docsync_storage::{DocumentStore, Query};

use crate::state::{SyncReport, SyncState, SyncStrategy};

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size used by batched sync when none is given.
    pub batch_size: usize,
    /// Seconds between auto-sync passes when none is given.
    pub auto_sync_interval_secs: u64,
    /// Run a full sync before auto-sync starts if the target is empty.
    pub bootstrap_on_empty: bool,
    /// Synthetic records loaded into the source at startup.
    pub seed_records: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            auto_sync_interval_secs: 5,
            bootstrap_on_empty: true,
            seed_records: 0,
        }
    }
}

impl SyncConfig {
    /// Set the default batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the default auto-sync interval.
    pub fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval_secs = interval.as_secs();
        self
    }

    /// Enable or disable the cold-start full sync.
    pub fn with_bootstrap_on_empty(mut self, bootstrap: bool) -> Self {
        self.bootstrap_on_empty = bootstrap;
        self
    }

    /// Set the number of records loaded at startup.
    pub fn with_seed_records(mut self, seed_records: usize) -> Self {
        self.seed_records = seed_records;
        self
    }

    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.auto_sync_interval_secs)
    }

    /// Check that batch size and interval are positive.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidInput(
                "batch_size must be a positive integer".to_string(),
            ));
        }
        if self.auto_sync_interval_secs == 0 {
            return Err(Error::InvalidInput(
                "auto_sync_interval_secs must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Query for records created after the watermark.
pub fn new_since(watermark: DateTime<Utc>) -> Query {
    Query::all().created_after(watermark)
}

/// Query for records created at or before the watermark but updated after it.
///
/// A record created after the watermark never matches, whatever its
/// `updated_at`: it is new, not updated.
pub fn updated_since(watermark: DateTime<Utc>) -> Query {
    Query::all()
        .created_at_or_before(watermark)
        .updated_after(watermark)
}

/// How a source record relates to a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Updated,
    Unchanged,
}

impl ChangeKind {
    /// Classify a record against a watermark.
    pub fn classify(record: &Record, watermark: DateTime<Utc>) -> Self {
        if new_since(watermark).matches(record) {
            ChangeKind::New
        } else if updated_since(watermark).matches(record) {
            ChangeKind::Updated
        } else {
            ChangeKind::Unchanged
        }
    }
}

/// Paging position for batched sync.
#[derive(Debug, Clone, Default)]
struct BatchCursor {
    offset: usize,
    last_page_size: Option<usize>,
}

impl BatchCursor {
    fn exhausted(&self) -> bool {
        self.last_page_size == Some(0)
    }
}

/// One-way sync engine from a source store to a target store.
///
/// Owns the watermark. Passes are serialized: a manual sync and an
/// auto-sync pass never run at the same time.
pub struct SyncEngine {
    /// Store records are read from.
    source: Arc<dyn DocumentStore>,
    /// Store records are written to.
    target: Arc<dyn DocumentStore>,
    /// Watermark and pass bookkeeping.
    state: RwLock<SyncState>,
    /// Held for the duration of a pass.
    gate: Mutex<()>,
    /// Configuration.
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new sync engine with the watermark at the Unix epoch.
    pub fn new(
        source: Arc<dyn DocumentStore>,
        target: Arc<dyn DocumentStore>,
        config: SyncConfig,
    ) -> Result<Self> {
        Self::with_state(source, target, config, SyncState::new())
    }

    /// Create a new sync engine starting from the given watermark.
    pub fn with_watermark(
        source: Arc<dyn DocumentStore>,
        target: Arc<dyn DocumentStore>,
        config: SyncConfig,
        watermark: DateTime<Utc>,
    ) -> Result<Self> {
        Self::with_state(source, target, config, SyncState::with_watermark(watermark))
    }

    fn with_state(
        source: Arc<dyn DocumentStore>,
        target: Arc<dyn DocumentStore>,
        config: SyncConfig,
        state: SyncState,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            target,
            state: RwLock::new(state),
            gate: Mutex::new(()),
            config,
        })
    }

    pub fn source(&self) -> &Arc<dyn DocumentStore> {
        &self.source
    }

    pub fn target(&self) -> &Arc<dyn DocumentStore> {
        &self.target
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The last synchronized instant.
    pub async fn watermark(&self) -> DateTime<Utc> {
        self.state.read().await.watermark()
    }

    /// Snapshot of the sync state.
    pub async fn status(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Replace the target with a copy of every source record.
    pub async fn sync_full(&self) -> Result<SyncReport> {
        let _gate = self.gate.lock().await;
        let start = Instant::now();
        let mut report = SyncReport::new(SyncStrategy::Full, Utc::now());

        info!("Starting full sync");

        report.cleared = self.target.clear().await?;
        for record in self.source.find(&Query::all()).await? {
            self.send(record).await?;
            report.inserted += 1;
        }

        Ok(self.finish(report, start).await)
    }

    /// Replace the target with a copy of the source, one page at a time.
    ///
    /// # Errors
    /// - `InvalidInput` if `batch_size` is zero
    pub async fn sync_batched(&self, batch_size: usize) -> Result<SyncReport> {
        if batch_size == 0 {
            return Err(Error::InvalidInput(
                "Batch size must be a positive integer".to_string(),
            ));
        }

        let _gate = self.gate.lock().await;
        let start = Instant::now();
        let mut report = SyncReport::new(SyncStrategy::Batched { batch_size }, Utc::now());

        info!("Starting batched sync (batch size {})", batch_size);

        report.cleared = self.target.clear().await?;

        let mut cursor = BatchCursor::default();
        while !cursor.exhausted() {
            let copied = self.sync_batch(&mut cursor, batch_size).await?;
            report.inserted += copied;
            report.batches += 1;
        }

        Ok(self.finish(report, start).await)
    }

    /// Copy the next page of source records and return its size.
    async fn sync_batch(&self, cursor: &mut BatchCursor, batch_size: usize) -> Result<usize> {
        let page = self
            .source
            .find(&Query::all().skip(cursor.offset).limit(batch_size))
            .await?;
        let size = page.len();

        debug!("Batch at offset {}: {} record(s)", cursor.offset, size);
        for record in page {
            self.send(record).await?;
        }

        cursor.offset += size;
        cursor.last_page_size = Some(size);
        Ok(size)
    }

    /// Apply records created or updated since the watermark.
    pub async fn sync_incremental(&self) -> Result<SyncReport> {
        let _gate = self.gate.lock().await;
        let start = Instant::now();
        let watermark = self.watermark().await;
        let mut report = SyncReport::new(SyncStrategy::Incremental, Utc::now());

        debug!("Starting incremental sync since {}", watermark);

        // Both sets are read before any write so they reflect one view.
        let created = self.source.find(&new_since(watermark)).await?;
        let updated = self.source.find(&updated_since(watermark)).await?;

        for record in created {
            if self.target.get(record.id).await?.is_some() {
                warn!("Record {} already in target, updating instead", record.id);
                self.overwrite(&record).await?;
                report.updated += 1;
            } else {
                self.send(record).await?;
                report.inserted += 1;
            }
        }

        for record in updated {
            if self.overwrite(&record).await? {
                report.updated += 1;
            } else {
                warn!("Updated record {} has no copy in target, skipping", record.id);
                report.missing += 1;
            }
        }

        Ok(self.finish(report, start).await)
    }

    /// Write a source record into the target as a new document.
    async fn send(&self, record: Record) -> Result<()> {
        debug!("Event sent: {}", record);
        self.target.insert_snapshot(record).await?;
        Ok(())
    }

    /// Overwrite the payload of the target copy; false if there is none.
    async fn overwrite(&self, record: &Record) -> Result<bool> {
        debug!("Event sent (update): {}", record);
        let patch = RecordPatch::from_fields(record.fields());
        let touched = self.target.update(&Query::by_id(record.id), &patch).await?;
        Ok(!touched.is_empty())
    }

    async fn finish(&self, mut report: SyncReport, start: Instant) -> SyncReport {
        report.duration = start.elapsed();

        let mut state = self.state.write().await;
        state.complete(report.clone());

        info!(
            "{} sync completed in {:?}: {} inserted, {} updated, {} cleared",
            report.strategy, report.duration, report.inserted, report.updated, report.cleared
        );
        report
    }
}
