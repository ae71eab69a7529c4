//! Periodic auto-sync with toggle semantics.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use docsync_common::{Error, Result};
use docsync_storage::Query;

use crate::engine::SyncEngine;

/// Auto-sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerStatus {
    /// No background task.
    Stopped,
    /// Background task running an incremental pass every `interval`.
    Running { interval: Duration },
}

/// The spawned loop and the token that stops it.
struct RunningTask {
    interval: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Scheduler for the periodic auto-sync loop.
///
/// Start and stop share one control: `toggle`. Cancellation is
/// cooperative; a pass that is already running finishes first.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    task: Mutex<Option<RunningTask>>,
    /// Completed background passes.
    passes: Arc<AtomicU64>,
}

impl SyncScheduler {
    /// Create a stopped scheduler for the given engine.
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            task: Mutex::new(None),
            passes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get current status.
    pub async fn status(&self) -> SchedulerStatus {
        match &*self.task.lock().await {
            Some(task) => SchedulerStatus::Running {
                interval: task.interval,
            },
            None => SchedulerStatus::Stopped,
        }
    }

    /// Background passes completed so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Start auto-sync if stopped, stop it if running.
    ///
    /// Starting needs a positive interval; the interval is ignored when
    /// stopping. When starting against an empty target a full sync runs
    /// first (if `bootstrap_on_empty` is set).
    ///
    /// # Errors
    /// - `InvalidInput` if starting without an interval or with a zero one
    pub async fn toggle(&self, interval: Option<Duration>) -> Result<SchedulerStatus> {
        let mut task = self.task.lock().await;

        if let Some(running) = task.take() {
            Self::shutdown(running).await?;
            return Ok(SchedulerStatus::Stopped);
        }

        let interval = match interval {
            Some(interval) if !interval.is_zero() => interval,
            Some(_) => {
                return Err(Error::InvalidInput(
                    "Auto-sync interval must be positive".to_string(),
                ))
            }
            None => {
                return Err(Error::InvalidInput(
                    "Auto-sync interval required to start".to_string(),
                ))
            }
        };

        if self.engine.config().bootstrap_on_empty
            && self.engine.target().count(&Query::all()).await? == 0
        {
            info!("Target is empty, running full sync before auto-sync");
            self.engine.sync_full().await?;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(Self::run(
            self.engine.clone(),
            interval,
            token.clone(),
            self.passes.clone(),
        ));

        *task = Some(RunningTask {
            interval,
            token,
            handle,
        });
        Ok(SchedulerStatus::Running { interval })
    }

    /// Stop auto-sync if running. Returns true if it was running.
    pub async fn stop(&self) -> Result<bool> {
        match self.task.lock().await.take() {
            Some(running) => {
                Self::shutdown(running).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn shutdown(running: RunningTask) -> Result<()> {
        running.token.cancel();
        running
            .handle
            .await
            .map_err(|e| Error::Sync(format!("Auto-sync task failed: {}", e)))
    }

    /// Run incremental passes until cancelled.
    async fn run(
        engine: Arc<SyncEngine>,
        interval: Duration,
        token: CancellationToken,
        passes: Arc<AtomicU64>,
    ) {
        info!("Auto-sync started (every {:?})", interval);

        loop {
            if token.is_cancelled() {
                break;
            }

            match engine.sync_incremental().await {
                Ok(report) => {
                    passes.fetch_add(1, Ordering::SeqCst);
                    debug!("Auto-sync pass sent {} event(s)", report.events());
                }
                Err(e) => {
                    error!("Auto-sync pass failed: {}", e);
                }
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Auto-sync stopped");
    }
}
