//! docsync Sync Engine
//!
//! This module provides one-way synchronization from a source store to a
//! target store, including:
//! - Full sync: replace the target with the whole source
//! - Batched sync: the same end state, copied page by page
//! - Incremental sync: apply only what changed since the watermark
//! - Auto-sync: a cancellable loop of incremental passes

pub mod engine;
pub mod scheduler;
pub mod state;

// Re-export main types
pub use engine::{new_since, updated_since, ChangeKind, SyncConfig, SyncEngine};
pub use scheduler::{SchedulerStatus, SyncScheduler};
pub use state::{SyncReport, SyncState, SyncStrategy};
