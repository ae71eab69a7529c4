//! Document store abstraction for docsync.
//!
//! This module provides a trait-based interface over a collection of
//! timestamped records, an in-memory implementation used for both the
//! source and the target side, and a generator for synthetic records.
//!
//! # Design Principles
//! - Empty results are not errors: `find`, `update`, `remove` and `count`
//!   report "nothing matched" through their return value
//! - Timestamps are owned by the store: callers never set `updatedAt`
//! - Insertion order is preserved and is the order `find` returns

pub mod generator;
pub mod memory;
pub mod store;

pub use generator::{load_source, sample_records, touch, RecordGenerator};
pub use memory::MemoryStore;
pub use store::{DocumentStore, Query};
