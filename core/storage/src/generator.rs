//! Synthetic records for populating the source store.

use tracing::info;

use docsync_common::{Record, RecordFields, RecordPatch, Result};
use crate::store::{DocumentStore, Query};

const COMPANIES: &[&str] = &[
    "GE", "Exxon", "Google", "Apple", "Microsoft", "Amazon", "Tesla", "Intel", "Oracle",
    "Boeing", "Pfizer", "Nike", "Visa", "Walmart", "Shell", "Siemens", "Toyota", "Samsung",
];

const OWNERS: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
    "mallory", "niaj", "olivia", "peggy", "rupert", "sybil", "trent", "victor", "walter",
];

/// Largest amount a generated record carries.
pub const MAX_AMOUNT: i64 = 10_000_000;

/// Produces random record payloads.
#[derive(Debug, Clone, Default)]
pub struct RecordGenerator;

impl RecordGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a single random payload.
    pub fn record(&self) -> RecordFields {
        RecordFields::new(
            pick(COMPANIES),
            pick(OWNERS),
            rand::random_range(1..=MAX_AMOUNT),
        )
    }

    /// Lazily generate `count` random payloads.
    pub fn generate(&self, count: usize) -> impl Iterator<Item = RecordFields> + '_ {
        (0..count).map(|_| self.record())
    }

    /// A random owner name, for mutating existing records.
    pub fn owner(&self) -> String {
        pick(OWNERS).to_string()
    }
}

fn pick(pool: &'static [&'static str]) -> &'static str {
    pool[rand::random_range(0..pool.len())]
}

/// The fixed three-record data set used by the demo scenario.
pub fn sample_records() -> Vec<RecordFields> {
    vec![
        RecordFields::new("GE", "test", 1_000_000),
        RecordFields::new("Exxon", "test2", 5_000_000),
        RecordFields::new("Google", "test3", 5_000_001),
    ]
}

/// Insert `count` generated records into `store`, one at a time.
///
/// Returns the number of records inserted. Stops at the first failed
/// insert; records already written stay in the store.
pub async fn load_source(store: &dyn DocumentStore, count: usize) -> Result<usize> {
    let generator = RecordGenerator::new();
    let mut inserted = 0;
    for fields in generator.generate(count) {
        store.insert(fields).await?;
        inserted += 1;
    }

    info!("Loaded {} record(s) into {} store", inserted, store.name());
    Ok(inserted)
}

/// Set the owner of every record called `name`.
pub async fn touch(store: &dyn DocumentStore, name: &str, owner: &str) -> Result<Vec<Record>> {
    store
        .update(&Query::by_name(name), &RecordPatch::owner(owner))
        .await
}
