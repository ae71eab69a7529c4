//! In-memory document store.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use docsync_common::{Error, Record, RecordFields, RecordId, RecordPatch, Result};
use crate::store::{DocumentStore, Query};

/// Records plus the next id to hand out.
#[derive(Debug)]
struct Collection {
    records: Vec<Record>,
    next_id: u64,
}

/// In-memory document store.
///
/// All data is stored in memory and lost on drop. Clones share the same
/// collection.
#[derive(Clone)]
pub struct MemoryStore {
    name: String,
    collection: Arc<RwLock<Collection>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: Arc::new(RwLock::new(Collection {
                records: Vec::new(),
                next_id: 1,
            })),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collection>> {
        self.collection
            .read()
            .map_err(|_| Error::Store(format!("{} store lock poisoned", self.name)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collection>> {
        self.collection
            .write()
            .map_err(|_| Error::Store(format!("{} store lock poisoned", self.name)))
    }

    /// The id following `id`, or an error once the id space is used up.
    fn after(id: RecordId) -> Result<u64> {
        id.get()
            .checked_add(1)
            .ok_or_else(|| Error::Store(format!("Record id {} leaves no room for new ids", id)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, fields: RecordFields) -> Result<Record> {
        let mut collection = self.write()?;

        let id = RecordId::new(collection.next_id)?;
        collection.next_id = Self::after(id)?;

        let record = Record::new(id, fields, Utc::now());
        collection.records.push(record.clone());

        debug!("{}: inserted record {}", self.name, id);
        Ok(record)
    }

    async fn insert_snapshot(&self, record: Record) -> Result<Record> {
        let mut collection = self.write()?;

        if collection.records.iter().any(|r| r.id == record.id) {
            return Err(Error::AlreadyExists(format!(
                "Record {} already in {} store",
                record.id, self.name
            )));
        }

        // Fresh ids must never collide with copied ones.
        collection.next_id = collection.next_id.max(Self::after(record.id)?);
        collection.records.push(record.clone());

        Ok(record)
    }

    async fn find(&self, query: &Query) -> Result<Vec<Record>> {
        let collection = self.read()?;
        let matches = collection
            .records
            .iter()
            .filter(|r| query.matches(r))
            .skip(query.skip);

        let found = match query.limit {
            Some(limit) => matches.take(limit).cloned().collect(),
            None => matches.cloned().collect(),
        };
        Ok(found)
    }

    async fn update(&self, query: &Query, patch: &RecordPatch) -> Result<Vec<Record>> {
        let mut collection = self.write()?;
        let now = Utc::now();

        let mut updated = Vec::new();
        for record in collection.records.iter_mut().filter(|r| query.matches(r)) {
            record.apply(patch, now);
            updated.push(record.clone());
        }

        debug!("{}: updated {} record(s)", self.name, updated.len());
        Ok(updated)
    }

    async fn remove(&self, query: &Query) -> Result<usize> {
        let mut collection = self.write()?;
        let before = collection.records.len();
        collection.records.retain(|r| !query.matches(r));
        Ok(before - collection.records.len())
    }

    async fn count(&self, query: &Query) -> Result<usize> {
        let collection = self.read()?;
        Ok(collection.records.iter().filter(|r| query.matches(r)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fields(name: &str) -> RecordFields {
        RecordFields::new(name, "test", 100)
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new("source");

        let a = store.insert(fields("GE")).await.unwrap();
        let b = store.insert(fields("Exxon")).await.unwrap();

        assert_eq!(a.id.get(), 1);
        assert_eq!(b.id.get(), 2);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn test_find_keeps_insertion_order() {
        let store = MemoryStore::new("source");
        for name in ["GE", "Exxon", "Google"] {
            store.insert(fields(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .find(&Query::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["GE", "Exxon", "Google"]);
    }

    #[tokio::test]
    async fn test_find_with_skip_and_limit() {
        let store = MemoryStore::new("source");
        for i in 0..5 {
            store.insert(fields(&format!("r{}", i))).await.unwrap();
        }

        let page = store.find(&Query::all().skip(2).limit(2)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "r2");
        assert_eq!(page[1].name, "r3");

        let tail = store.find(&Query::all().skip(4).limit(2)).await.unwrap();
        assert_eq!(tail.len(), 1);

        let past_end = store.find(&Query::all().skip(5).limit(2)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_update_sets_updated_at() {
        let store = MemoryStore::new("source");
        let inserted = store.insert(fields("GE")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2)).await;
        let updated = store
            .update(&Query::by_name("GE"), &RecordPatch::owner("test4"))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].owner, "test4");
        assert_eq!(updated[0].created_at, inserted.created_at);
        assert!(updated[0].updated_at > inserted.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_empty_not_error() {
        let store = MemoryStore::new("source");
        let updated = store
            .update(&Query::by_id(RecordId::new(42).unwrap()), &RecordPatch::owner("x"))
            .await
            .unwrap();
        assert!(updated.is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_count() {
        let store = MemoryStore::new("source");
        store.insert(fields("GE")).await.unwrap();
        store.insert(fields("GE")).await.unwrap();
        store.insert(fields("Exxon")).await.unwrap();

        assert_eq!(store.count(&Query::by_name("GE")).await.unwrap(), 2);
        assert_eq!(store.remove(&Query::by_name("GE")).await.unwrap(), 2);
        assert_eq!(store.count(&Query::all()).await.unwrap(), 1);
        assert_eq!(store.remove(&Query::by_name("GE")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new("target");
        store.insert(fields("GE")).await.unwrap();
        store.insert(fields("Exxon")).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count(&Query::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_id_and_timestamps() {
        let source = MemoryStore::new("source");
        let target = MemoryStore::new("target");

        source.insert(fields("GE")).await.unwrap();
        let original = source.insert(fields("Exxon")).await.unwrap();

        let copy = target.insert_snapshot(original.clone()).await.unwrap();
        assert_eq!(copy, original);

        // Next fresh id skips past the copied one.
        let fresh = target.insert(fields("Google")).await.unwrap();
        assert_eq!(fresh.id.get(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_duplicate_id_fails() {
        let source = MemoryStore::new("source");
        let target = MemoryStore::new("target");
        let original = source.insert(fields("GE")).await.unwrap();

        target.insert_snapshot(original.clone()).await.unwrap();
        let err = target.insert_snapshot(original).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_snapshot_at_max_id_fails() {
        let store = MemoryStore::new("target");
        let record = Record::new(
            RecordId::new(u64::MAX).unwrap(),
            fields("GE"),
            chrono::Utc::now(),
        );

        let err = store.insert_snapshot(record).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.count(&Query::all()).await.unwrap(), 0);

        // The counter is untouched.
        assert_eq!(store.insert(fields("Exxon")).await.unwrap().id.get(), 1);
    }

    #[tokio::test]
    async fn test_insert_after_last_id_fails() {
        let store = MemoryStore::new("target");
        let record = Record::new(
            RecordId::new(u64::MAX - 1).unwrap(),
            fields("GE"),
            chrono::Utc::now(),
        );
        store.insert_snapshot(record).await.unwrap();

        let err = store.insert(fields("Exxon")).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.count(&Query::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get() {
        let store = MemoryStore::new("source");
        let inserted = store.insert(fields("GE")).await.unwrap();

        assert_eq!(store.get(inserted.id).await.unwrap(), Some(inserted));
        assert_eq!(store.get(RecordId::new(9).unwrap()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clones_share_collection() {
        let store = MemoryStore::new("source");
        let other = store.clone();
        store.insert(fields("GE")).await.unwrap();
        assert_eq!(other.count(&Query::all()).await.unwrap(), 1);
    }
}
