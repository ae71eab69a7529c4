//! Document store trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docsync_common::{Record, RecordFields, RecordId, RecordPatch, Result};

/// Predicate over stored records, plus paging for `find`.
///
/// Every filter that is set must match. `skip` and `limit` only apply to
/// `find`; `count`, `update` and `remove` consider every match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Match a single id.
    pub id: Option<RecordId>,
    /// Match records with exactly this name.
    pub name: Option<String>,
    /// Match records created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Match records created at or before this instant.
    pub created_at_or_before: Option<DateTime<Utc>>,
    /// Match records updated strictly after this instant.
    pub updated_after: Option<DateTime<Utc>>,
    /// Number of matches to skip (in insertion order).
    pub skip: usize,
    /// Maximum number of matches to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Match every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match the record with the given id.
    pub fn by_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Match records with the given name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn created_at_or_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_at_or_before = Some(at);
        self
    }

    pub fn updated_after(mut self, at: DateTime<Utc>) -> Self {
        self.updated_after = Some(at);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a record satisfies every filter of this query.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(id) = self.id {
            if record.id != id {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &record.name != name {
                return false;
            }
        }
        if let Some(at) = self.created_after {
            if record.created_at <= at {
                return false;
            }
        }
        if let Some(at) = self.created_at_or_before {
            if record.created_at > at {
                return false;
            }
        }
        if let Some(at) = self.updated_after {
            if record.updated_at <= at {
                return false;
            }
        }
        true
    }
}

/// Document store trait for the source and target collections.
///
/// Implementations must keep insertion order and assign ids and
/// timestamps themselves. Operations that match nothing succeed with an
/// empty result.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get the store name (e.g., "source", "target").
    fn name(&self) -> &str;

    /// Insert a new record.
    ///
    /// # Postconditions
    /// - A fresh id is assigned
    /// - `created_at == updated_at == now`
    async fn insert(&self, fields: RecordFields) -> Result<Record>;

    /// Insert a copy of a record taken from another store.
    ///
    /// The id and both timestamps are kept as given.
    ///
    /// # Errors
    /// - `AlreadyExists` if a record with the same id is stored
    async fn insert_snapshot(&self, record: Record) -> Result<Record>;

    /// Find matching records in insertion order, honouring skip/limit.
    async fn find(&self, query: &Query) -> Result<Vec<Record>>;

    /// Update every matching record.
    ///
    /// Each match gets `updated_at = now`. Returns the updated records.
    async fn update(&self, query: &Query, patch: &RecordPatch) -> Result<Vec<Record>>;

    /// Remove every matching record and return how many were removed.
    async fn remove(&self, query: &Query) -> Result<usize>;

    /// Count matching records.
    async fn count(&self, query: &Query) -> Result<usize>;

    /// Look up a single record by id.
    async fn get(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.find(&Query::by_id(id)).await?.into_iter().next())
    }

    /// Remove all records.
    async fn clear(&self) -> Result<usize> {
        self.remove(&Query::all()).await
    }
}
