//! Common types used throughout docsync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a record.
///
/// Ids are positive integers handed out sequentially by each store. A
/// target copy keeps the id of the source record it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64")]
pub struct RecordId(u64);

impl RecordId {
    /// Create a new RecordId.
    ///
    /// # Errors
    /// - Returns error if `id` is zero
    pub fn new(id: u64) -> crate::Result<Self> {
        if id == 0 {
            return Err(crate::Error::InvalidInput(
                "RecordId must be positive".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner integer value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RecordId {
    type Error = crate::Error;

    fn try_from(id: u64) -> crate::Result<Self> {
        Self::new(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user-visible payload of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub name: String,
    pub owner: String,
    pub amount: i64,
}

impl RecordFields {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, amount: i64) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            amount,
        }
    }
}

/// A stored document.
///
/// Invariant: `created_at <= updated_at`. The id never changes once the
/// record has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub owner: String,
    pub amount: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Build a freshly inserted record; both timestamps are `now`.
    pub fn new(id: RecordId, fields: RecordFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            owner: fields.owner,
            amount: fields.amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of the payload without id and timestamps.
    pub fn fields(&self) -> RecordFields {
        RecordFields {
            name: self.name.clone(),
            owner: self.owner.clone(),
            amount: self.amount,
        }
    }

    /// Apply a patch and bump `updated_at`.
    ///
    /// `updated_at` never drops below `created_at`, even if the wall clock
    /// stepped backwards.
    pub fn apply(&mut self, patch: &RecordPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(owner) = &patch.owner {
            self.owner = owner.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        self.updated_at = now.max(self.created_at);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} (owner: {}, amount: {}) created {} updated {}",
            self.id,
            self.name,
            self.owner,
            self.amount,
            self.created_at.format("%H:%M:%S%.3f"),
            self.updated_at.format("%H:%M:%S%.3f"),
        )
    }
}

/// Partial update of a record's payload (`$set` semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub amount: Option<i64>,
}

impl RecordPatch {
    /// Patch that only sets the owner.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Self::default()
        }
    }

    /// Patch that overwrites the whole payload.
    pub fn from_fields(fields: RecordFields) -> Self {
        Self {
            name: Some(fields.name),
            owner: Some(fields.owner),
            amount: Some(fields.amount),
        }
    }

    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.owner.is_none() && self.amount.is_none()
    }
}
