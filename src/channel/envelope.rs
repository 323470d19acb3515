//! Record envelope: the stored unit of a channel
//!
//! An envelope wraps the caller's opaque payload with the identifier assigned
//! at creation, timestamps and the soft-delete flags. The identifier never
//! changes after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier assigned at creation
    pub id: u64,
    /// Creation timestamp (ISO-8601, UTC)
    pub created: DateTime<Utc>,
    /// Timestamp of the last update, absent until the first update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Caller payload, opaque to the store
    pub data: Value,
    /// Soft-delete flag
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
    /// Set by restore, never cleared
    #[serde(default, skip_serializing_if = "is_false")]
    pub was_restored: bool,
}

impl Envelope {
    /// Build a fresh envelope for a newly allocated identifier.
    pub fn new(id: u64, data: Value) -> Self {
        Self::created_at(id, data, Utc::now())
    }

    /// Build an envelope with an explicit creation time.
    pub fn created_at(id: u64, data: Value, created: DateTime<Utc>) -> Self {
        Self {
            id,
            created,
            updated: None,
            data,
            is_deleted: false,
            was_restored: false,
        }
    }

    /// Whether default (non-forced) reads may see this record.
    pub fn is_visible(&self) -> bool {
        !self.is_deleted
    }

    /// Apply an update payload and stamp `updated`.
    pub fn apply_update(&mut self, payload: Value) {
        self.merge_data(payload);
        self.updated = Some(Utc::now());
    }

    /// Merge `payload` into `data`.
    ///
    /// When both sides are JSON objects the payload's keys are upserted
    /// recursively. Any other combination replaces `data` outright.
    pub fn merge_data(&mut self, payload: Value) {
        match (&mut self.data, payload) {
            (Value::Object(existing), Value::Object(incoming)) => merge_objects(existing, incoming),
            (data, payload) => *data = payload,
        }
    }

    /// Mark the record soft-deleted.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Clear the soft-delete flag and remember that a restore happened.
    pub fn mark_restored(&mut self) {
        self.is_deleted = false;
        self.was_restored = true;
    }
}

fn merge_objects(existing: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (existing.get_mut(&key), value) {
            (Some(Value::Object(inner)), Value::Object(nested)) => merge_objects(inner, nested),
            (_, value) => {
                existing.insert(key, value);
            }
        }
    }
}
