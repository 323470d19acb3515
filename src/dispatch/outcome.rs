//! Operation outcomes and their transport mapping

use serde_json::{json, Value};

use crate::channel::{ChannelStats, Envelope};

/// Successful result of one operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(Envelope),
    Found(Envelope),
    /// Retrieve of a missing or soft-deleted record
    Absent,
    /// `None` when there was no visible record to update
    Updated(Option<Envelope>),
    Deleted,
    /// `None` when the record does not exist
    Restored(Option<Envelope>),
    Recent(Vec<Envelope>),
    Flushed { files_removed: usize },
    Stats(ChannelStats),
    Connected,
}

impl Outcome {
    /// Transport status for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Created(_) => 201,
            Outcome::Found(_) => 200,
            Outcome::Absent => 404,
            Outcome::Updated(_) => 200,
            Outcome::Deleted => 204,
            Outcome::Restored(_) => 200,
            Outcome::Recent(_) => 200,
            Outcome::Flushed { .. } => 204,
            Outcome::Stats(_) => 200,
            Outcome::Connected => 200,
        }
    }

    /// JSON body for this outcome (`null` where there is nothing to return)
    pub fn body(&self) -> Value {
        match self {
            Outcome::Created(envelope) => json!({ "result": envelope }),
            Outcome::Found(envelope) => json!(envelope),
            Outcome::Updated(envelope) | Outcome::Restored(envelope) => json!(envelope),
            Outcome::Recent(records) => json!(records),
            Outcome::Stats(stats) => json!(stats),
            Outcome::Connected => json!(true),
            Outcome::Absent | Outcome::Deleted | Outcome::Flushed { .. } => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let envelope = Envelope::new(1, json!({}));
        assert_eq!(Outcome::Created(envelope.clone()).status_code(), 201);
        assert_eq!(Outcome::Found(envelope.clone()).status_code(), 200);
        assert_eq!(Outcome::Absent.status_code(), 404);
        assert_eq!(Outcome::Updated(Some(envelope.clone())).status_code(), 200);
        assert_eq!(Outcome::Updated(None).status_code(), 200);
        assert_eq!(Outcome::Deleted.status_code(), 204);
        assert_eq!(Outcome::Restored(Some(envelope)).status_code(), 200);
        assert_eq!(Outcome::Restored(None).status_code(), 200);
        assert_eq!(Outcome::Recent(vec![]).status_code(), 200);
        assert_eq!(Outcome::Flushed { files_removed: 0 }.status_code(), 204);
        assert_eq!(Outcome::Connected.status_code(), 200);
    }

    #[test]
    fn test_created_body_wraps_result() {
        let envelope = Envelope::new(4, json!({"a": 1}));
        let body = Outcome::Created(envelope).body();
        assert_eq!(body["result"]["id"], 4);
        assert_eq!(body["result"]["data"]["a"], 1);
        assert!(body["result"].get("is_deleted").is_none());
    }

    #[test]
    fn test_absent_update_and_restore_bodies_are_null() {
        assert_eq!(Outcome::Updated(None).body(), Value::Null);
        assert_eq!(Outcome::Restored(None).body(), Value::Null);
        let body = Outcome::Restored(Some(Envelope::new(3, json!("x")))).body();
        assert_eq!(body["id"], 3);
    }

    #[test]
    fn test_stats_body() {
        let body = Outcome::Stats(ChannelStats {
            entries: 4,
            next_id: 5,
        })
        .body();
        assert_eq!(body, json!({"entries": 4, "next_id": 5}));
    }

    #[test]
    fn test_recent_body_is_list() {
        let body = Outcome::Recent(vec![Envelope::new(2, json!(2)), Envelope::new(1, json!(1))]).body();
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
