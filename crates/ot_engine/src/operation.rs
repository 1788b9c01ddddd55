//! Edit operation types and collaborator identity
//!
//! This module defines the atomic unit of collaborative editing: a single
//! insert, delete, or retain, tagged with the collaborator that authored it
//! and the version it was created against. Operations are immutable values;
//! the transform step derives adjusted copies instead of mutating in place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identity of one collaborator.
///
/// Compared as a plain string. The Insert/Insert position tie-break relies on
/// this ordering, so the id must be identical on every peer for the same
/// collaborator (an auth user id, a device id, or a generated one).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollaboratorId(pub String);

impl CollaboratorId {
    /// Create an id from an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id for callers without an external identity.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollaboratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollaboratorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CollaboratorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What an operation does to the document.
///
/// The discriminant doubles as the wire-level event payload tag, so every
/// value crossing the transport names its kind explicitly and receivers can
/// match on it exhaustively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OpKind {
    /// Insert text at the operation position
    Insert { content: String },
    /// Remove `length` characters starting at the operation position
    Delete { length: usize },
    /// Touch nothing (placeholder for cursor-style bookkeeping)
    Retain,
}

/// One atomic edit.
///
/// `position` is a character offset into the document as it was *before* the
/// operation applies. `timestamp_ms` is advisory wall-clock metadata and is
/// never consulted when transforming; `version` is assigned by the originator
/// as its own local version plus one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(flatten)]
    pub kind: OpKind,
    pub position: usize,
    pub origin: CollaboratorId,
    pub timestamp_ms: u64,
    pub version: u64,
}

impl Operation {
    /// Create an insert of `content` at `position`.
    pub fn insert(
        position: usize,
        content: impl Into<String>,
        origin: CollaboratorId,
        version: u64,
    ) -> Self {
        Self {
            kind: OpKind::Insert {
                content: content.into(),
            },
            position,
            origin,
            timestamp_ms: current_timestamp_ms(),
            version,
        }
    }

    /// Create a delete of `length` characters starting at `position`.
    pub fn delete(position: usize, length: usize, origin: CollaboratorId, version: u64) -> Self {
        Self {
            kind: OpKind::Delete { length },
            position,
            origin,
            timestamp_ms: current_timestamp_ms(),
            version,
        }
    }

    /// Create a retain (applies as a no-op).
    pub fn retain(origin: CollaboratorId, version: u64) -> Self {
        Self {
            kind: OpKind::Retain,
            position: 0,
            origin,
            timestamp_ms: current_timestamp_ms(),
            version,
        }
    }

    /// Kind as a short static name, for log lines.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            OpKind::Insert { .. } => "insert",
            OpKind::Delete { .. } => "delete",
            OpKind::Retain => "retain",
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_constructor() {
        let op = Operation::insert(5, "hi", CollaboratorId::new("alice"), 1);
        assert_eq!(op.position, 5);
        assert_eq!(op.origin, CollaboratorId::new("alice"));
        assert_eq!(op.version, 1);
        assert!(op.timestamp_ms > 0);
        assert_eq!(
            op.kind,
            OpKind::Insert {
                content: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_delete_constructor() {
        let op = Operation::delete(2, 3, CollaboratorId::new("bob"), 7);
        assert_eq!(op.position, 2);
        assert_eq!(op.kind, OpKind::Delete { length: 3 });
        assert_eq!(op.version, 7);
    }

    #[test]
    fn test_retain_constructor() {
        let op = Operation::retain(CollaboratorId::new("alice"), 4);
        assert_eq!(op.position, 0);
        assert_eq!(op.kind, OpKind::Retain);
    }

    #[test]
    fn test_kind_name() {
        let alice = CollaboratorId::new("alice");
        assert_eq!(Operation::insert(0, "x", alice.clone(), 1).kind_name(), "insert");
        assert_eq!(Operation::delete(0, 1, alice.clone(), 1).kind_name(), "delete");
        assert_eq!(Operation::retain(alice, 1).kind_name(), "retain");
    }

    #[test]
    fn test_collaborator_id_ordering() {
        // The tie-break depends on plain string comparison
        assert!(CollaboratorId::new("alice") < CollaboratorId::new("bob"));
        assert!(CollaboratorId::new("bob") > CollaboratorId::new("alice"));
        assert_eq!(CollaboratorId::new("alice"), CollaboratorId::new("alice"));
    }

    #[test]
    fn test_collaborator_id_display_and_from() {
        let id: CollaboratorId = "carol".into();
        assert_eq!(id.to_string(), "carol");
        assert_eq!(id.as_str(), "carol");
        assert_eq!(CollaboratorId::from("carol".to_string()), id);
    }

    #[test]
    fn test_collaborator_id_random_is_unique() {
        let a = CollaboratorId::random();
        let b = CollaboratorId::random();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_serialize_deserialize_round_trip() {
        let ops = vec![
            Operation::insert(5, "hello", CollaboratorId::new("alice"), 3),
            Operation::delete(0, 2, CollaboratorId::new("bob"), 9),
            Operation::retain(CollaboratorId::new("carol"), 1),
        ];

        for op in ops {
            let json = serde_json::to_string(&op).unwrap();
            let back: Operation = serde_json::from_str(&json).unwrap();
            assert_eq!(back, op);
        }
    }

    #[test]
    fn test_wire_shape_is_flat_and_tagged() {
        let op = Operation::insert(5, "hi", CollaboratorId::new("alice"), 1);
        let value = serde_json::to_value(&op).unwrap();

        assert_eq!(value["type"], "insert");
        assert_eq!(value["content"], "hi");
        assert_eq!(value["position"], 5);
        assert_eq!(value["origin"], "alice");
        assert_eq!(value["version"], 1);
        assert!(value["timestampMs"].as_u64().is_some());

        let op = Operation::delete(1, 4, CollaboratorId::new("bob"), 2);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "delete");
        assert_eq!(value["length"], 4);
    }
}
