use objectstore_core::EntityId;
use serde_json::Value;

/// What kind of mutation an [`Action`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Save,
    Delete,
}

/// An intent accumulated inside a transaction.
///
/// Actions exist only in memory, for the lifetime of the transaction that
/// produced them — they are never persisted. A [`crate::EventCodec`] turns a
/// batch of actions into the [`crate::Event`]s that actually get written to
/// the log.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub entity_id: EntityId,
    pub entity_type: &'static str,
    /// JSON image of the record before the action, absent for `Create` and
    /// `Delete`.
    pub previous: Option<Value>,
    /// JSON image of the record after the action, absent for `Delete`.
    pub current: Option<Value>,
}

impl Action {
    pub fn create(entity_id: EntityId, entity_type: &'static str, current: Value) -> Self {
        Self {
            kind: ActionKind::Create,
            entity_id,
            entity_type,
            previous: None,
            current: Some(current),
        }
    }

    pub fn save(
        entity_id: EntityId,
        entity_type: &'static str,
        previous: Value,
        current: Value,
    ) -> Self {
        Self {
            kind: ActionKind::Save,
            entity_id,
            entity_type,
            previous: Some(previous),
            current: Some(current),
        }
    }

    pub fn delete(entity_id: EntityId, entity_type: &'static str) -> Self {
        Self {
            kind: ActionKind::Delete,
            entity_id,
            entity_type,
            previous: None,
            current: None,
        }
    }
}
