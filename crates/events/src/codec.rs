use objectstore_core::Clock;
use objectstore_kv::{Kv, KvError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::action::{Action, ActionKind};
use crate::event::Event;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("create would collide with an existing instance")]
    CantCreateExistingInstance,

    #[error("save on a non-existent instance")]
    SaveNonExistent,

    #[error("event body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Kv(#[from] KvError),
}

/// Pure transformation between in-transaction [`Action`]s and persisted
/// [`Event`]s, and back into view mutations. Isolating this boundary means
/// swapping storage representations (full snapshots, CRDT deltas, ...) never
/// touches the dispatcher, model, or store.
pub trait EventCodec: Send + Sync {
    /// Turn a batch of accumulated actions into events ready to dispatch.
    fn create(&self, actions: &[Action], clock: &dyn Clock) -> Result<Vec<Event>, CodecError>;

    /// Apply one persisted event to the view, under `base_key` (the owning
    /// model's key prefix).
    fn reduce(&self, event: &Event, kv: &dyn Kv, base_key: &str) -> Result<(), CodecError>;
}

/// Wire body of a JSON-patch codec event: `{"type", "entityId", "jsonPatch"}`.
#[derive(Debug, Serialize, Deserialize)]
struct Operation {
    #[serde(rename = "type")]
    kind: OperationKind,
    #[serde(rename = "entityId")]
    entity_id: String,
    #[serde(rename = "jsonPatch")]
    json_patch: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum OperationKind {
    Create,
    Save,
    Delete,
}

impl From<ActionKind> for OperationKind {
    fn from(k: ActionKind) -> Self {
        match k {
            ActionKind::Create => OperationKind::Create,
            ActionKind::Save => OperationKind::Save,
            ActionKind::Delete => OperationKind::Delete,
        }
    }
}

/// The shipped default [`EventCodec`]: bodies carry RFC 7396 JSON merge
/// patches rather than full snapshots, so `save` events stay proportional to
/// the size of the change instead of the size of the record.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPatchCodec;

impl EventCodec for JsonPatchCodec {
    fn create(&self, actions: &[Action], clock: &dyn Clock) -> Result<Vec<Event>, CodecError> {
        let mut events = Vec::with_capacity(actions.len());
        for action in actions {
            let json_patch = match action.kind {
                ActionKind::Create => action
                    .current
                    .clone()
                    .expect("create action always carries `current`"),
                ActionKind::Save => merge_patch_diff(
                    action
                        .previous
                        .as_ref()
                        .expect("save action always carries `previous`"),
                    action
                        .current
                        .as_ref()
                        .expect("save action always carries `current`"),
                ),
                ActionKind::Delete => Value::Object(serde_json::Map::new()),
            };

            let body = Operation {
                kind: action.kind.into(),
                entity_id: action.entity_id.to_string(),
                json_patch,
            };
            let body = serde_json::to_vec(&body)?;

            events.push(Event::new(
                clock.now_nanos(),
                action.entity_id.clone(),
                action.entity_type,
                body,
            ));
        }
        Ok(events)
    }

    fn reduce(&self, event: &Event, kv: &dyn Kv, base_key: &str) -> Result<(), CodecError> {
        let op: Operation = serde_json::from_slice(event.body())?;
        let key = format!("{base_key}/{}", op.entity_id);

        match op.kind {
            OperationKind::Create => {
                if kv.has(&key)? {
                    return Err(CodecError::CantCreateExistingInstance);
                }
                kv.put(&key, serde_json::to_vec(&op.json_patch)?)?;
            }
            OperationKind::Save => {
                let Some(existing) = kv.get(&key)? else {
                    return Err(CodecError::SaveNonExistent);
                };
                let mut doc: Value = serde_json::from_slice(&existing)?;
                json_patch::merge(&mut doc, &op.json_patch);
                kv.put(&key, serde_json::to_vec(&doc)?)?;
            }
            OperationKind::Delete => {
                // Tolerate an already-absent key: replaying the log twice
                // must still converge to the same view state.
                kv.delete(&key)?;
            }
        }
        Ok(())
    }
}

/// Compute the RFC 7396 merge patch that turns `previous` into `current`.
///
/// `json-patch` only applies merge patches ([`json_patch::merge`]); this
/// mirrors the generation algorithm from RFC 7396 appendix A.1, which the
/// original implements via `evanphx/json-patch`'s `CreateMergePatch`.
fn merge_patch_diff(previous: &Value, current: &Value) -> Value {
    match (previous, current) {
        (Value::Object(prev), Value::Object(curr)) => {
            let mut diff = serde_json::Map::new();
            for (key, curr_v) in curr {
                match prev.get(key) {
                    Some(prev_v) if prev_v == curr_v => {}
                    Some(prev_v) => {
                        let sub = merge_patch_diff(prev_v, curr_v);
                        if !is_empty_object(&sub) {
                            diff.insert(key.clone(), sub);
                        }
                    }
                    None => {
                        diff.insert(key.clone(), curr_v.clone());
                    }
                }
            }
            for key in prev.keys() {
                if !curr.contains_key(key) {
                    diff.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(diff)
        }
        _ if previous == current => Value::Object(serde_json::Map::new()),
        _ => current.clone(),
    }
}

fn is_empty_object(v: &Value) -> bool {
    matches!(v, Value::Object(m) if m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectstore_core::testing::FakeClock;
    use objectstore_core::EntityId;
    use objectstore_kv::MemoryKv;
    use serde_json::json;

    #[test]
    fn diff_only_contains_changed_fields() {
        let prev = json!({"name": "Alice", "age": 30});
        let curr = json!({"name": "Bob", "age": 30});
        assert_eq!(merge_patch_diff(&prev, &curr), json!({"name": "Bob"}));
    }

    #[test]
    fn diff_marks_removed_fields_null() {
        let prev = json!({"name": "Alice", "nickname": "Al"});
        let curr = json!({"name": "Alice"});
        assert_eq!(merge_patch_diff(&prev, &curr), json!({"nickname": null}));
    }

    #[test]
    fn create_then_reduce_roundtrips() {
        let codec = JsonPatchCodec;
        let clock = FakeClock::new(0);
        let id = EntityId::new();
        let record = json!({"id": id.to_string(), "name": "Alice", "age": 30});
        let actions = vec![Action::create(id.clone(), "test.person", record.clone())];
        let events = codec.create(&actions, &clock).unwrap();

        let kv = MemoryKv::new();
        codec.reduce(&events[0], &kv, "/model/person").unwrap();

        let stored = kv.get(&format!("/model/person/{id}")).unwrap().unwrap();
        let stored: Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn create_twice_fails() {
        let codec = JsonPatchCodec;
        let clock = FakeClock::new(0);
        let id = EntityId::new();
        let record = json!({"id": id.to_string()});
        let actions = vec![Action::create(id.clone(), "test.person", record)];
        let events = codec.create(&actions, &clock).unwrap();

        let kv = MemoryKv::new();
        codec.reduce(&events[0], &kv, "/model/person").unwrap();
        let err = codec.reduce(&events[0], &kv, "/model/person").unwrap_err();
        assert!(matches!(err, CodecError::CantCreateExistingInstance));
    }

    #[test]
    fn save_reduces_as_a_patch() {
        let codec = JsonPatchCodec;
        let clock = FakeClock::new(0);
        let id = EntityId::new();
        let original = json!({"id": id.to_string(), "name": "Alice", "age": 30});
        let updated = json!({"id": id.to_string(), "name": "Bob", "age": 30});

        let kv = MemoryKv::new();
        let create = codec
            .create(&[Action::create(id.clone(), "test.person", original.clone())], &clock)
            .unwrap();
        codec.reduce(&create[0], &kv, "/model/person").unwrap();

        let save = codec
            .create(
                &[Action::save(id.clone(), "test.person", original, updated.clone())],
                &clock,
            )
            .unwrap();
        codec.reduce(&save[0], &kv, "/model/person").unwrap();

        let stored = kv.get(&format!("/model/person/{id}")).unwrap().unwrap();
        let stored: Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn save_on_absent_fails() {
        let codec = JsonPatchCodec;
        let clock = FakeClock::new(0);
        let id = EntityId::new();
        let save = codec
            .create(
                &[Action::save(id.clone(), "test.person", json!({}), json!({"a": 1}))],
                &clock,
            )
            .unwrap();

        let kv = MemoryKv::new();
        let err = codec.reduce(&save[0], &kv, "/model/person").unwrap_err();
        assert!(matches!(err, CodecError::SaveNonExistent));
    }

    #[test]
    fn delete_tolerates_absent_key() {
        let codec = JsonPatchCodec;
        let clock = FakeClock::new(0);
        let id = EntityId::new();
        let delete = codec
            .create(&[Action::delete(id.clone(), "test.person")], &clock)
            .unwrap();

        let kv = MemoryKv::new();
        assert!(codec.reduce(&delete[0], &kv, "/model/person").is_ok());
    }
}
