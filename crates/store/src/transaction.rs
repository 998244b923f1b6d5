use objectstore_core::{EntityId, Record};
use objectstore_dispatcher::DispatchError;
use objectstore_events::Action;
use objectstore_query::{Query, QueryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::model::Model;
use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum TxnError {
    #[error("instance not found")]
    NotFound,

    #[error("can't create an already existing instance")]
    CantCreateExisting,

    #[error("can't save a non-existent instance")]
    SaveNonExistent,

    #[error("instance doesn't conform to the registered schema")]
    InvalidSchemaInstance,

    #[error("mutation attempted in a read-only transaction")]
    ReadonlyTxn,

    #[error("transaction already committed or discarded")]
    AlreadyTerminated,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Codec(#[from] objectstore_events::CodecError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Kv(#[from] objectstore_kv::KvError),

    #[error("failed to decode stored record: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Accumulates actions inside a single read or write transaction.
///
/// A write txn never touches the dispatcher until [`Txn::commit`]: every
/// `create`/`save`/`delete` call only stages an [`Action`] and checks the
/// view for conflicts. Dropping the transaction — whether via an explicit
/// [`Txn::discard`], an early return through `?`, or an unwind — leaves no
/// trace; nothing is written until commit succeeds.
pub struct Txn<T> {
    model: Model<T>,
    readonly: bool,
    actions: Vec<Action>,
    terminated: bool,
}

impl<T> Txn<T>
where
    T: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(model: Model<T>, readonly: bool) -> Self {
        Self {
            model,
            readonly,
            actions: Vec::new(),
            terminated: false,
        }
    }

    pub fn find_by_id(&self, id: &EntityId) -> Result<T, TxnError> {
        let key = self.model.key(id);
        let Some(bytes) = self.model.inner.view.get(&key)? else {
            return Err(TxnError::NotFound);
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn has(&self, id: &EntityId) -> Result<bool, TxnError> {
        Ok(self.model.inner.view.has(&self.model.key(id))?)
    }

    pub fn find(&self, query: &Query) -> Result<Vec<T>, TxnError> {
        let prefix = format!("{}/", self.model.inner.key_prefix);
        let entries = self.model.inner.view.query_prefix(&prefix)?;
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            records.push(serde_json::from_slice::<T>(&entry.value)?);
        }
        Ok(objectstore_query::find(records, query)?)
    }

    /// Stage the creation of `record`. Assigns a fresh id if `record`'s id
    /// is unassigned. The created instance is not visible to `find`/
    /// `find_by_id` within this same transaction — only after commit.
    pub fn create(&mut self, record: &mut T) -> Result<(), TxnError> {
        self.create_many(std::slice::from_mut(record))
    }

    pub fn create_many(&mut self, records: &mut [T]) -> Result<(), TxnError> {
        self.require_writable()?;
        for record in records.iter_mut() {
            if record.id().is_unassigned() {
                record.set_id(EntityId::new());
            }
            self.validate(record)?;

            let key = self.model.key(record.id());
            if self.model.inner.view.has(&key)? {
                return Err(TxnError::CantCreateExisting);
            }

            let current = serde_json::to_value(&*record)?;
            self.actions
                .push(Action::create(record.id().clone(), T::entity_type(), current));
        }
        Ok(())
    }

    pub fn save(&mut self, record: &T) -> Result<(), TxnError> {
        self.save_many(std::slice::from_ref(record))
    }

    pub fn save_many(&mut self, records: &[T]) -> Result<(), TxnError> {
        self.require_writable()?;
        for record in records {
            self.validate(record)?;

            let key = self.model.key(record.id());
            let Some(existing) = self.model.inner.view.get(&key)? else {
                return Err(TxnError::SaveNonExistent);
            };
            let previous: serde_json::Value = serde_json::from_slice(&existing)?;
            let current = serde_json::to_value(record)?;
            self.actions.push(Action::save(
                record.id().clone(),
                T::entity_type(),
                previous,
                current,
            ));
        }
        Ok(())
    }

    pub fn delete(&mut self, id: &EntityId) -> Result<(), TxnError> {
        self.delete_many(std::slice::from_ref(id))
    }

    pub fn delete_many(&mut self, ids: &[EntityId]) -> Result<(), TxnError> {
        self.require_writable()?;
        for id in ids {
            let key = self.model.key(id);
            if !self.model.inner.view.has(&key)? {
                return Err(TxnError::NotFound);
            }
            self.actions.push(Action::delete(id.clone(), T::entity_type()));
        }
        Ok(())
    }

    /// Build events from every accumulated action and dispatch them, in
    /// order. A critical dispatch error aborts immediately. A warning
    /// (one or more reducers failed on an otherwise-durable event) doesn't
    /// stop later events in the batch from dispatching, but is still
    /// surfaced to the caller once the whole batch has gone through — the
    /// events are durable regardless, so there's nothing to roll back.
    pub fn commit(&mut self) -> Result<(), TxnError> {
        if self.terminated {
            return Err(TxnError::AlreadyTerminated);
        }
        self.terminated = true;

        if self.actions.is_empty() {
            return Ok(());
        }

        let events = self
            .model
            .inner
            .codec
            .create(&self.actions, self.model.inner.clock.as_ref())?;

        let mut warnings = Vec::new();
        for event in events {
            match self.model.inner.dispatcher.dispatch(event) {
                Ok(()) => {}
                Err(DispatchError::Warning(failures)) => warnings.extend(failures),
                Err(critical @ DispatchError::Critical(_)) => {
                    return Err(TxnError::Dispatch(critical));
                }
            }
        }

        if warnings.is_empty() {
            Ok(())
        } else {
            Err(TxnError::Dispatch(DispatchError::Warning(warnings)))
        }
    }

    /// Abandon every staged action. Idempotent; safe to call after a
    /// `create`/`save`/`delete` has already returned an error.
    pub fn discard(&mut self) {
        self.terminated = true;
        self.actions.clear();
    }

    fn require_writable(&self) -> Result<(), TxnError> {
        if self.readonly {
            return Err(TxnError::ReadonlyTxn);
        }
        Ok(())
    }

    fn validate(&self, record: &T) -> Result<(), TxnError> {
        let valid = self
            .model
            .inner
            .reflector
            .validate(&self.model.inner.schema, record)?;
        if !valid {
            return Err(TxnError::InvalidSchemaInstance);
        }
        Ok(())
    }
}

/// Marks the transaction terminated if it goes out of scope without an
/// explicit `commit`/`discard` — including when the caller's closure
/// returns early or panics. No resources to release beyond the flag itself;
/// the store's read/write guard is a separate, outer value that unlocks on
/// its own drop.
impl<T> Drop for Txn<T> {
    fn drop(&mut self) {
        self.terminated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use objectstore_core::testing::FakeClock;
    use objectstore_core::{FieldAccessError, TypedValue};
    use objectstore_kv::MemoryKv;
    use std::sync::Arc;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Person {
        id: EntityId,
        name: String,
        age: i32,
    }

    impl Record for Person {
        fn entity_type() -> &'static str {
            "test.person"
        }
        fn id(&self) -> &EntityId {
            &self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }
        fn get_field(&self, path: &str) -> Result<TypedValue, FieldAccessError> {
            match path {
                "name" => Ok(TypedValue::Str(self.name.clone())),
                "age" => Ok(TypedValue::I32(self.age)),
                other => Err(FieldAccessError::InvalidField(other.to_string())),
            }
        }
    }

    fn store() -> Store {
        Store::new(Arc::new(MemoryKv::new()), Arc::new(MemoryKv::new()), Arc::new(FakeClock::new(0)))
    }

    #[test]
    fn create_assigns_id_and_is_visible_after_commit() {
        let model = store().register::<Person>("person").unwrap();
        let mut p = Person { id: EntityId::unassigned(), name: "Alice".into(), age: 30 };
        model.create(&mut p).unwrap();
        assert!(!p.id.is_unassigned());
        assert!(model.has(&p.id).unwrap());
    }

    #[test]
    fn create_twice_with_same_id_fails() {
        let model = store().register::<Person>("person").unwrap();
        let mut p = Person { id: EntityId::new(), name: "Alice".into(), age: 30 };
        model.create(&mut p).unwrap();

        model
            .write_txn(|txn| {
                let err = txn.create(&mut p.clone()).unwrap_err();
                assert!(matches!(err, TxnError::CantCreateExisting));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn save_nonexistent_fails() {
        let model = store().register::<Person>("person").unwrap();
        let p = Person { id: EntityId::new(), name: "Ghost".into(), age: 1 };
        let err = model.save(&p).unwrap_err();
        assert!(matches!(err, TxnError::SaveNonExistent));
    }

    #[test]
    fn delete_removes_from_view() {
        let model = store().register::<Person>("person").unwrap();
        let mut p = Person { id: EntityId::unassigned(), name: "Bob".into(), age: 40 };
        model.create(&mut p).unwrap();
        model.delete(&p.id).unwrap();
        assert!(!model.has(&p.id).unwrap());
    }

    #[test]
    fn failed_closure_discards_without_dispatching() {
        let model = store().register::<Person>("person").unwrap();
        let result: Result<(), TxnError> = model.write_txn(|txn| {
            let mut p = Person { id: EntityId::unassigned(), name: "Carol".into(), age: 22 };
            txn.create(&mut p)?;
            Err(TxnError::NotFound)
        });
        assert!(result.is_err());
        // Nothing was committed: the view has no entries under this prefix.
        let all = model.find(&objectstore_query::Query::default()).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn readonly_txn_rejects_mutation() {
        let model = store().register::<Person>("person").unwrap();
        let result = model.read_txn(|txn| {
            let mut p = Person { id: EntityId::unassigned(), name: "Dan".into(), age: 50 };
            txn.create(&mut p)
        });
        assert!(matches!(result, Err(TxnError::ReadonlyTxn)));
    }
}
