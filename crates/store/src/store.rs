use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use objectstore_core::{Clock, Record};
use objectstore_dispatcher::{DispatchError, Dispatcher};
use objectstore_events::{Event, EventCodec, JsonPatchCodec};
use objectstore_kv::Kv;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::Model;
use crate::schema::{DefaultSchemaReflector, SchemaReflector};

/// The top-level handle: owns the view kv, the dispatcher (and through it
/// the event log), a global readers-writer lock shared by every registered
/// [`Model`], and the set of types already registered.
///
/// The lock is the only thing `Store` adds beyond what `Dispatcher` already
/// provides: `Dispatcher::dispatch` serializes reducer fan-out under its own
/// mutex, but a write transaction needs to hold exclusivity across reading
/// the view, staging actions, *and* dispatching — hence a second, coarser
/// lock scoped to the whole transaction rather than just the dispatch call.
pub struct Store {
    view: Arc<dyn Kv>,
    dispatcher: Arc<Dispatcher>,
    lock: Arc<RwLock<()>>,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn EventCodec>,
    registered: Mutex<HashSet<TypeId>>,
}

impl Store {
    pub fn new(view: Arc<dyn Kv>, log: Arc<dyn Kv>, clock: Arc<dyn Clock>) -> Self {
        Self {
            view,
            dispatcher: Arc::new(Dispatcher::new(log)),
            lock: Arc::new(RwLock::new(())),
            clock,
            codec: Arc::new(JsonPatchCodec),
            registered: Mutex::new(HashSet::new()),
        }
    }

    /// Register `T` under `name` (its view key prefix becomes
    /// `/model/<name>`), using the shipped [`DefaultSchemaReflector`].
    /// Registering the same Rust type twice is an error; registering two
    /// different types under the same `name` is allowed but not
    /// recommended, since their view entries would collide.
    pub fn register<T>(&self, name: impl Into<String>) -> Result<Model<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.register_with_reflector(name, Box::new(DefaultSchemaReflector::default()))
    }

    /// Register `T` with a caller-supplied [`SchemaReflector`], for record
    /// types that need validation beyond "round-trips through serde".
    pub fn register_with_reflector<T>(
        &self,
        name: impl Into<String>,
        reflector: Box<dyn SchemaReflector<T>>,
    ) -> Result<Model<T>, StoreError>
    where
        T: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        {
            let mut registered = self.registered.lock().expect("store registry mutex poisoned");
            if !registered.insert(TypeId::of::<T>()) {
                return Err(StoreError::AlreadyRegistered);
            }
        }

        let model = Model::new(
            format!("/model/{}", name.into()),
            Arc::clone(&self.view),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.lock),
            Arc::clone(&self.clock),
            Arc::clone(&self.codec),
            reflector,
        );
        self.dispatcher.register(Arc::new(model.clone()));
        Ok(model)
    }

    /// Persist and dispatch an event that didn't come from a registered
    /// model's transaction — e.g. one produced by a remote peer. Every
    /// model still filters it by `entity_type` as usual; a type with no
    /// registered model simply has no reducer to receive it, though it
    /// remains in the log and is picked up by a later `replay`.
    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let _guard = self.lock.write().expect("store lock poisoned");
        self.dispatcher.dispatch(event)
    }

    /// Re-run every logged event through the currently registered models,
    /// in log order. Intended to repair view state after a reducer warning.
    pub fn replay(&self) -> Result<(), DispatchError> {
        let _guard = self.lock.write().expect("store lock poisoned");
        self.dispatcher.replay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectstore_core::testing::FakeClock;
    use objectstore_core::{EntityId, FieldAccessError, TypedValue};
    use objectstore_kv::MemoryKv;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Widget {
        id: EntityId,
        label: String,
    }

    impl Record for Widget {
        fn entity_type() -> &'static str {
            "test.widget"
        }
        fn id(&self) -> &EntityId {
            &self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = id;
        }
        fn get_field(&self, path: &str) -> Result<TypedValue, FieldAccessError> {
            match path {
                "label" => Ok(TypedValue::Str(self.label.clone())),
                other => Err(FieldAccessError::InvalidField(other.to_string())),
            }
        }
    }

    fn new_store() -> Store {
        Store::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
            Arc::new(FakeClock::new(0)),
        )
    }

    #[test]
    fn registering_the_same_type_twice_fails() {
        let store = new_store();
        store.register::<Widget>("widget").unwrap();
        let err = store.register::<Widget>("widget-again").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyRegistered));
    }

    #[test]
    fn dispatch_reaches_registered_model() {
        let store = new_store();
        let model = store.register::<Widget>("widget").unwrap();
        let mut w = Widget { id: EntityId::unassigned(), label: "x".into() };
        model.create(&mut w).unwrap();
        assert!(model.has(&w.id).unwrap());
    }

    #[test]
    fn replay_is_idempotent_on_an_up_to_date_view() {
        let store = new_store();
        let model = store.register::<Widget>("widget").unwrap();
        let mut w = Widget { id: EntityId::unassigned(), label: "x".into() };
        model.create(&mut w).unwrap();

        store.replay().unwrap();
        assert!(model.has(&w.id).unwrap());
    }
}
