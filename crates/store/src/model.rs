use std::sync::{Arc, RwLock};

use objectstore_core::{Clock, EntityId, Record};
use objectstore_dispatcher::{Dispatcher, Reducer, ReducerError};
use objectstore_events::{Broadcaster, Event, EventCodec, Listener};
use objectstore_kv::Kv;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::schema::{Schema, SchemaReflector};
use crate::transaction::{Txn, TxnError};

/// Broadcast to a [`Model`]'s listeners once a create/save/delete has been
/// applied to the view. `Deleted` carries only the id, since the record
/// itself no longer exists in the view to decode.
#[derive(Debug, Clone)]
pub enum ModelEvent<T> {
    Changed(T),
    Deleted(EntityId),
}

pub(crate) struct ModelInner<T> {
    pub(crate) schema: Schema,
    pub(crate) key_prefix: String,
    pub(crate) view: Arc<dyn Kv>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) lock: Arc<RwLock<()>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) codec: Arc<dyn EventCodec>,
    pub(crate) reflector: Box<dyn SchemaReflector<T>>,
    pub(crate) broadcaster: Broadcaster<ModelEvent<T>>,
}

/// A registered record type: its key prefix in the view (`/model/<name>`),
/// the schema it was registered with, and the shared collaborators (view
/// kv, dispatcher, store-wide lock) it needs to open transactions.
///
/// Cheap to clone — every clone is a handle onto the same registration, the
/// same broadcaster, and the same set of listeners.
pub struct Model<T> {
    pub(crate) inner: Arc<ModelInner<T>>,
}

impl<T> Clone for Model<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Model<T>
where
    T: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key_prefix: String,
        view: Arc<dyn Kv>,
        dispatcher: Arc<Dispatcher>,
        lock: Arc<RwLock<()>>,
        clock: Arc<dyn Clock>,
        codec: Arc<dyn EventCodec>,
        reflector: Box<dyn SchemaReflector<T>>,
    ) -> Self {
        let schema = reflector.reflect();
        Self {
            inner: Arc::new(ModelInner {
                schema,
                key_prefix,
                view,
                dispatcher,
                lock,
                clock,
                codec,
                reflector,
                broadcaster: Broadcaster::new(0),
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub(crate) fn key(&self, id: &EntityId) -> String {
        format!("{}/{id}", self.inner.key_prefix)
    }

    /// Run `f` inside a read-only transaction. Holds the store's read lock
    /// for the duration of the call, so writers block until it returns.
    pub fn read_txn<R>(
        &self,
        f: impl FnOnce(&mut Txn<T>) -> Result<R, TxnError>,
    ) -> Result<R, TxnError> {
        let _guard = self.inner.lock.read().expect("store lock poisoned");
        let mut txn = Txn::new(self.clone(), true);
        f(&mut txn)
    }

    /// Run `f` inside a read-write transaction. If `f` returns `Ok`, the
    /// transaction is committed; if it returns `Err`, or panics, the
    /// transaction is discarded and no event is ever produced.
    pub fn write_txn<R>(
        &self,
        f: impl FnOnce(&mut Txn<T>) -> Result<R, TxnError>,
    ) -> Result<R, TxnError> {
        let _guard = self.inner.lock.write().expect("store lock poisoned");
        let mut txn = Txn::new(self.clone(), false);
        let result = f(&mut txn)?;
        txn.commit()?;
        Ok(result)
    }

    pub fn find_by_id(&self, id: &EntityId) -> Result<T, TxnError> {
        self.read_txn(|txn| txn.find_by_id(id))
    }

    pub fn has(&self, id: &EntityId) -> Result<bool, TxnError> {
        self.read_txn(|txn| txn.has(id))
    }

    pub fn find(&self, query: &objectstore_query::Query) -> Result<Vec<T>, TxnError> {
        self.read_txn(|txn| txn.find(query))
    }

    pub fn create(&self, record: &mut T) -> Result<(), TxnError> {
        self.write_txn(|txn| txn.create(record))
    }

    pub fn save(&self, record: &T) -> Result<(), TxnError> {
        self.write_txn(|txn| txn.save(record))
    }

    pub fn delete(&self, id: &EntityId) -> Result<(), TxnError> {
        self.write_txn(|txn| txn.delete(id))
    }

    /// Subscribe to every change this model's reducer applies to the view,
    /// from this point on. Does not replay history.
    pub fn listen(&self) -> Listener<ModelEvent<T>> {
        self.inner.broadcaster.subscribe()
    }
}

impl<T> Reducer for Model<T>
where
    T: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    #[instrument(skip(self, event), fields(model = %self.inner.schema.reference))]
    fn reduce(&self, event: &Event) -> Result<(), ReducerError> {
        if event.entity_type() != T::entity_type() {
            return Ok(());
        }

        self.inner
            .codec
            .reduce(event, self.inner.view.as_ref(), &self.inner.key_prefix)
            .map_err(|e| Box::new(e) as ReducerError)?;

        let key = self.key(event.entity_id());
        let notification = match self.inner.view.get(&key).map_err(|e| Box::new(e) as ReducerError)? {
            Some(bytes) => {
                let record: T =
                    serde_json::from_slice(&bytes).map_err(|e| Box::new(e) as ReducerError)?;
                ModelEvent::Changed(record)
            }
            None => ModelEvent::Deleted(event.entity_id().clone()),
        };

        // A closed broadcaster (no listeners ever subscribed, or all have
        // unsubscribed) is not an error: nobody is there to miss the event.
        let _ = self.inner.broadcaster.send(notification);
        Ok(())
    }
}
