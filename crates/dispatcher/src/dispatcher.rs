use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use objectstore_events::Event;
use objectstore_kv::{Entry, Kv, KvError};
use tracing::{instrument, warn};

use crate::error::DispatchError;
use crate::reducer::Reducer;

/// Opaque handle returned by [`Dispatcher::register`], used to deregister a
/// reducer later. Monotonically increasing; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(u64);

/// Append-only event log plus reducer fan-out.
///
/// Every `register`/`deregister`/`dispatch` call takes the same internal
/// mutex, so: reducers never run concurrently with a structural change to
/// the reducer set, and every reducer sees events in exactly the order they
/// were persisted to the log.
pub struct Dispatcher {
    log: Arc<dyn Kv>,
    reducers: Mutex<BTreeMap<Token, Arc<dyn Reducer>>>,
    next_token: AtomicU64,
}

impl Dispatcher {
    pub fn new(log: Arc<dyn Kv>) -> Self {
        Self {
            log,
            reducers: Mutex::new(BTreeMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// Register a reducer to be invoked with every future dispatched event.
    pub fn register(&self, reducer: Arc<dyn Reducer>) -> Token {
        let token = Token(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.reducers
            .lock()
            .expect("dispatcher mutex poisoned")
            .insert(token, reducer);
        token
    }

    /// Remove a reducer. A missing token is a no-op.
    pub fn deregister(&self, token: Token) {
        self.reducers
            .lock()
            .expect("dispatcher mutex poisoned")
            .remove(&token);
    }

    /// Persist `event`, then invoke every registered reducer in turn.
    ///
    /// A persistence failure returns [`DispatchError::Critical`] immediately
    /// and no reducer runs. Reducer failures are collected and returned as
    /// [`DispatchError::Warning`] only after the event is durable.
    #[instrument(skip(self, event), fields(entity_id = %event.entity_id(), entity_type = %event.entity_type()))]
    pub fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let reducers = self.reducers.lock().expect("dispatcher mutex poisoned");

        self.log.put(&event.key(), event.body().to_vec())?;

        let mut failures = Vec::new();
        for reducer in reducers.values() {
            if let Err(err) = reducer.reduce(&event) {
                warn!(error = %err, "reducer failed on dispatched event");
                failures.push(err);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Warning(failures))
        }
    }

    /// All logged entries, in the order they were persisted.
    pub fn query_all(&self) -> Result<Vec<Entry>, KvError> {
        let _reducers = self.reducers.lock().expect("dispatcher mutex poisoned");
        self.log.query_prefix("")
    }

    /// Re-run every logged event through the current reducer set, in log
    /// order. Used to repair view state after a reducer warning, since the
    /// event body plus codec are sufficient to reproduce it deterministically.
    pub fn replay(&self) -> Result<(), DispatchError> {
        let reducers = self.reducers.lock().expect("dispatcher mutex poisoned");
        let entries = self.log.query_prefix("")?;

        let mut failures = Vec::new();
        for entry in entries {
            let Some(event) = Event::from_log_entry(&entry.key, entry.value) else {
                continue;
            };
            for reducer in reducers.values() {
                if let Err(err) = reducer.reduce(&event) {
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Warning(failures))
        }
    }
}
