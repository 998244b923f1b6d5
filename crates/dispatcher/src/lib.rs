//! Persists events to an append-only log, then fans each one out to every
//! registered reducer under a single mutex — so reducers always observe
//! events in exactly the order they were persisted.

mod dispatcher;
mod error;
mod reducer;

pub use dispatcher::{Dispatcher, Token};
pub use error::DispatchError;
pub use reducer::{Reducer, ReducerError};
