//! Ties the event log, the view, and the query engine together: register a
//! [`Record`](objectstore_core::Record) type, open scoped transactions
//! against it, and listen for the changes its reducer applies.

mod error;
mod model;
mod schema;
mod store;
mod transaction;

pub use error::StoreError;
pub use model::{Model, ModelEvent};
pub use schema::{DefaultSchemaReflector, Schema, SchemaError, SchemaReflector};
pub use store::Store;
pub use transaction::{Txn, TxnError};
