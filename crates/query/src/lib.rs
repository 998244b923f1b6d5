//! An AND/OR query tree over a [`Record`]'s dotted field paths, matched and
//! sorted against already-decoded view records. Never touches the event log
//! or the view KV directly — the store crate owns scanning and decoding.

mod criterion;
mod error;
mod query;

pub use criterion::{where_field, Criterion};
pub use error::QueryError;
pub use query::{find, Query};
