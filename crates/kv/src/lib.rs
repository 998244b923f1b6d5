//! The view key/value store: a small trait boundary plus one default,
//! in-memory implementation.
//!
//! Both the materialized model view (one instance per store) and the event
//! log (one instance per dispatcher) are consumers of this same [`Kv`]
//! trait; they happen to use separate instances because their key
//! namespaces (`/model/<name>/<id>` vs `<time>/<entity>/<type>`) never
//! overlap, not because the trait requires it.

mod memory;

use thiserror::Error;

pub use memory::MemoryKv;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv lock poisoned")]
    Poisoned,
}

/// A single `(key, value)` entry returned by [`Kv::query_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Vec<u8>,
}

/// Prefix-addressable byte-string key/value store.
///
/// Implementations must return [`Kv::query_prefix`] results in lexicographic
/// key order — the event log relies on this to replay events chronologically
/// (the big-endian timestamp prefix sorts the same way numerically and
/// lexicographically).
pub trait Kv: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;
    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), KvError>;
    fn has(&self, key: &str) -> Result<bool, KvError>;
    fn delete(&self, key: &str) -> Result<(), KvError>;
    /// All entries whose key starts with `prefix`, in lexicographic order.
    fn query_prefix(&self, prefix: &str) -> Result<Vec<Entry>, KvError>;
}

impl<K> Kv for std::sync::Arc<K>
where
    K: Kv + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), KvError> {
        (**self).put(key, value)
    }

    fn has(&self, key: &str) -> Result<bool, KvError> {
        (**self).has(key)
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        (**self).delete(key)
    }

    fn query_prefix(&self, prefix: &str) -> Result<Vec<Entry>, KvError> {
        (**self).query_prefix(prefix)
    }
}
