use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::{Entry, Kv, KvError};

/// In-memory [`Kv`] backed by a `BTreeMap`, chosen over a hash map
/// specifically so [`Kv::query_prefix`] returns keys in sorted order without
/// an extra sort pass.
///
/// Intended for tests/dev and as the crate's shipped default; not persisted
/// across process restarts.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Kv for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let entries = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<(), KvError> {
        let mut entries = self.entries.write().map_err(|_| KvError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, KvError> {
        let entries = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(entries.contains_key(key))
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut entries = self.entries.write().map_err(|_| KvError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn query_prefix(&self, prefix: &str) -> Result<Vec<Entry>, KvError> {
        let entries = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| Entry {
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let kv = MemoryKv::new();
        kv.put("a", b"1".to_vec()).unwrap();
        assert_eq!(kv.get("a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("missing").unwrap(), None);
        assert!(!kv.has("missing").unwrap());
    }

    #[test]
    fn delete_is_tolerant_of_absent_key() {
        let kv = MemoryKv::new();
        assert!(kv.delete("nope").is_ok());
    }

    #[test]
    fn query_prefix_is_sorted_and_scoped() {
        let kv = MemoryKv::new();
        kv.put("/model/person/b", b"B".to_vec()).unwrap();
        kv.put("/model/person/a", b"A".to_vec()).unwrap();
        kv.put("/model/other/z", b"Z".to_vec()).unwrap();

        let entries = kv.query_prefix("/model/person/").unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["/model/person/a", "/model/person/b"]);
    }
}
