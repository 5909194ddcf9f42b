use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::seq_key;

/// Key-value storage behind every resource.
///
/// Keys are namespaced (`user:7`, `post_likes:3`, `file:post_pics:<name>`).
/// Values are opaque bytes; records are stored as JSON through [`KvStoreExt`].
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

pub trait KvStoreExt {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()>;

    /// Id lists default to empty when the key is missing.
    fn get_ids(&self, key: &str) -> anyhow::Result<Vec<u64>> {
        Ok(self.get_json(key)?.unwrap_or_default())
    }

    /// Allocate the next id for an entity kind. Ids start at 1.
    fn next_id(&self, kind: &str) -> anyhow::Result<u64> {
        let key = seq_key(kind);
        let next = self.get_json::<u64>(&key)?.unwrap_or(0) + 1;
        self.set_json(&key, &next)?;
        Ok(next)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .with_context(|| format!("corrupt value under {}", key)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes)
    }
}

/// Push `id` onto an id list unless present. Returns whether the list changed.
pub fn add_id(store: &dyn KvStore, key: &str, id: u64) -> anyhow::Result<bool> {
    let mut ids = store.get_ids(key)?;
    if ids.contains(&id) {
        return Ok(false);
    }
    ids.push(id);
    store.set_json(key, &ids)?;
    Ok(true)
}

/// Insert `id` at the front of an id list (newest first).
pub fn prepend_id(store: &dyn KvStore, key: &str, id: u64) -> anyhow::Result<()> {
    let mut ids = store.get_ids(key)?;
    ids.retain(|existing| *existing != id);
    ids.insert(0, id);
    store.set_json(key, &ids)
}

/// Remove `id` from an id list. Returns whether it was present.
pub fn remove_id(store: &dyn KvStore, key: &str, id: u64) -> anyhow::Result<bool> {
    let mut ids = store.get_ids(key)?;
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    if ids.len() == before {
        return Ok(false);
    }
    store.set_json(key, &ids)?;
    Ok(true)
}

/// In-process store used for `--ephemeral` runs and tests. Clones share data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Spin's default key-value store, used when running as a component.
#[cfg(target_arch = "wasm32")]
pub struct SpinStore {
    inner: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl SpinStore {
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self {
            inner: spin_sdk::key_value::Store::open_default()?,
        })
    }
}

#[cfg(target_arch = "wasm32")]
impl KvStore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(self.inner.set(key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.inner.delete(key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_and_missing_keys() {
        let store = MemoryStore::new();
        assert_eq!(store.get_json::<String>("nope").unwrap(), None);
        store.set_json("greeting", "hello").unwrap();
        assert_eq!(store.get_json::<String>("greeting").unwrap().as_deref(), Some("hello"));
        store.delete("greeting").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn ids_are_sequential_per_kind() {
        let store = MemoryStore::new();
        assert_eq!(store.next_id("post").unwrap(), 1);
        assert_eq!(store.next_id("post").unwrap(), 2);
        assert_eq!(store.next_id("user").unwrap(), 1);
    }

    #[test]
    fn id_lists_stay_unique() {
        let store = MemoryStore::new();
        assert!(add_id(&store, "likes", 4).unwrap());
        assert!(!add_id(&store, "likes", 4).unwrap());
        prepend_id(&store, "likes", 9).unwrap();
        assert_eq!(store.get_ids("likes").unwrap(), vec![9, 4]);
        assert!(remove_id(&store, "likes", 4).unwrap());
        assert!(!remove_id(&store, "likes", 4).unwrap());
        assert_eq!(store.get_ids("likes").unwrap(), vec![9]);
    }

    #[test]
    fn corrupt_values_surface_as_errors() {
        let store = MemoryStore::new();
        store.set("user:1", b"not json").unwrap();
        let err = store.get_json::<u64>("user:1").unwrap_err();
        assert!(format!("{:#}", err).contains("user:1"));
    }

    #[test]
    fn clones_share_entries() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", b"v").unwrap();
        assert_eq!(b.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(b.keys_with_prefix("k"), vec!["k".to_string()]);
    }
}
