//! Namespaced JSON storage over a [`Backend`]

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::NAMESPACE_SEPARATOR;
use crate::backend::{Backend, MemoryBackend};
use crate::error::StorageResult;

/// Save/load/remove/clear contract consumed by stateful components
///
/// `load` never fails: an absent key, an unreadable backend, or a value
/// that does not parse all yield `default`.
pub trait KeyValueStore: Send + Sync {
    /// Persist a JSON value under a key
    fn save(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Load the value under a key, or `default`
    fn load(&self, key: &str, default: Value) -> Value;

    /// Remove a key (missing keys are not an error)
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove every key in this store's namespace, leaving others untouched
    fn clear(&self) -> StorageResult<()>;
}

/// Typed helpers on top of [`KeyValueStore`]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Serialize and save a value
    fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value)?;
        self.save(key, &value)
    }

    /// Load and deserialize a value, falling back to `default`
    ///
    /// A stored `null` is treated the same as an absent key.
    fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.load(key, Value::Null) {
            Value::Null => default,
            value => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(%key, error = %e, "Stored value has unexpected shape, using default");
                default
            }),
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// A [`KeyValueStore`] that prefixes every key with `"{namespace}:"`
#[derive(Clone)]
pub struct Storage {
    namespace: String,
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("namespace", &self.namespace).finish()
    }
}

impl Storage {
    /// Create a storage over an owned backend
    pub fn new(namespace: impl Into<String>, backend: impl Backend + 'static) -> Self {
        Self::with_backend(namespace, Arc::new(backend))
    }

    /// Create a storage over a shared backend
    pub fn with_backend(namespace: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        let namespace = namespace.into();
        debug!(%namespace, "Storage::with_backend: called");
        Self { namespace, backend }
    }

    /// Create a storage over a fresh in-memory backend
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(namespace, MemoryBackend::new())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Keys in this namespace, without the prefix
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let prefix = self.prefix();
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    fn prefix(&self) -> String {
        format!("{}{}", self.namespace, NAMESPACE_SEPARATOR)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix(), key)
    }
}

impl KeyValueStore for Storage {
    fn save(&self, key: &str, value: &Value) -> StorageResult<()> {
        let full_key = self.full_key(key);
        debug!(key = %full_key, "Storage::save: called");
        let raw = serde_json::to_string(value)?;
        self.backend.set(&full_key, raw)
    }

    fn load(&self, key: &str, default: Value) -> Value {
        let full_key = self.full_key(key);
        debug!(key = %full_key, "Storage::load: called");
        match self.backend.get(&full_key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %full_key, error = %e, "Failed to parse stored value, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Failed to read stored value, using default");
                default
            }
        }
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        debug!(key = %full_key, "Storage::remove: called");
        self.backend.delete(&full_key)
    }

    fn clear(&self) -> StorageResult<()> {
        let prefix = self.prefix();
        let keys: Vec<String> = self
            .backend
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect();
        debug!(namespace = %self.namespace, count = keys.len(), "Storage::clear: called");
        self.backend.delete_many(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileBackend;
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u64,
        text: String,
        done: bool,
    }

    #[test]
    fn test_load_missing_returns_default() {
        let storage = Storage::in_memory("app");
        assert_eq!(storage.load("nope", json!(42)), json!(42));
        assert_eq!(storage.load_or("nope", 7u64), 7);
    }

    #[test]
    fn test_typed_round_trip() {
        let storage = Storage::in_memory("app");
        let entries = vec![
            Entry {
                id: 1,
                text: "first".to_string(),
                done: false,
            },
            Entry {
                id: 2,
                text: "second".to_string(),
                done: true,
            },
        ];
        storage.save_json("entries", &entries).unwrap();

        let loaded: Vec<Entry> = storage.load_or("entries", Vec::new());
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_corrupt_value_returns_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("app:count", "{{broken".to_string()).unwrap();
        let storage = Storage::with_backend("app", backend);

        assert_eq!(storage.load("count", json!(0)), json!(0));
        assert_eq!(storage.load_or("count", 5u64), 5);
    }

    #[test]
    fn test_load_wrong_shape_returns_default() {
        let storage = Storage::in_memory("app");
        storage.save("count", &json!("not a number")).unwrap();
        assert_eq!(storage.load_or("count", 3u64), 3);
    }

    #[test]
    fn test_clear_only_touches_own_namespace() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let mine = Storage::with_backend("mine", backend.clone());
        let theirs = Storage::with_backend("theirs", backend.clone());
        backend.set("unrelated", "1".to_string()).unwrap();

        mine.save("a", &json!(1)).unwrap();
        mine.save("b", &json!(2)).unwrap();
        theirs.save("a", &json!(3)).unwrap();

        mine.clear().unwrap();

        assert!(mine.keys().unwrap().is_empty());
        assert_eq!(theirs.load("a", Value::Null), json!(3));
        assert_eq!(backend.get("unrelated").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_remove() {
        let storage = Storage::in_memory("app");
        storage.save("a", &json!(true)).unwrap();
        storage.remove("a").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.load("a", json!(false)), json!(false));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new("app", FileBackend::open(temp.path()).unwrap());
        storage.save("flag", &json!({"nested": [1, 2.5, "x", null, false]})).unwrap();

        let reopened = Storage::new("app", FileBackend::open(temp.path()).unwrap());
        assert_eq!(
            reopened.load("flag", Value::Null),
            json!({"nested": [1, 2.5, "x", null, false]})
        );
    }

    proptest! {
        #[test]
        fn prop_strings_and_numbers_round_trip(text in ".*", n in any::<i64>(), b in any::<bool>()) {
            let storage = Storage::in_memory("prop");
            let value = json!({"text": text, "n": n, "b": b});
            storage.save("v", &value).unwrap();
            prop_assert_eq!(storage.load("v", Value::Null), value);
        }
    }
}
