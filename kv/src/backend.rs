//! Raw string backends
//!
//! A backend is a flat string-to-string map. Namespacing and JSON encoding
//! live one layer up in [`crate::Storage`].

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// File name of the on-disk store inside the backend directory
pub const STORE_FILE: &str = "store.json";

const LOCK_FILE: &str = ".store.lock";

/// Flat key/value map that a [`crate::Storage`] sits on top of
pub trait Backend: Send + Sync {
    /// Get the raw value for a key
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set the raw value for a key
    fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete a key (missing keys are not an error)
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// All keys currently stored
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Delete several keys in one operation
    fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// In-memory backend, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all namespaces
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Lock("memory backend lock poisoned".to_string())
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.entries.write().map_err(poisoned)?.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().map_err(poisoned)?.keys().cloned().collect())
    }

    fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

/// File backend: a single JSON object in `{dir}/store.json`
///
/// Writes are read-modify-write under an exclusive lock on a sibling lock
/// file and land via atomic rename, so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileBackend {
    /// Open or create a file backend in the given directory
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "FileBackend::open: called");
        Ok(Self {
            path: dir.join(STORE_FILE),
            lock_path: dir.join(LOCK_FILE),
            dir,
        })
    }

    /// Path of the backing JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read the map for a write; a corrupt file is moved aside and replaced
    fn read_map_for_write(&self) -> StorageResult<BTreeMap<String, String>> {
        match self.read_map() {
            Err(StorageError::Corrupt { path, reason }) => {
                let backup = self.path.with_extension("json.corrupt");
                warn!(%path, %reason, backup = %backup.display(), "Store file corrupt, starting fresh");
                fs::rename(&self.path, &backup)?;
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn locked<T>(&self, f: impl FnOnce() -> StorageResult<T>) -> StorageResult<T> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&lock_file).map_err(|e| StorageError::Lock(e.to_string()))?;
        let result = f();
        if let Err(e) = FileExt::unlock(&lock_file) {
            debug!(error = %e, "FileBackend: failed to release lock");
        }
        result
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> StorageResult<()> {
        self.locked(|| {
            let mut map = self.read_map_for_write()?;
            if f(&mut map) {
                self.write_map(&map)?;
            }
            Ok(())
        })
    }
}

impl Backend for FileBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> StorageResult<()> {
        debug!(%key, "FileBackend::set: called");
        self.modify(|map| {
            map.insert(key.to_string(), value);
            true
        })
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        debug!(%key, "FileBackend::delete: called");
        self.modify(|map| map.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }

    fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        debug!(count = keys.len(), "FileBackend::delete_many: called");
        self.modify(|map| {
            let before = map.len();
            for key in keys {
                map.remove(key);
            }
            map.len() != before
        })
    }
}
