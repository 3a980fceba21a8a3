//! KvStore - namespaced JSON key/value storage
//!
//! A small save/load/remove/clear contract in the spirit of browser local
//! storage. Every value round-trips through JSON, and every key lives under
//! a namespace prefix so several stores can share one backend.
//!
//! # Architecture
//!
//! ```text
//! Storage ("tasklist")          KeyValueStore impl, adds "tasklist:" prefix
//!   └── Backend                 raw string map
//!         ├── MemoryBackend     BTreeMap behind a RwLock
//!         └── FileBackend       {dir}/store.json, fs2 lock + atomic rename
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kvstore::{FileBackend, KeyValueStore, Storage};
//!
//! let storage = Storage::new("tasklist", FileBackend::open("~/.local/share/tasklist")?);
//! storage.save_json("next_id", &7u64)?;
//! let next_id: u64 = storage.load_or("next_id", 1);
//! ```

mod backend;
mod error;
mod storage;

pub use backend::{Backend, FileBackend, MemoryBackend, STORE_FILE};
pub use error::{StorageError, StorageResult};
pub use storage::{KeyValueStore, KeyValueStoreExt, Storage};

/// Separator between namespace and key
pub const NAMESPACE_SEPARATOR: char = ':';
