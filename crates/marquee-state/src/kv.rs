//! Key-value store capability and its redb-backed implementation.
//!
//! The repository only needs four primitives: point get, point set, point
//! delete, and a snapshot enumeration of every key below a path prefix.
//! `RedbStore` provides them with one redb transaction per call, which gives
//! linearizable single-key operations and a consistent view for enumeration.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::KV;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Hierarchical key-value persistence.
///
/// Keys are slash-separated paths. `values(prefix)` returns the entries whose
/// key is a strict sub-path of `prefix` (it starts with `prefix` followed by
/// `/`), so `/a/foo` never enumerates keys under `/a/foobar`.
pub trait KvStore: Send + Sync {
    /// Write `value` at `key`, replacing whatever was there.
    fn set_value(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the value at `key`. `None` when the key is absent.
    fn value(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Snapshot of every `(key, value)` below `prefix`.
    fn values(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Remove `key`. Returns whether it existed; a missing key is not an error.
    fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// Normalise a prefix into the "children of" form used for enumeration.
pub(crate) fn child_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}

/// Thread-safe key-value store backed by redb.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "kv store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory kv store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(KV).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl KvStore for RedbStore {
    fn set_value(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(KV).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = value.len(), "value stored");
        Ok(())
    }

    fn value(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(KV).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn values(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let prefix = child_prefix(prefix);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(KV).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        // Keys are ordered, so the sub-tree is one contiguous range.
        for entry in table.range(prefix.as_str()..).map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let key = key.value();
            if !key.starts_with(&prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        debug!(%prefix, count = results.len(), "values enumerated");
        Ok(results)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(KV).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "value deleted");
        Ok(existed)
    }
}
