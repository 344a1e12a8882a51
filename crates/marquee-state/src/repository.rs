//! InstanceRepository — instance CRUD over a `KvStore`.
//!
//! Owns the JSON encoding of instance records and the classification of
//! failures: a missing key is `NotFound`, a present but undecodable value is
//! `MalformedData`, anything the store itself rejects is `Store`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::kv::KvStore;
use crate::paths;
use crate::types::Instance;

/// Listing that stopped early.
///
/// `decoded` holds every instance decoded before `source` occurred, so a
/// caller can still use what was read.
#[derive(Debug, Error)]
#[error("{source} ({} instance(s) decoded before the failure)", .decoded.len())]
pub struct PartialListing {
    pub decoded: Vec<Instance>,
    #[source]
    pub source: StateError,
}

/// Instance persistence rooted at a key prefix.
#[derive(Clone)]
pub struct InstanceRepository {
    store: Arc<dyn KvStore>,
    root: String,
}

impl InstanceRepository {
    /// Create a repository that keeps its records below `root`.
    pub fn new(store: Arc<dyn KvStore>, root: impl Into<String>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }

    /// Key root this repository writes under.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Canonical key of `instance`.
    pub fn path_of(&self, instance: &Instance) -> String {
        paths::instance_key(&self.root, &instance.playbook_id, &instance.id)
    }

    /// Write `instance` at its key, unconditionally replacing any record.
    pub fn save(&self, instance: &Instance) -> StateResult<()> {
        let key = self.path_of(instance);
        let value =
            serde_json::to_vec(instance).map_err(|e| StateError::Serialize(e.to_string()))?;
        self.store.set_value(&key, &value)?;
        debug!(%key, status = %instance.status, "instance saved");
        Ok(())
    }

    /// Read the instance stored at `path`.
    pub fn find_by_path(&self, path: &str) -> StateResult<Instance> {
        match self.store.value(path)? {
            Some(value) if !value.is_empty() => decode(path, &value),
            _ => Err(StateError::NotFound(path.to_string())),
        }
    }

    /// Read the instance identified by `(playbook_id, id)`.
    pub fn find_by_id(&self, playbook_id: &str, id: &str) -> StateResult<Instance> {
        self.find_by_path(&paths::instance_key(&self.root, playbook_id, id))
    }

    /// All instances of a playbook, in no particular order.
    ///
    /// An empty playbook is an empty `Vec`, not an error. The first record
    /// that fails to decode ends the listing; the instances decoded up to that
    /// point travel with the error.
    pub fn find_by_playbook_id(&self, playbook_id: &str) -> Result<Vec<Instance>, PartialListing> {
        let prefix = paths::playbook_prefix(&self.root, playbook_id);
        let entries = self.store.values(&prefix).map_err(|e| PartialListing {
            decoded: Vec::new(),
            source: e.into(),
        })?;

        let mut decoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match decode(&key, &value) {
                Ok(instance) => decoded.push(instance),
                Err(source) => {
                    warn!(%key, error = %source, "stopping playbook listing at malformed record");
                    return Err(PartialListing { decoded, source });
                }
            }
        }
        debug!(%prefix, count = decoded.len(), "instances listed");
        Ok(decoded)
    }

    /// Remove the record at `path`. Returns whether it existed.
    pub fn delete(&self, path: &str) -> StateResult<bool> {
        let existed = self.store.delete(path)?;
        debug!(%path, existed, "instance deleted");
        Ok(existed)
    }

    /// Remove the record identified by `(playbook_id, id)`.
    pub fn delete_by_id(&self, playbook_id: &str, id: &str) -> StateResult<bool> {
        self.delete(&paths::instance_key(&self.root, playbook_id, id))
    }
}

fn decode(path: &str, value: &[u8]) -> StateResult<Instance> {
    serde_json::from_slice(value).map_err(|e| StateError::MalformedData {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use crate::error::{StoreError, StoreResult};
    use crate::kv::RedbStore;
    use crate::types::InstanceStatus;

    const ROOT: &str = "/broadway";

    fn test_repo() -> (RedbStore, InstanceRepository) {
        let store = RedbStore::open_in_memory().unwrap();
        let repo = InstanceRepository::new(Arc::new(store.clone()), ROOT);
        (store, repo)
    }

    fn test_instance(playbook_id: &str, id: &str) -> Instance {
        Instance {
            playbook_id: playbook_id.to_string(),
            id: id.to_string(),
            status: InstanceStatus::New,
            vars: BTreeMap::from([("var1".to_string(), "val1".to_string())]),
            created_time: 1000,
        }
    }

    /// Store whose every call fails, for error classification.
    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn set_value(&self, _: &str, _: &[u8]) -> StoreResult<()> {
            Err(StoreError::Write("disk full".to_string()))
        }
        fn value(&self, _: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::Read("connection reset".to_string()))
        }
        fn values(&self, _: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
            Err(StoreError::Read("connection reset".to_string()))
        }
        fn delete(&self, _: &str) -> StoreResult<bool> {
            Err(StoreError::Write("disk full".to_string()))
        }
    }

    /// Store that answers reads with an empty value, the "no such key" sentinel
    /// some backends use.
    #[derive(Default)]
    struct EmptyValueStore {
        writes: Mutex<Vec<String>>,
    }

    impl KvStore for EmptyValueStore {
        fn set_value(&self, key: &str, _: &[u8]) -> StoreResult<()> {
            self.writes.lock().unwrap().push(key.to_string());
            Ok(())
        }
        fn value(&self, _: &str) -> StoreResult<Option<Vec<u8>>> {
            Ok(Some(Vec::new()))
        }
        fn values(&self, _: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
            Ok(Vec::new())
        }
        fn delete(&self, _: &str) -> StoreResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn save_then_find_by_id_round_trips() {
        let (_, repo) = test_repo();
        let mut inst = test_instance("foo", "bar");
        inst.status = InstanceStatus::Deployed;

        repo.save(&inst).unwrap();
        assert_eq!(repo.find_by_id("foo", "bar").unwrap(), inst);
    }

    #[test]
    fn save_writes_canonical_key() {
        let (store, repo) = test_repo();
        repo.save(&test_instance("foo", "bar")).unwrap();
        assert!(store.value("/broadway/instances/foo/bar").unwrap().is_some());
    }

    #[test]
    fn save_overwrites_unconditionally() {
        let (_, repo) = test_repo();
        let mut inst = test_instance("foo", "bar");
        repo.save(&inst).unwrap();

        inst.vars.insert("var1".to_string(), "changed".to_string());
        repo.save(&inst).unwrap();

        assert_eq!(repo.find_by_id("foo", "bar").unwrap().vars["var1"], "changed");
    }

    #[test]
    fn find_by_path_missing_key_carries_path() {
        let (_, repo) = test_repo();
        let err = repo.find_by_path("/broadway/instances/foo/nope").unwrap_err();
        match err {
            StateError::NotFound(path) => assert_eq!(path, "/broadway/instances/foo/nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn find_by_path_empty_value_is_not_found() {
        let repo = InstanceRepository::new(Arc::new(EmptyValueStore::default()), ROOT);
        assert!(repo.find_by_path("/broadway/instances/a/b").unwrap_err().is_not_found());
    }

    #[test]
    fn find_by_path_malformed_value() {
        let (store, repo) = test_repo();
        store.set_value("/broadway/instances/foo/bar", b"{not json").unwrap();

        let err = repo.find_by_path("/broadway/instances/foo/bar").unwrap_err();
        assert!(matches!(err, StateError::MalformedData { ref path, .. } if path == "/broadway/instances/foo/bar"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn store_failures_are_classified() {
        let repo = InstanceRepository::new(Arc::new(BrokenStore), ROOT);

        assert!(matches!(
            repo.save(&test_instance("foo", "bar")),
            Err(StateError::Store(StoreError::Write(_)))
        ));
        assert!(matches!(
            repo.find_by_id("foo", "bar"),
            Err(StateError::Store(StoreError::Read(_)))
        ));
        assert!(matches!(
            repo.delete_by_id("foo", "bar"),
            Err(StateError::Store(_))
        ));

        let partial = repo.find_by_playbook_id("foo").unwrap_err();
        assert!(partial.decoded.is_empty());
        assert!(matches!(partial.source, StateError::Store(_)));
    }

    #[test]
    fn find_by_playbook_id_returns_all() {
        let (_, repo) = test_repo();
        for id in ["a", "b", "c"] {
            repo.save(&test_instance("foo", id)).unwrap();
        }
        repo.save(&test_instance("foobar", "d")).unwrap();
        repo.save(&test_instance("other", "e")).unwrap();

        let mut ids: Vec<String> = repo
            .find_by_playbook_id("foo")
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn find_by_playbook_id_empty_is_ok() {
        let (_, repo) = test_repo();
        assert!(repo.find_by_playbook_id("nothing").unwrap().is_empty());
    }

    #[test]
    fn find_by_playbook_id_keeps_partial_result() {
        let (store, repo) = test_repo();
        repo.save(&test_instance("foo", "a")).unwrap();
        repo.save(&test_instance("foo", "b")).unwrap();
        store.set_value("/broadway/instances/foo/c", b"garbage").unwrap();
        repo.save(&test_instance("foo", "d")).unwrap();

        let partial = repo.find_by_playbook_id("foo").unwrap_err();
        let ids: Vec<&str> = partial.decoded.iter().map(|i| i.id.as_str()).collect();
        // Keys enumerate in order; the scan stops at "c".
        assert_eq!(ids, vec!["a", "b"]);
        assert!(matches!(
            partial.source,
            StateError::MalformedData { ref path, .. } if path == "/broadway/instances/foo/c"
        ));
    }

    #[test]
    fn delete_removes_and_is_idempotent() {
        let (_, repo) = test_repo();
        let inst = test_instance("foo", "bar");
        repo.save(&inst).unwrap();

        let path = repo.path_of(&inst);
        assert!(repo.delete(&path).unwrap());
        assert!(!repo.delete(&path).unwrap());
        assert!(repo.find_by_path(&path).unwrap_err().is_not_found());
    }

    #[test]
    fn deleted_instance_is_indistinguishable_from_never_created() {
        let (_, repo) = test_repo();
        repo.save(&test_instance("foo", "gone")).unwrap();
        repo.delete_by_id("foo", "gone").unwrap();

        let gone = repo.find_by_id("foo", "gone").unwrap_err().to_string();
        let never = repo.find_by_id("foo", "never").unwrap_err().to_string();
        assert_eq!(gone.replace("gone", "X"), never.replace("never", "X"));
        assert!(repo.find_by_playbook_id("foo").unwrap().is_empty());
    }
}
