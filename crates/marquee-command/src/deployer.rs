//! Deployment-engine seam.
//!
//! The dispatcher hands an instance to a `Deployer` and reports whatever it
//! says. Status transitions are the deployer's job, not the dispatcher's.

use marquee_state::{Instance, InstanceRepository, InstanceStatus, StateError};
use thiserror::Error;
use tracing::{info, warn};

/// Failure reported by a deployment engine.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("{0}")]
    Engine(String),
}

/// Something that provisions and tears down instances.
pub trait Deployer: Send + Sync {
    /// Deploy `instance`, returning it in its post-deploy state.
    fn deploy(&self, instance: &Instance) -> Result<Instance, DeployError>;

    /// Tear `instance` down and remove its record.
    ///
    /// Returns the instance as it was last recorded before removal.
    fn destroy(&self, instance: &Instance) -> Result<Instance, DeployError>;
}

/// In-process engine that walks the status state machine and persists each
/// step. It does not talk to any cluster.
#[derive(Clone)]
pub struct LifecycleDeployer {
    repo: InstanceRepository,
}

impl LifecycleDeployer {
    pub fn new(repo: InstanceRepository) -> Self {
        Self { repo }
    }

    fn step(&self, instance: &mut Instance, next: InstanceStatus) -> Result<(), DeployError> {
        instance.transition_to(next)?;
        if let Err(e) = self.repo.save(instance) {
            self.mark_error(instance);
            return Err(e.into());
        }
        Ok(())
    }

    /// Best-effort move to `Error`; the original failure is what gets reported.
    fn mark_error(&self, instance: &mut Instance) {
        if instance.transition_to(InstanceStatus::Error).is_ok() {
            if let Err(e) = self.repo.save(instance) {
                warn!(
                    playbook = %instance.playbook_id,
                    instance = %instance.id,
                    error = %e,
                    "could not record error status"
                );
            }
        }
    }
}

impl Deployer for LifecycleDeployer {
    fn deploy(&self, instance: &Instance) -> Result<Instance, DeployError> {
        let mut instance = instance.clone();
        self.step(&mut instance, InstanceStatus::Deploying)?;
        info!(playbook = %instance.playbook_id, instance = %instance.id, "deploying");
        self.step(&mut instance, InstanceStatus::Deployed)?;
        info!(playbook = %instance.playbook_id, instance = %instance.id, "deployed");
        Ok(instance)
    }

    fn destroy(&self, instance: &Instance) -> Result<Instance, DeployError> {
        let mut instance = instance.clone();
        // New and Error instances have nothing provisioned to tear down.
        if !matches!(instance.status, InstanceStatus::New | InstanceStatus::Error) {
            self.step(&mut instance, InstanceStatus::Deleting)?;
        }
        if let Err(e) = self.repo.delete(&self.repo.path_of(&instance)) {
            self.mark_error(&mut instance);
            return Err(e.into());
        }
        info!(playbook = %instance.playbook_id, instance = %instance.id, "destroyed");
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use marquee_state::{KvStore, RedbStore, StoreError, StoreResult};

    fn test_instance() -> Instance {
        Instance {
            playbook_id: "foo".to_string(),
            id: "bar".to_string(),
            status: InstanceStatus::New,
            vars: BTreeMap::new(),
            created_time: 1000,
        }
    }

    fn setup() -> (InstanceRepository, LifecycleDeployer) {
        let store = RedbStore::open_in_memory().unwrap();
        let repo = InstanceRepository::new(Arc::new(store), "/broadway");
        let deployer = LifecycleDeployer::new(repo.clone());
        (repo, deployer)
    }

    /// Lets the first `ok_writes` writes through, then fails one write.
    struct FailNthWrite {
        inner: RedbStore,
        ok_writes: usize,
        writes: AtomicUsize,
    }

    impl KvStore for FailNthWrite {
        fn set_value(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == self.ok_writes {
                return Err(StoreError::Write("injected".to_string()));
            }
            self.inner.set_value(key, value)
        }
        fn value(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.value(key)
        }
        fn values(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
            self.inner.values(prefix)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn deploy_walks_to_deployed() {
        let (repo, deployer) = setup();
        let inst = test_instance();
        repo.save(&inst).unwrap();

        let deployed = deployer.deploy(&inst).unwrap();
        assert_eq!(deployed.status, InstanceStatus::Deployed);
        assert_eq!(
            repo.find_by_id("foo", "bar").unwrap().status,
            InstanceStatus::Deployed
        );
    }

    #[test]
    fn deploy_rejects_already_deployed() {
        let (repo, deployer) = setup();
        let mut inst = test_instance();
        inst.status = InstanceStatus::Deployed;
        repo.save(&inst).unwrap();

        let err = deployer.deploy(&inst).unwrap_err();
        assert!(matches!(
            err,
            DeployError::State(StateError::InvalidTransition { .. })
        ));
        // Rejected before any write.
        assert_eq!(
            repo.find_by_id("foo", "bar").unwrap().status,
            InstanceStatus::Deployed
        );
    }

    #[test]
    fn failed_write_marks_error() {
        let store = FailNthWrite {
            inner: RedbStore::open_in_memory().unwrap(),
            // Write 0 is the setup save, write 1 is `Deploying`, write 2 fails.
            ok_writes: 2,
            writes: AtomicUsize::new(0),
        };
        let repo = InstanceRepository::new(Arc::new(store), "/broadway");
        let deployer = LifecycleDeployer::new(repo.clone());
        let inst = test_instance();
        repo.save(&inst).unwrap();

        assert!(deployer.deploy(&inst).is_err());
        assert_eq!(
            repo.find_by_id("foo", "bar").unwrap().status,
            InstanceStatus::Error
        );
    }

    #[test]
    fn error_instance_can_be_redeployed() {
        let (repo, deployer) = setup();
        let mut inst = test_instance();
        inst.status = InstanceStatus::Error;
        repo.save(&inst).unwrap();

        assert_eq!(
            deployer.deploy(&inst).unwrap().status,
            InstanceStatus::Deployed
        );
    }

    #[test]
    fn destroy_removes_record() {
        let (repo, deployer) = setup();
        let deployed = deployer.deploy(&test_instance()).unwrap();

        deployer.destroy(&deployed).unwrap();
        assert!(repo.find_by_id("foo", "bar").unwrap_err().is_not_found());
    }

    #[test]
    fn destroy_passes_through_deleting() {
        let (_, deployer) = setup();
        let deployed = deployer.deploy(&test_instance()).unwrap();

        let last = deployer.destroy(&deployed).unwrap();
        assert_eq!(last.status, InstanceStatus::Deleting);
    }

    #[test]
    fn destroy_never_deployed_removes_record() {
        let (repo, deployer) = setup();
        for status in [InstanceStatus::New, InstanceStatus::Error] {
            let mut inst = test_instance();
            inst.status = status;
            repo.save(&inst).unwrap();

            assert_eq!(deployer.destroy(&inst).unwrap().status, status);
            assert!(repo.find_by_id("foo", "bar").unwrap_err().is_not_found());
        }
    }

    #[test]
    fn destroy_rejects_in_flight_instance() {
        let (repo, deployer) = setup();
        for status in [InstanceStatus::Deploying, InstanceStatus::Deleting] {
            let mut inst = test_instance();
            inst.status = status;
            repo.save(&inst).unwrap();

            let err = deployer.destroy(&inst).unwrap_err();
            assert!(matches!(
                err,
                DeployError::State(StateError::InvalidTransition { .. })
            ));
            assert_eq!(repo.find_by_id("foo", "bar").unwrap().status, status);
        }
    }
}
