//! Dispatcher — executes parsed commands.
//!
//! Lookups and writes go through the repository; `setvar` consults the
//! playbook catalog; `deploy` delegates to the deployment engine. Nothing
//! here holds locks: `setvar` is a plain read-modify-write, so two writers
//! on the same instance race and the later save wins.

use std::sync::Arc;

use marquee_playbook::PlaybookCatalog;
use marquee_state::{Instance, InstanceRepository};
use tracing::{info, warn};

use crate::command::{Command, HELP_TEXT};
use crate::deployer::Deployer;
use crate::error::{CommandError, CommandResult};
use crate::notification::{Notification, Notifier, TracingNotifier};

/// Executes operator commands against injected collaborators.
#[derive(Clone)]
pub struct Dispatcher {
    repo: InstanceRepository,
    playbooks: Arc<dyn PlaybookCatalog>,
    deployer: Arc<dyn Deployer>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    /// Create a dispatcher that reports deploys to the log.
    pub fn new(
        repo: InstanceRepository,
        playbooks: Arc<dyn PlaybookCatalog>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Self {
            repo,
            playbooks,
            deployer,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Replace the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn repository(&self) -> &InstanceRepository {
        &self.repo
    }

    /// Parse and execute one line of operator text on behalf of `actor`.
    pub fn run(&self, text: &str, actor: &str) -> CommandResult<String> {
        let command = Command::parse(text)?;
        self.execute(&command, actor)
    }

    /// Execute a parsed command, returning the confirmation message.
    pub fn execute(&self, command: &Command, actor: &str) -> CommandResult<String> {
        match command {
            Command::Help => Ok(HELP_TEXT.to_string()),
            Command::SetVar {
                playbook_id,
                instance_id,
                assignments,
            } => self.set_vars(playbook_id, instance_id, assignments),
            Command::Deploy {
                playbook_id,
                instance_id,
            } => {
                self.deploy(playbook_id, instance_id, actor)?;
                Ok(format!("Instance {playbook_id}/{instance_id} deployed"))
            }
        }
    }

    /// Deploy one instance and notify on success.
    ///
    /// Shared by the `deploy` command and the HTTP deploy route.
    pub fn deploy(&self, playbook_id: &str, instance_id: &str, actor: &str) -> CommandResult<Instance> {
        let instance = self.repo.find_by_id(playbook_id, instance_id)?;
        let deployed = self.deployer.deploy(&instance).map_err(|e| {
            warn!(playbook = %playbook_id, instance = %instance_id, error = %e, "deploy failed");
            CommandError::DeployFailure(e)
        })?;
        self.notifier.notify(&Notification::new(actor, &deployed));
        Ok(deployed)
    }

    /// Tear one instance down through the engine, which removes its record.
    ///
    /// A missing instance is `NotFound`; an instance the engine refuses to
    /// tear down (for example one still deploying) keeps its record.
    pub fn destroy(&self, playbook_id: &str, instance_id: &str, actor: &str) -> CommandResult<()> {
        let instance = self.repo.find_by_id(playbook_id, instance_id)?;
        let last = self.deployer.destroy(&instance).map_err(|e| {
            warn!(playbook = %playbook_id, instance = %instance_id, error = %e, "destroy failed");
            CommandError::DeployFailure(e)
        })?;
        self.notifier.notify(&Notification::new(actor, &last));
        Ok(())
    }

    fn set_vars(
        &self,
        playbook_id: &str,
        instance_id: &str,
        assignments: &[(String, String)],
    ) -> CommandResult<String> {
        let mut instance = self.repo.find_by_id(playbook_id, instance_id).inspect_err(|e| {
            warn!(playbook = %playbook_id, instance = %instance_id, error = %e, "cannot setvar on instance");
        })?;

        // Reject before touching anything: all assignments apply or none do.
        if let Some((variable, _)) = assignments
            .iter()
            .find(|(key, _)| !self.playbooks.declares(&instance.playbook_id, key))
        {
            warn!(playbook = %playbook_id, %variable, "setvar with undeclared variable");
            return Err(CommandError::UnknownVariable {
                playbook_id: instance.playbook_id,
                instance_id: instance.id,
                variable: variable.clone(),
            });
        }

        for (key, value) in assignments {
            instance.vars.insert(key.clone(), value.clone());
        }
        self.repo.save(&instance)?;
        info!(playbook = %playbook_id, instance = %instance_id, count = assignments.len(), "variables updated");

        Ok(format!(
            "Instance {} {} updated it's variables",
            instance.playbook_id, instance.id
        ))
    }
}
