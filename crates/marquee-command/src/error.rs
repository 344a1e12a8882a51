//! Command error types.

use marquee_state::StateError;
use thiserror::Error;

use crate::deployer::DeployError;

/// Errors produced while parsing or executing a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The text does not have the shape the command expects.
    #[error("{0}")]
    InvalidSyntax(String),

    /// `setvar` named a variable the playbook does not declare.
    #[error("Instance {playbook_id} {instance_id} does not define those variables")]
    UnknownVariable {
        playbook_id: String,
        instance_id: String,
        variable: String,
    },

    #[error("deployment failed: {0}")]
    DeployFailure(#[source] DeployError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl CommandError {
    /// Text safe to show to a chat user.
    ///
    /// Syntax, unknown-variable and not-found errors carry crafted messages;
    /// anything internal is replaced by a generic line.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::InvalidSyntax(msg) => msg.clone(),
            CommandError::UnknownVariable { .. } => self.to_string(),
            CommandError::State(StateError::NotFound(_)) => "Instance not found".to_string(),
            CommandError::DeployFailure(_) => "Deployment failed".to_string(),
            CommandError::State(_) => "Something went wrong, check the server logs".to_string(),
        }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;
