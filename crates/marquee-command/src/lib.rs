//! marquee-command — operator commands for Marquee.
//!
//! Turns one line of operator text (a chat slash-command with the trigger
//! already stripped) into a validated instance mutation or query.
//!
//! # Components
//!
//! - **`command`** — `Command` variants and the whitespace tokenizer/parser
//! - **`dispatcher`** — executes a `Command` against the repository, the
//!   playbook catalog, and the deployment engine
//! - **`deployer`** — the deployment-engine seam and the in-process
//!   `LifecycleDeployer` that walks the status state machine
//! - **`notification`** — `"<actor>: <playbook>-<id> <status>"` status lines
//!
//! ```text
//! "setvar web pr-12 branch=main"
//!   │
//!   ▼
//! Command::parse ──► Command::SetVar { .. }
//!   │
//!   ▼
//! Dispatcher::execute ──► InstanceRepository (find, save)
//!                     ──► PlaybookCatalog (declared vars)
//!                     ──► Deployer (deploy)
//! ```

pub mod command;
pub mod deployer;
pub mod dispatcher;
pub mod error;
pub mod notification;

pub use command::{Command, HELP_TEXT};
pub use deployer::{DeployError, Deployer, LifecycleDeployer};
pub use dispatcher::Dispatcher;
pub use error::{CommandError, CommandResult};
pub use notification::{Notification, Notifier, TracingNotifier};
