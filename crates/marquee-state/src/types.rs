//! Domain types for the Marquee state layer.
//!
//! An `Instance` is one environment created from a playbook template. It is
//! persisted as a JSON record:
//!
//! ```json
//! { "playbook_id": "web", "id": "pr-12", "status": "deployed",
//!   "vars": { "branch": "main" }, "created_time": 1700000000 }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Identifier of the playbook an instance was created from.
pub type PlaybookId = String;

/// Identifier of an instance, unique within its playbook.
pub type InstanceId = String;

// ── Status ────────────────────────────────────────────────────────

/// Lifecycle status of an instance.
///
/// `New` serializes as the empty string; the others as lowercase words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    #[serde(rename = "")]
    New,
    Deploying,
    Deployed,
    Deleting,
    Error,
}

impl InstanceStatus {
    /// Wire/text form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::New => "",
            InstanceStatus::Deploying => "deploying",
            InstanceStatus::Deployed => "deployed",
            InstanceStatus::Deleting => "deleting",
            InstanceStatus::Error => "error",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// ```text
    /// New ──► Deploying ──► Deployed ──► Deleting ──► (record removed)
    ///  ▲          │             │            │
    ///  └─ Error ◄─┴─────────────┴────────────┘   (Error ──► Deploying)
    /// ```
    pub fn can_transition_to(&self, next: InstanceStatus) -> bool {
        use InstanceStatus::*;
        matches!(
            (*self, next),
            (New, Deploying)
                | (Error, Deploying)
                | (Deploying, Deployed)
                | (Deployed, Deleting)
                | (New | Deploying | Deployed | Deleting, Error)
        )
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Instance ──────────────────────────────────────────────────────

/// A deployed (or pending) environment.
///
/// `(playbook_id, id)` is the sole identity and maps to exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub playbook_id: PlaybookId,
    pub id: InstanceId,
    #[serde(default)]
    pub status: InstanceStatus,
    /// Variable overrides. Unrestricted at creation; `setvar` only admits
    /// names declared by the playbook.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Unix timestamp (seconds) of first persistence.
    #[serde(default)]
    pub created_time: i64,
}

impl Instance {
    /// Build a new instance, stamped with the current time.
    pub fn new(
        playbook_id: impl Into<String>,
        id: impl Into<String>,
        vars: BTreeMap<String, String>,
    ) -> Self {
        Self {
            playbook_id: playbook_id.into(),
            id: id.into(),
            status: InstanceStatus::New,
            vars,
            created_time: unix_now(),
        }
    }

    /// Set `created_time` to now unless it was already set.
    pub fn stamp_created(&mut self) {
        if self.created_time == 0 {
            self.created_time = unix_now();
        }
    }

    /// Move to `next`, rejecting moves outside the transition table.
    pub fn transition_to(&mut self, next: InstanceStatus) -> StateResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
