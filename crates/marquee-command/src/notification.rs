//! Human-readable status lines.

use std::fmt;

use marquee_state::Instance;
use tracing::info;

/// `"<actor>: <playbook_id>-<id> <status>"` for one instance.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    pub actor: &'a str,
    pub instance: &'a Instance,
}

impl<'a> Notification<'a> {
    pub fn new(actor: &'a str, instance: &'a Instance) -> Self {
        Self { actor, instance }
    }
}

impl fmt::Display for Notification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}-{} {}",
            self.actor, self.instance.playbook_id, self.instance.id, self.instance.status
        )
    }
}

/// Render the status line for `instance` on behalf of `actor`.
pub fn format(instance: &Instance, actor: &str) -> String {
    Notification::new(actor, instance).to_string()
}

/// Sink for status notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification<'_>);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification<'_>) {
        info!(
            actor = notification.actor,
            playbook = %notification.instance.playbook_id,
            instance = %notification.instance.id,
            "{notification}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_state::InstanceStatus;
    use std::collections::BTreeMap;

    fn instance(status: InstanceStatus) -> Instance {
        Instance {
            playbook_id: "web".to_string(),
            id: "pr-12".to_string(),
            status,
            vars: BTreeMap::new(),
            created_time: 1000,
        }
    }

    #[test]
    fn formats_status_line() {
        assert_eq!(
            format(&instance(InstanceStatus::Deployed), "alice"),
            "alice: web-pr-12 deployed"
        );
        assert_eq!(
            format(&instance(InstanceStatus::Error), "bob"),
            "bob: web-pr-12 error"
        );
    }

    #[test]
    fn new_status_renders_empty() {
        assert_eq!(format(&instance(InstanceStatus::New), "alice"), "alice: web-pr-12 ");
    }
}
