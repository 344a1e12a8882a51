//! Key scheme for instance records.
//!
//! ```text
//! <root>/instances/<playbook_id>             playbook prefix
//! <root>/instances/<playbook_id>/<id>        one instance
//! ```
//!
//! Identifiers are not normalised: a `/` inside a playbook or instance id
//! would change the shape of the key. Such ids are rejected at the transport
//! boundary before they get here.

/// Segment under the root that holds every instance record.
pub const INSTANCES_SEGMENT: &str = "instances";

/// Default key root used when none is configured.
pub const DEFAULT_ROOT: &str = "/marquee";

/// Canonical key for a single instance.
pub fn instance_key(root: &str, playbook_id: &str, id: &str) -> String {
    format!("{}/{id}", playbook_prefix(root, playbook_id))
}

/// Canonical prefix under which all instances of a playbook live.
pub fn playbook_prefix(root: &str, playbook_id: &str) -> String {
    format!(
        "{}/{INSTANCES_SEGMENT}/{playbook_id}",
        root.trim_end_matches('/')
    )
}
