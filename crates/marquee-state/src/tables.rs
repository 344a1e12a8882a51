//! redb table definitions for the Marquee key-value store.
//!
//! A single table holds every key. Keys are slash-separated paths
//! (`/marquee/instances/{playbook_id}/{id}`), values are opaque bytes.

use redb::TableDefinition;

/// All keys, path-shaped, mapped to raw values.
pub const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");
