//! marquee-state — instance persistence for Marquee.
//!
//! Instances live in a hierarchical key-value store under path-shaped keys:
//!
//! ```text
//! <root>/instances/<playbook_id>/<instance_id>  ->  JSON record
//! ```
//!
//! # Layers
//!
//! - **`kv`** — the `KvStore` capability (point get/set/delete, sub-path
//!   enumeration) and its redb-backed implementation `RedbStore`
//! - **`paths`** — the key scheme; every component formats keys through it
//! - **`types`** — the `Instance` record and its status state machine
//! - **`repository`** — CRUD over a `KvStore`, owning (de)serialization and
//!   error classification
//!
//! `RedbStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`) and
//! can be shared across async tasks.

pub mod error;
pub mod kv;
pub mod paths;
pub mod repository;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult, StoreError, StoreResult};
pub use kv::{KvStore, RedbStore};
pub use repository::{InstanceRepository, PartialListing};
pub use types::*;
