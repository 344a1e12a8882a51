//! Playbook definitions (`*.toml`) and the catalog used to look them up.
//!
//! ```toml
//! id = "web"
//! name = "Web frontend"
//! description = "Per-branch preview environment"
//! vars = ["branch", "replicas"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PlaybookError, PlaybookResult};

/// A template instances are created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Variable names an instance of this playbook may override.
    #[serde(default)]
    pub vars: Vec<String>,
}

impl Playbook {
    /// Parse a playbook from TOML text.
    pub fn from_toml(content: &str, path: &Path) -> PlaybookResult<Self> {
        let playbook: Playbook = toml::from_str(content).map_err(|e| PlaybookError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        playbook.validate()?;
        Ok(playbook)
    }

    pub fn from_file(path: &Path) -> PlaybookResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PlaybookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Whether `var` is one of the declared variable names.
    pub fn declares(&self, var: &str) -> bool {
        self.vars.iter().any(|v| v == var)
    }

    fn validate(&self) -> PlaybookResult<()> {
        let invalid = |reason: &str| PlaybookError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.id.contains('/') {
            return Err(invalid("id must not contain '/'"));
        }
        if self.vars.iter().any(|v| v.is_empty() || v.contains('=')) {
            return Err(invalid("variable names must be non-empty and free of '='"));
        }
        Ok(())
    }
}

/// Lookup of playbooks by id.
pub trait PlaybookCatalog: Send + Sync {
    fn playbook(&self, id: &str) -> Option<&Playbook>;

    /// Whether playbook `id` exists and declares `var`.
    fn declares(&self, id: &str, var: &str) -> bool {
        self.playbook(id).is_some_and(|p| p.declares(var))
    }
}

/// In-memory set of playbooks, usually loaded from a directory.
#[derive(Debug, Clone, Default)]
pub struct PlaybookSet {
    playbooks: HashMap<String, Playbook>,
}

impl PlaybookSet {
    pub fn from_playbooks(playbooks: impl IntoIterator<Item = Playbook>) -> PlaybookResult<Self> {
        let mut set = Self::default();
        for playbook in playbooks {
            set.insert(playbook)?;
        }
        Ok(set)
    }

    /// Load every `*.toml` file in `dir`. Other files are ignored.
    pub fn load_dir(dir: &Path) -> PlaybookResult<Self> {
        let io_err = |source: std::io::Error| PlaybookError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = Self::default();
        for path in &paths {
            let playbook = Playbook::from_file(path)?;
            debug!(path = ?path, id = %playbook.id, "playbook parsed");
            set.insert(playbook)?;
        }
        info!(dir = ?dir, count = set.len(), "playbooks loaded");
        Ok(set)
    }

    fn insert(&mut self, playbook: Playbook) -> PlaybookResult<()> {
        if self.playbooks.contains_key(&playbook.id) {
            return Err(PlaybookError::Duplicate(playbook.id));
        }
        self.playbooks.insert(playbook.id.clone(), playbook);
        Ok(())
    }

    /// Sorted playbook ids.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.playbooks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.playbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }
}

impl PlaybookCatalog for PlaybookSet {
    fn playbook(&self, id: &str) -> Option<&Playbook> {
        self.playbooks.get(id)
    }
}
