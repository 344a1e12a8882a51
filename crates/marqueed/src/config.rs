//! Daemon configuration.
//!
//! Values come from an optional TOML file, then command-line flags (which
//! also read `MARQUEE_*` environment variables) override them:
//!
//! ```toml
//! port = 8080
//! data_dir = "/var/lib/marquee"
//! playbooks_dir = "/etc/marquee/playbooks"
//! key_root = "/marquee"
//! chat_token = "xoxb-..."
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use marquee_state::paths::DEFAULT_ROOT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub playbooks_dir: PathBuf,
    /// Root of every key the daemon writes.
    pub key_root: String,
    /// Shared secret for chat commands. Unset rejects all of them.
    pub chat_token: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("/var/lib/marquee"),
            playbooks_dir: PathBuf::from("playbooks"),
            key_root: DEFAULT_ROOT.to_string(),
            chat_token: None,
        }
    }
}

/// Flag values; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub playbooks_dir: Option<PathBuf>,
    pub key_root: Option<String>,
    pub chat_token: Option<String>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the file (if any) and apply flag overrides on top.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_overrides(overrides))
    }

    pub fn with_overrides(mut self, o: Overrides) -> Self {
        if let Some(port) = o.port {
            self.port = port;
        }
        if let Some(dir) = o.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = o.playbooks_dir {
            self.playbooks_dir = dir;
        }
        if let Some(root) = o.key_root {
            self.key_root = root;
        }
        if o.chat_token.is_some() {
            self.chat_token = o.chat_token;
        }
        self.chat_token = self.chat_token.filter(|t| !t.is_empty());
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("marquee.redb")
    }
}
