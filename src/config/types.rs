//! Option types for the store and its watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How a lookup decides that a stored value "exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Falsy values (null, false, 0, "", [], {}) read back as absent.
    #[default]
    Truthy,
    /// Every non-null value is present, and an empty bound env var wins.
    Present,
}

/// Construction-time settings for a [`ConfigStore`](super::ConfigStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Delimiter used to split key paths.
    #[serde(default = "default_key_delimiter")]
    pub key_delimiter: String,

    /// Directories searched for the config file, first entry searched first.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Base name of the config file, without extension.
    #[serde(default = "default_name")]
    pub name: String,

    /// Forced format; inferred from the file extension when unset.
    #[serde(default)]
    pub file_type: Option<String>,

    /// Prepended to bound env var names at lookup time.
    #[serde(default)]
    pub env_prefix: Option<String>,

    #[serde(default)]
    pub lookup_mode: LookupMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_delimiter: default_key_delimiter(),
            search_paths: default_search_paths(),
            name: default_name(),
            file_type: None,
            env_prefix: None,
            lookup_mode: LookupMode::default(),
        }
    }
}

fn default_key_delimiter() -> String {
    ".".to_string()
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_name() -> String {
    "config".to_string()
}

/// Where the watcher's poll loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// A dedicated OS thread.
    #[default]
    Thread,
    /// A task on the current tokio runtime.
    Tokio,
}

/// Watcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub mode: WatchMode,
    /// Wait between poll cycles.
    pub interval: Duration,
    /// Upper bound on a single watcher-triggered reload.
    pub read_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            mode: WatchMode::Thread,
            interval: Duration::from_secs(1),
            read_timeout: Duration::from_secs(5),
        }
    }
}

impl WatchOptions {
    pub fn with_mode(mut self, mode: WatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}
