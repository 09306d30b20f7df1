//! Error types for the configuration store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised by direct store calls (`read`, `set`, `set_default`, `watch_config`).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `<dir>/<name>.<ext>` candidate exists for any search path and supported extension.
    #[error("config file '{name}' not found in search paths {paths:?}")]
    FileNotFound { name: String, paths: Vec<PathBuf> },

    /// The resolved format is outside the supported extension set.
    #[error("unsupported config type '{0}'")]
    UnsupportedFormat(String),

    /// A write path crosses an intermediate node that is not a map.
    #[error("cannot set '{key}': '{segment}' already holds a non-map value")]
    InvalidWritePath { key: String, segment: String },

    /// Decoder failure, passed through untouched.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Filesystem failure, passed through untouched.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// `WatchMode::Tokio` was requested outside of a tokio runtime.
    #[error("tokio watch mode requires a running tokio runtime")]
    NoRuntime,
}

impl ConfigError {
    pub fn invalid_write_path(key: &str, segment: &str) -> Self {
        Self::InvalidWritePath {
            key: key.to_string(),
            segment: segment.to_string(),
        }
    }

    /// True for `FileNotFound`, the one error the watcher treats as "nothing to do yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::FileNotFound { .. })
    }
}

/// Errors produced by the format decoders.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures observed inside the watcher loop.
///
/// None of these stop the loop; each is logged and the next cycle proceeds.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("reload failed: {0}")]
    Read(#[from] ConfigError),

    #[error("cannot stat '{path}': {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("change callback failed: {0}")]
    Callback(#[source] CallbackError),

    #[error("reload did not finish within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("reload panicked: {0}")]
    Panicked(String),
}

/// Error type returned by user change callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;
