//! Layered configuration store.
//!
//! Values are resolved from four layers, highest precedence first:
//! 1. **Overrides** - written by [`ConfigStore::set`]
//! 2. **Environment** - single-segment keys bound with [`ConfigStore::bind_env`]
//! 3. **Config file** - `<dir>/<name>.json` or `<dir>/<name>.yaml`, loaded by [`ConfigStore::read`]
//! 4. **Defaults** - written by [`ConfigStore::set_default`]
//!
//! ## File discovery
//! Search directories are probed newest first (see [`ConfigStore::add_path`]),
//! and within a directory `json` is tried before `yaml`.
//!
//! ## Hot reload
//! [`ConfigStore::watch_config`] polls the file on a fixed interval and
//! re-reads it when its path or modification time changes.

pub mod env;
pub mod keypath;
pub mod locator;
mod merge;
mod store;
mod types;
pub mod watcher;

pub use env::{EnvSource, ProcessEnv};
pub use merge::{flatten_layers, merge_into};
pub use store::{ConfigStore, OnChange};
pub use types::*;
pub use watcher::{PollState, Transition, WatchHandle};
