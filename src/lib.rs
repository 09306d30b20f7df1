//! Layered configuration store with key-path lookup and hot reload.
//!
//! This module exports the store, its option types and the file format
//! decoders.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;

use std::sync::OnceLock;

pub use config::{ConfigStore, LookupMode, StoreOptions, WatchMode, WatchOptions};
pub use error::{ConfigError, Result};
pub use format::Format;

/// Process-wide store for applications that want a single shared instance.
///
/// The library itself never touches this; it is created on first use with
/// default options.
pub fn global() -> &'static ConfigStore {
    static GLOBAL: OnceLock<ConfigStore> = OnceLock::new();
    GLOBAL.get_or_init(ConfigStore::new)
}
