//! CLI command definitions for layerconf
//!
//! The `Cli` struct carries the store settings shared by every subcommand;
//! `Cli::build_store` turns them into a configured [`ConfigStore`].

use crate::config::{ConfigStore, LookupMode, StoreOptions};
use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Layered configuration lookup and hot-reload tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to search for the config file (repeatable, last given is searched first)
    #[arg(short, long = "path", global = true)]
    pub paths: Vec<PathBuf>,

    /// Config file base name, without extension
    #[arg(short, long, default_value = "config", global = true)]
    pub name: String,

    /// Force the file format (json or yaml) instead of using the extension
    #[arg(short = 't', long = "type", global = true)]
    pub file_type: Option<String>,

    /// Prefix prepended to bound env var names at lookup time
    #[arg(long, global = true)]
    pub env_prefix: Option<String>,

    /// Bind KEY to env var KEY, or to VAR with KEY=VAR (repeatable)
    #[arg(short = 'e', long = "bind-env", global = true)]
    pub bind_env: Vec<String>,

    /// Override KEY=VALUE; VALUE is parsed as JSON when possible (repeatable)
    #[arg(short, long = "set", value_parser = parse_assignment, global = true)]
    pub set: Vec<(String, Value)>,

    /// Default KEY=VALUE; VALUE is parsed as JSON when possible (repeatable)
    #[arg(short, long = "default", value_parser = parse_assignment, global = true)]
    pub default: Vec<(String, Value)>,

    /// Treat stored zero/empty/false values as present instead of missing
    #[arg(long, global = true)]
    pub keep_falsy: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved value of KEY as JSON (exit status 1 when unset)
    Get {
        key: String,
    },

    /// Print the located config file, its format and modification time
    Locate,

    /// Print every layer merged into one document
    Dump,

    /// Print the merged settings every time the config file changes
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

/// Parse `KEY=VALUE`, decoding VALUE as JSON and falling back to a string.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

impl Cli {
    /// Build a store from the global flags. Does not read the config file.
    pub fn build_store(&self) -> Result<ConfigStore, ConfigError> {
        let options = StoreOptions {
            name: self.name.clone(),
            file_type: self.file_type.clone(),
            env_prefix: self.env_prefix.clone(),
            lookup_mode: if self.keep_falsy {
                LookupMode::Present
            } else {
                LookupMode::Truthy
            },
            ..StoreOptions::default()
        };
        let store = ConfigStore::with_options(options);

        for path in &self.paths {
            store.add_path(path.clone());
        }
        for binding in &self.bind_env {
            match binding.split_once('=') {
                Some((key, var)) => store.bind_env_as(key, var),
                None => store.bind_env(binding.as_str()),
            }
        }
        for (key, value) in &self.default {
            store.set_default(key, value.clone())?;
        }
        for (key, value) in &self.set {
            store.set(key, value.clone())?;
        }
        Ok(store)
    }
}
