//! Tracing subscriber setup for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. This module provides the one the `layerconf` binary
//! uses.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    /// Append to a file.
    File(PathBuf),
}

impl LogTarget {
    /// Parse `0/off`, `1/stdout`, `2/stderr`, or treat anything else as a filename.
    pub fn parse(s: &str) -> Self {
        match s {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        }
    }
}

/// Build the event filter: `RUST_LOG` when set, otherwise `debug` with
/// `verbose` and `info` without.
fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber for `target`.
pub fn init(target: &LogTarget, verbose: bool) -> Result<()> {
    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
