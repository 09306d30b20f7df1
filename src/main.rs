//! layerconf command-line tool
//!
//! Resolves keys against a layered configuration store built from the
//! command line, and can watch the config file for changes.

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Parser;
use layerconf::cli::{Cli, Command};
use layerconf::config::{ConfigStore, WatchMode, WatchOptions};
use layerconf::logging::{self, LogTarget};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let store = cli.build_store()?;

    match cli.command {
        Command::Get { ref key } => {
            read_if_present(&store)?;
            match store.get(key) {
                Some(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    debug!("{} is not set in any layer", key);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Locate => {
            let path = store.locate()?;
            let format = store.resolve_type()?;
            let modified: DateTime<Local> = std::fs::metadata(&path)?.modified()?.into();
            println!("{}", path.display());
            println!("format: {}", format);
            println!("modified: {}", modified.to_rfc3339());
            Ok(ExitCode::SUCCESS)
        }
        Command::Dump => {
            read_if_present(&store)?;
            println!("{}", serde_json::to_string_pretty(&store.all_settings())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Watch { interval_ms } => {
            read_if_present(&store)?;
            print_settings(&store);
            run_watch(store, Duration::from_millis(interval_ms)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read the config file, treating a missing file as an empty layer.
fn read_if_present(store: &ConfigStore) -> Result<()> {
    match store.read() {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("{}; continuing without a config file", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_settings(store: &ConfigStore) {
    match serde_json::to_string_pretty(&store.all_settings()) {
        Ok(text) => println!("{}", text),
        Err(e) => warn!("Cannot render settings: {}", e),
    }
}

/// Watch until Ctrl-C, printing the merged settings after every reload.
async fn run_watch(store: ConfigStore, interval: Duration) -> Result<()> {
    let (reloaded_tx, mut reloaded_rx) = mpsc::unbounded_channel();
    let options = WatchOptions::default()
        .with_mode(WatchMode::Tokio)
        .with_interval(interval);
    let handle = store.watch_config(
        move || {
            reloaded_tx.send(())?;
            Ok(())
        },
        options,
    )?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watcher");
                break;
            }
            Some(()) = reloaded_rx.recv() => {
                if let Some(path) = store.config_file_used() {
                    info!("Reloaded {}", path.display());
                }
                print_settings(&store);
            }
        }
    }

    handle.shutdown_async().await;
    Ok(())
}
