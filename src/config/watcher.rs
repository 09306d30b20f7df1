//! Polling watcher for the backing config file.
//!
//! Every poll interval the watcher re-locates the config file and compares
//! it against what it saw last:
//! - a different path (first poll, file appeared, moved between search
//!   directories or changed extension) triggers an immediate reload;
//! - the same path is stat-ed, the first stat only records a baseline, and
//!   any later strictly newer modification time triggers a reload.
//!
//! Every successful reload is followed by the store's change callback. In
//! tokio mode both the poll and the reload run on the blocking pool, each
//! bounded by the read timeout.
//! Nothing that goes wrong inside the loop stops it: each failure is logged
//! and the next cycle proceeds. The loop ends only when its [`WatchHandle`]
//! is stopped or dropped.

use super::store::ConfigStore;
use super::types::{WatchMode, WatchOptions};
use crate::error::{ConfigError, Result, WatchError};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What a single poll cycle concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No candidate file exists; nothing changed.
    NotFound,
    /// The located path differs from the previous poll.
    PathChanged(PathBuf),
    /// First stat of this path; its modification time is now the baseline.
    Baseline(SystemTime),
    /// The modification time advanced past the recorded one.
    Modified(SystemTime),
    Unchanged,
}

impl Transition {
    /// Returns true if this cycle should reload the store.
    pub fn requires_reload(&self) -> bool {
        matches!(self, Transition::PathChanged(_) | Transition::Modified(_))
    }
}

/// Loop state carried between poll cycles.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    last_path: Option<PathBuf>,
    last_mod_time: Option<SystemTime>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }

    pub fn last_mod_time(&self) -> Option<SystemTime> {
        self.last_mod_time
    }

    /// Advance the state machine by one cycle.
    ///
    /// `located` is the result of locating the file this cycle; `stat` is
    /// only consulted when the path is unchanged. A stat failure leaves the
    /// state untouched.
    pub fn advance<F>(
        &mut self,
        located: Option<PathBuf>,
        stat: F,
    ) -> std::result::Result<Transition, WatchError>
    where
        F: FnOnce(&Path) -> std::io::Result<SystemTime>,
    {
        let Some(path) = located else {
            return Ok(Transition::NotFound);
        };

        if self.last_path.as_ref() != Some(&path) {
            self.last_path = Some(path.clone());
            // Re-armed against the new file on the next cycle.
            self.last_mod_time = None;
            return Ok(Transition::PathChanged(path));
        }

        let mod_time = stat(&path).map_err(|source| WatchError::Stat {
            path: path.clone(),
            source,
        })?;

        match self.last_mod_time {
            None => {
                self.last_mod_time = Some(mod_time);
                Ok(Transition::Baseline(mod_time))
            }
            Some(last) if mod_time > last => {
                self.last_mod_time = Some(mod_time);
                Ok(Transition::Modified(mod_time))
            }
            Some(_) => Ok(Transition::Unchanged),
        }
    }
}

fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

enum StopSignal {
    Thread(mpsc::Sender<()>),
    Task(watch::Sender<bool>),
}

enum Worker {
    Thread(thread::JoinHandle<()>),
    Task(tokio::task::JoinHandle<()>),
}

/// Handle to a running watcher.
///
/// Dropping the handle stops the watcher after its current cycle.
pub struct WatchHandle {
    stop: Option<StopSignal>,
    worker: Option<Worker>,
}

impl WatchHandle {
    /// Ask the loop to exit. Does not wait for it.
    pub fn stop(&mut self) {
        match self.stop.take() {
            Some(StopSignal::Thread(tx)) => {
                let _ = tx.send(());
            }
            Some(StopSignal::Task(tx)) => {
                let _ = tx.send(true);
            }
            None => {}
        }
    }

    /// Returns true once the poll loop has exited.
    pub fn is_finished(&self) -> bool {
        match &self.worker {
            Some(Worker::Thread(handle)) => handle.is_finished(),
            Some(Worker::Task(handle)) => handle.is_finished(),
            None => true,
        }
    }

    /// Stop the loop and block until a thread-mode watcher has exited.
    ///
    /// A tokio-mode watcher is only signalled; use
    /// [`shutdown_async`](Self::shutdown_async) to wait for it.
    pub fn shutdown(mut self) {
        self.stop();
        if let Some(Worker::Thread(handle)) = self.worker.take()
            && handle.join().is_err()
        {
            warn!("Config watcher thread panicked");
        }
    }

    /// Stop the loop and wait for it to exit, whichever mode it runs in.
    pub async fn shutdown_async(mut self) {
        self.stop();
        match self.worker.take() {
            Some(Worker::Task(handle)) => {
                if let Err(e) = handle.await {
                    warn!("Config watcher task failed: {}", e);
                }
            }
            Some(Worker::Thread(handle)) => {
                let _ = tokio::task::spawn_blocking(move || handle.join()).await;
            }
            None => {}
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start polling `store`'s config file.
///
/// Fails with `NoRuntime` when tokio mode is requested outside a runtime,
/// or with an I/O error when the watcher thread cannot be spawned.
pub fn start(store: ConfigStore, options: WatchOptions) -> Result<WatchHandle> {
    match options.mode {
        WatchMode::Thread => {
            let (stop_tx, stop_rx) = mpsc::channel();
            let handle = thread::Builder::new()
                .name("layerconf-watch".to_string())
                .spawn(move || run_thread(store, options, stop_rx))?;
            Ok(WatchHandle {
                stop: Some(StopSignal::Thread(stop_tx)),
                worker: Some(Worker::Thread(handle)),
            })
        }
        WatchMode::Tokio => {
            let runtime =
                tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
            let (stop_tx, stop_rx) = watch::channel(false);
            let handle = runtime.spawn(run_task(store, options, stop_rx));
            Ok(WatchHandle {
                stop: Some(StopSignal::Task(stop_tx)),
                worker: Some(Worker::Task(handle)),
            })
        }
    }
}

fn run_thread(store: ConfigStore, options: WatchOptions, stop: mpsc::Receiver<()>) {
    info!("Config watcher started (thread, every {:?})", options.interval);
    let mut state = PollState::new();
    loop {
        match stop.recv_timeout(options.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        if poll_cycle(&store, &mut state)
            && let Err(e) = reload_on_thread(&store, options.read_timeout)
        {
            report(&e);
        }
    }
    info!("Config watcher stopped");
}

async fn run_task(store: ConfigStore, options: WatchOptions, mut stop: watch::Receiver<bool>) {
    info!("Config watcher started (tokio, every {:?})", options.interval);
    let state = Arc::new(Mutex::new(PollState::new()));
    loop {
        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
        }

        let (poller, poll_state) = (store.clone(), Arc::clone(&state));
        let poll = off_runtime(options.read_timeout, move || {
            // A poll that overran its timeout still owns the state.
            let Some(mut state) = poll_state.try_lock() else {
                debug!("previous poll still running, skipping cycle");
                return Ok(false);
            };
            Ok(poll_cycle(&poller, &mut state))
        });
        match poll.await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                report(&e);
                continue;
            }
        }

        let worker = store.clone();
        if let Err(e) = off_runtime(options.read_timeout, move || reload(&worker)).await {
            report(&e);
        }
    }
    info!("Config watcher stopped");
}

/// Run blocking filesystem work on the blocking pool, giving up after `timeout`.
async fn off_runtime<T, F>(timeout: Duration, work: F) -> std::result::Result<T, WatchError>
where
    F: FnOnce() -> std::result::Result<T, WatchError> + Send + 'static,
    T: Send + 'static,
{
    let job = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, job).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(WatchError::Panicked(e.to_string())),
        Err(_) => Err(WatchError::TimedOut(timeout)),
    }
}

/// Run one poll cycle. Returns true if the store should be reloaded.
fn poll_cycle(store: &ConfigStore, state: &mut PollState) -> bool {
    let located = match store.locate() {
        Ok(path) => Some(path),
        Err(e) if e.is_not_found() => None,
        Err(e) => {
            report(&WatchError::Read(e));
            return false;
        }
    };

    match state.advance(located, modified_time) {
        Ok(transition) => {
            debug!("watch change: {:?}", transition);
            transition.requires_reload()
        }
        Err(e) => {
            report(&e);
            false
        }
    }
}

/// Re-read the store, then fire its change callback.
fn reload(store: &ConfigStore) -> std::result::Result<(), WatchError> {
    store.read()?;
    notify(store)
}

/// Reload on a helper thread, giving up on it after `timeout`.
///
/// A reload that overruns keeps going in the background; its result still
/// replaces the loaded layer atomically when it finishes.
fn reload_on_thread(store: &ConfigStore, timeout: Duration) -> std::result::Result<(), WatchError> {
    let (tx, rx) = mpsc::sync_channel(1);
    let worker = store.clone();
    thread::Builder::new()
        .name("layerconf-reload".to_string())
        .spawn(move || {
            let _ = tx.send(reload(&worker));
        })
        .map_err(|e| WatchError::Read(e.into()))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(WatchError::TimedOut(timeout)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(WatchError::Panicked("reload thread exited without a result".to_string()))
        }
    }
}

fn notify(store: &ConfigStore) -> std::result::Result<(), WatchError> {
    let Some(callback) = store.on_change() else {
        return Ok(());
    };
    match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WatchError::Callback(e)),
        Err(payload) => Err(WatchError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Log a loop failure. Every kind is non-fatal.
fn report(error: &WatchError) {
    match error {
        WatchError::Read(ConfigError::Decode(e)) => {
            warn!("Config file could not be decoded, keeping previous settings: {}", e)
        }
        WatchError::Read(e) => warn!("Config reload failed: {}", e),
        WatchError::Stat { path, source } => {
            warn!("Cannot stat config file {}: {}", path.display(), source)
        }
        WatchError::Callback(e) => warn!("Config change callback failed: {}", e),
        WatchError::TimedOut(timeout) => {
            warn!("Config watcher work still running after {:?}, skipping cycle", timeout)
        }
        WatchError::Panicked(msg) => warn!("Config reload panicked: {}", msg),
    }
}
