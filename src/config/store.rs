//! The layered configuration store.
//!
//! Resolves key paths against four layers in fixed precedence order:
//! overrides, bound environment variables, the loaded file, defaults.

use super::env::{self, EnvSource, ProcessEnv};
use super::keypath;
use super::locator;
use super::merge::flatten_layers;
use super::types::{LookupMode, StoreOptions, WatchOptions};
use super::watcher::{self, WatchHandle};
use crate::error::{CallbackError, Result};
use crate::format::Format;
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Callback invoked after every successful watcher-triggered reload.
pub type OnChange = Arc<dyn Fn() -> std::result::Result<(), CallbackError> + Send + Sync>;

/// Everything except the loaded file, guarded by one lock.
#[derive(Debug, Clone)]
struct Layers {
    key_delimiter: String,
    search_paths: Vec<PathBuf>,
    name: String,
    explicit_type: Option<String>,
    env_prefix: Option<String>,
    env_bindings: HashMap<String, String>,
    lookup_mode: LookupMode,
    overrides: Map<String, Value>,
    defaults: Map<String, Value>,
    config_file: Option<PathBuf>,
}

impl Layers {
    fn from_options(options: StoreOptions) -> Self {
        Self {
            key_delimiter: options.key_delimiter,
            search_paths: options.search_paths,
            name: options.name,
            explicit_type: options.file_type,
            env_prefix: options.env_prefix,
            env_bindings: HashMap::new(),
            lookup_mode: options.lookup_mode,
            overrides: Map::new(),
            defaults: Map::new(),
            config_file: None,
        }
    }
}

struct StoreInner {
    /// Construction options, restored by `reset()`.
    options: StoreOptions,
    layers: RwLock<Layers>,
    /// Swapped wholesale by `read()` so readers never see a half-built tree.
    loaded: ArcSwap<Value>,
    /// Serializes `read()` and `reset()`.
    read_lock: Mutex<()>,
    env: Box<dyn EnvSource>,
    on_change: RwLock<Option<OnChange>>,
}

/// A layered configuration store.
///
/// Cloning is cheap and yields another handle to the same store, which is
/// how the watcher shares it with the caller.
///
/// # Example
/// ```no_run
/// use layerconf::ConfigStore;
///
/// let store = ConfigStore::new();
/// store.add_path("/etc/myapp");
/// store.set_default("server.port", 8080).unwrap();
/// store.read().unwrap();
///
/// let port = store.get("server.port");
/// ```
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("layers", &*self.inner.layers.read())
            .field("loaded", &**self.inner.loaded.load())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Create a store with default settings reading the process environment.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self::with_env_source(options, ProcessEnv)
    }

    /// Create a store that resolves env bindings through `env` instead of
    /// the process environment.
    pub fn with_env_source(options: StoreOptions, env: impl EnvSource + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                layers: RwLock::new(Layers::from_options(options.clone())),
                options,
                loaded: ArcSwap::from_pointee(Value::Object(Map::new())),
                read_lock: Mutex::new(()),
                env: Box::new(env),
                on_change: RwLock::new(None),
            }),
        }
    }

    // Source configuration

    /// Prepend a search directory; the newest path is searched first.
    pub fn add_path(&self, path: impl Into<PathBuf>) {
        self.inner.layers.write().search_paths.insert(0, path.into());
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.layers.write().name = name.into();
    }

    /// Force the file format. Unsupported names are accepted here and
    /// rejected by `read()`.
    pub fn set_type(&self, file_type: impl Into<String>) {
        self.inner.layers.write().explicit_type = Some(file_type.into());
    }

    /// Go back to inferring the format from the file extension.
    pub fn clear_type(&self) {
        self.inner.layers.write().explicit_type = None;
    }

    pub fn set_key_delimiter(&self, delimiter: impl Into<String>) {
        self.inner.layers.write().key_delimiter = delimiter.into();
    }

    pub fn set_lookup_mode(&self, mode: LookupMode) {
        self.inner.layers.write().lookup_mode = mode;
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.inner.layers.read().search_paths.clone()
    }

    pub fn name(&self) -> String {
        self.inner.layers.read().name.clone()
    }

    pub fn lookup_mode(&self) -> LookupMode {
        self.inner.layers.read().lookup_mode
    }

    /// Path of the file behind the current loaded layer, if any.
    pub fn config_file_used(&self) -> Option<PathBuf> {
        self.inner.layers.read().config_file.clone()
    }

    // Environment bindings

    /// Bind a single-segment key to the env var of the same name.
    pub fn bind_env(&self, key: impl Into<String>) {
        let key = key.into();
        self.inner.layers.write().env_bindings.insert(key.clone(), key);
    }

    /// Bind a single-segment key to an explicitly named env var.
    pub fn bind_env_as(&self, key: impl Into<String>, env_var: impl Into<String>) {
        self.inner
            .layers
            .write()
            .env_bindings
            .insert(key.into(), env_var.into());
    }

    /// Set the prefix applied to bound env var names at lookup time.
    pub fn set_env_prefix(&self, prefix: impl Into<String>) {
        self.inner.layers.write().env_prefix = Some(prefix.into());
    }

    // File discovery and reading

    /// Find the config file across search paths and supported extensions.
    pub fn locate(&self) -> Result<PathBuf> {
        let layers = self.inner.layers.read();
        locator::locate(&layers.search_paths, &layers.name)
    }

    /// The format `read()` would decode with.
    pub fn resolve_type(&self) -> Result<Format> {
        let layers = self.inner.layers.read();
        let path = locator::locate(&layers.search_paths, &layers.name)?;
        locator::resolve_type(layers.explicit_type.as_deref(), &path)
    }

    /// Locate, decode and install the config file as the loaded layer.
    ///
    /// The previous loaded layer is replaced wholesale; on any error it is
    /// left untouched. Decoder and filesystem errors are returned as-is.
    pub fn read(&self) -> Result<()> {
        let _serialized = self.inner.read_lock.lock();

        let (path, format) = {
            let layers = self.inner.layers.read();
            let path = locator::locate(&layers.search_paths, &layers.name)?;
            let format = locator::resolve_type(layers.explicit_type.as_deref(), &path)?;
            (path, format)
        };
        debug!("read {} config file {}", format, path.display());

        let bytes = std::fs::read(&path)?;
        let tree = format.decode(&bytes)?;

        self.inner.loaded.store(Arc::new(tree));
        self.inner.layers.write().config_file = Some(path);
        Ok(())
    }

    /// Snapshot of the loaded layer.
    pub fn loaded(&self) -> Arc<Value> {
        self.inner.loaded.load_full()
    }

    // Resolution

    /// Resolve `key` through overrides, bound env, loaded file, defaults.
    ///
    /// In the default [`LookupMode::Truthy`] mode a stored falsy value
    /// (`0`, `""`, `false`, `{}`, `[]`) is indistinguishable from a missing
    /// one and falls through to the next layer.
    pub fn get(&self, key: &str) -> Option<Value> {
        let layers = self.inner.layers.read();
        let segments = keypath::split(key, &layers.key_delimiter);
        let mode = layers.lookup_mode;

        let value = keypath::lookup_map(&layers.overrides, &segments, mode);
        debug!("get {:?} from overrides: {:?}", segments, value);
        if let Some(value) = value {
            return Some(value.clone());
        }

        if segments.len() == 1
            && let Some(value) = self.env_value(&layers, key)
        {
            return Some(value);
        }

        let loaded = self.inner.loaded.load();
        let value = keypath::lookup(&loaded, &segments, mode);
        debug!("get {:?} from config: {:?}", segments, value);
        if let Some(value) = value {
            return Some(value.clone());
        }

        let value = keypath::lookup_map(&layers.defaults, &segments, mode);
        debug!("get {:?} from defaults: {:?}", segments, value);
        value.cloned()
    }

    /// True when `get(key)` would return a value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Env value for a bound single-segment key, if it counts as present.
    fn env_value(&self, layers: &Layers, key: &str) -> Option<Value> {
        let bound = layers.env_bindings.get(key)?;
        let var = env::qualified_name(layers.env_prefix.as_deref(), bound);
        let value = self.inner.env.var(&var);
        debug!("get {} from env {}: {:?}", key, var, value);
        match (value, layers.lookup_mode) {
            (Some(value), LookupMode::Present) => Some(Value::String(value)),
            (Some(value), LookupMode::Truthy) if !value.is_empty() => Some(Value::String(value)),
            _ => None,
        }
    }

    /// All layers flattened into one tree, highest precedence winning.
    ///
    /// Falsy values are kept here; only `get` applies the lookup mode.
    pub fn all_settings(&self) -> Value {
        let layers = self.inner.layers.read();
        let mut env_layer = Map::new();
        for key in layers.env_bindings.keys() {
            if keypath::split(key, &layers.key_delimiter).len() == 1
                && let Some(value) = self.env_value(&layers, key)
            {
                env_layer.insert(key.clone(), value);
            }
        }

        flatten_layers([
            Value::Object(layers.defaults.clone()),
            (**self.inner.loaded.load()).clone(),
            Value::Object(env_layer),
            Value::Object(layers.overrides.clone()),
        ])
    }

    // Writes

    /// Write `value` into the override layer.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut layers = self.inner.layers.write();
        let segments = keypath::split(key, &layers.key_delimiter);
        keypath::write(&mut layers.overrides, key, &segments, value.into())
    }

    /// Write `value` into the default layer.
    pub fn set_default(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut layers = self.inner.layers.write();
        let segments = keypath::split(key, &layers.key_delimiter);
        keypath::write(&mut layers.defaults, key, &segments, value.into())
    }

    /// Restore every setting and layer to the state the store was
    /// constructed in: the construction options come back, while bindings,
    /// overrides, defaults and the loaded file are dropped.
    ///
    /// A registered change callback survives the reset.
    pub fn reset(&self) {
        let _serialized = self.inner.read_lock.lock();
        *self.inner.layers.write() = Layers::from_options(self.inner.options.clone());
        self.inner.loaded.store(Arc::new(Value::Object(Map::new())));
    }

    // Change notification

    /// Register the callback fired after each watcher-triggered reload.
    pub fn set_on_change<F>(&self, on_change: F)
    where
        F: Fn() -> std::result::Result<(), CallbackError> + Send + Sync + 'static,
    {
        *self.inner.on_change.write() = Some(Arc::new(on_change));
    }

    pub fn clear_on_change(&self) {
        *self.inner.on_change.write() = None;
    }

    pub(crate) fn on_change(&self) -> Option<OnChange> {
        self.inner.on_change.read().clone()
    }

    /// Register `on_change` and start polling the config file for changes.
    ///
    /// The returned handle stops the watcher when dropped.
    pub fn watch_config<F>(&self, on_change: F, options: WatchOptions) -> Result<WatchHandle>
    where
        F: Fn() -> std::result::Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.set_on_change(on_change);
        self.watch(options)
    }

    /// Start polling with whatever callback is currently registered.
    pub fn watch(&self, options: WatchOptions) -> Result<WatchHandle> {
        watcher::start(self.clone(), options)
    }
}
