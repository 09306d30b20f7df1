//! Environment variable access for env-bound keys.

use std::collections::HashMap;

/// Source of environment variable values.
pub trait EnvSource: Send + Sync {
    /// Value of `name`, or `None` when unset or not valid unicode.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed variable table, for embedding a store in a sandboxed environment.
impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Resolve the variable name for a binding: the prefix is applied here, at
/// lookup time, never when the binding is recorded.
pub fn qualified_name(prefix: Option<&str>, bound: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}{bound}"),
        _ => bound.to_string(),
    }
}
