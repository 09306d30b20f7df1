//! Key path navigation over nested `serde_json::Value` trees.
//!
//! A key path is a delimiter-separated string (`"host.port"`) addressing a
//! position in a tree of nested maps. Lookups walk one segment at a time;
//! writes create missing intermediate maps but refuse to descend through
//! anything that is not a map.

use super::types::LookupMode;
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};

/// Split a key into segments. An empty delimiter disables splitting.
pub fn split<'a>(key: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return vec![key];
    }
    key.split(delimiter).collect()
}

/// Returns false for values the legacy lookup treats as missing:
/// null, `false`, numeric zero, and empty strings, arrays or maps.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Whether a found value counts as present under the given mode.
pub fn counts_as_present(value: &Value, mode: LookupMode) -> bool {
    match mode {
        LookupMode::Truthy => is_truthy(value),
        LookupMode::Present => !value.is_null(),
    }
}

/// Walk `tree` along `segments`.
///
/// Stops and reports `None` on a missing segment, on a non-map node that
/// still has segments to apply, or on any intermediate or final value that
/// does not count as present under `mode`.
pub fn lookup<'a>(tree: &'a Value, segments: &[&str], mode: LookupMode) -> Option<&'a Value> {
    lookup_map(tree.as_object()?, segments, mode)
}

/// [`lookup`] starting from a map root.
pub fn lookup_map<'a>(
    root: &'a Map<String, Value>,
    segments: &[&str],
    mode: LookupMode,
) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(*first)?;
    if !counts_as_present(node, mode) {
        return None;
    }
    for segment in rest {
        node = node.as_object()?.get(*segment)?;
        if !counts_as_present(node, mode) {
            return None;
        }
    }
    Some(node)
}

/// Write `value` at `segments`, creating empty maps for missing intermediates.
///
/// The last segment is overwritten unconditionally, replacing any subtree
/// that was there. `key` is only used for the error message.
pub fn write(
    tree: &mut Map<String, Value>,
    key: &str,
    segments: &[&str],
    value: Value,
) -> Result<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut node = tree;
    for segment in parents {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        node = match child {
            Value::Object(map) => map,
            _ => return Err(ConfigError::invalid_write_path(key, segment)),
        };
    }
    node.insert(last.to_string(), value);
    Ok(())
}
