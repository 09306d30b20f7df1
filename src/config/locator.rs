//! Config file discovery across ordered search directories.
//!
//! Each directory is probed for `<name>.<ext>` for every supported extension
//! in fixed order; the first existing candidate wins. Format detection is
//! deliberately separate so that an explicitly forced, unsupported type is
//! only rejected when the file is actually read.

use crate::error::{ConfigError, Result};
use crate::format::{Format, SUPPORTED_EXTENSIONS};
use std::path::{Path, PathBuf};

/// Candidate paths for `name` in `dir`, in probe order.
pub fn candidates(dir: &Path, name: &str) -> impl Iterator<Item = PathBuf> {
    let dir = dir.to_path_buf();
    let name = name.to_string();
    SUPPORTED_EXTENSIONS
        .into_iter()
        .map(move |ext| dir.join(format!("{name}.{ext}")))
}

/// First existing candidate across `search_paths`, in order.
pub fn locate(search_paths: &[PathBuf], name: &str) -> Result<PathBuf> {
    search_paths
        .iter()
        .flat_map(|dir| candidates(dir, name))
        .find(|path| path.exists())
        .ok_or_else(|| ConfigError::FileNotFound {
            name: name.to_string(),
            paths: search_paths.to_vec(),
        })
}

/// Resolve the format to decode with.
///
/// An explicit type always wins, whatever the located file's extension is.
pub fn resolve_type(explicit: Option<&str>, located: &Path) -> Result<Format> {
    let name = match explicit {
        Some(name) => name,
        None => Format::name_from_path(located).unwrap_or_default(),
    };
    Format::parse(name)
}
