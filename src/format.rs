//! Config file formats and their decoders.

use crate::error::{ConfigError, DecodeError};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Extensions probed by the file locator, in search order.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["json", "yaml"];

/// A decodable config file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Match a type name against the supported set. Matching is exact, like
    /// the extension probe: `"yml"` and `"JSON"` are not supported.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Format::Json),
            "yaml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Like [`Format::from_name`], but fails with `UnsupportedFormat`.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::from_name(name).ok_or_else(|| ConfigError::UnsupportedFormat(name.to_string()))
    }

    /// The type name implied by a path's extension, if it has one.
    pub fn name_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|ext| ext.to_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    /// Decode raw file bytes into a tree.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        match self {
            Format::Json => Ok(serde_json::from_slice(bytes)?),
            Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
