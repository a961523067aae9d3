//! Immutable parsed configuration documents

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{ConfigError, ConfigResult};

/// An immutable parsed configuration tree.
///
/// Documents are created by the loader on a successful read and replaced
/// wholesale when the cache entry is invalidated; they are shared as
/// `Arc<ConfigDocument>` and never mutated in place.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// Path the caller asked for (the cache key)
    requested: PathBuf,
    /// File the content was actually read from
    source: PathBuf,
    /// Parsed tree, always a non-empty JSON object
    root: Value,
    /// When the document was loaded
    loaded_at: DateTime<Utc>,
    /// Modification time of `source` observed just before reading it
    modified: Option<SystemTime>,
}

impl ConfigDocument {
    /// Parse and validate JSON text read from `source`.
    ///
    /// Fails with [`ConfigError::Invalid`] when the text is blank, malformed,
    /// or does not have a non-empty object at its root.
    pub fn parse(
        requested: impl Into<PathBuf>,
        source: impl Into<PathBuf>,
        content: &str,
        modified: Option<SystemTime>,
    ) -> ConfigResult<Self> {
        let source = source.into();
        if content.trim().is_empty() {
            return Err(ConfigError::invalid(&source, "document is empty"));
        }
        let root: Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid(&source, format!("JSON parse error: {e}")))?;
        Self::from_parts(requested.into(), source, root, modified)
    }

    /// Build a document from an already parsed value, applying the same
    /// validation as [`ConfigDocument::parse`]
    pub fn from_value(source: impl Into<PathBuf>, root: Value) -> ConfigResult<Self> {
        let source = source.into();
        Self::from_parts(source.clone(), source, root, None)
    }

    fn from_parts(
        requested: PathBuf,
        source: PathBuf,
        root: Value,
        modified: Option<SystemTime>,
    ) -> ConfigResult<Self> {
        match &root {
            Value::Null => return Err(ConfigError::invalid(&source, "document has no root")),
            Value::Object(map) if map.is_empty() => {
                return Err(ConfigError::invalid(&source, "document is empty"));
            }
            Value::Object(_) => {}
            other => {
                return Err(ConfigError::invalid(
                    &source,
                    format!("document root must be an object, found {}", json_type_name(other)),
                ));
            }
        }

        Ok(Self {
            requested,
            source,
            root,
            loaded_at: Utc::now(),
            modified,
        })
    }

    /// Resolve a dot-separated path.
    ///
    /// Returns `None` for any segment that does not resolve; numeric
    /// segments index into arrays. An empty path yields the root.
    pub fn query(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    /// Check whether `path` resolves to a non-null value
    pub fn contains(&self, path: &str) -> bool {
        self.query(path).is_some_and(|v| !v.is_null())
    }

    /// The whole tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Path the document was requested under
    pub fn requested(&self) -> &Path {
        &self.requested
    }

    /// File the document was read from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// When the document was loaded
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Modification time recorded at load, if the platform reports one
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Walk `value` along a dot-separated path without allocating
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Get human-readable type name for a JSON value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
