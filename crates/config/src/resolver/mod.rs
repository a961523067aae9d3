//! Layered property resolution over named configuration documents
//!
//! A lookup consults, in order: a runtime override, the value at a dot-path
//! in one of the loaded documents, and finally a caller supplied default.
//! The first segment of the dot-path picks the document:
//!
//! ```text
//! web.chrome.defaultOptions.args  ->  document "web", path "chrome.defaultOptions.args"
//! browser                         ->  probed in every document, in declaration order
//! ```

mod overrides;

pub use overrides::Overrides;

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::{ConfigDocument, ConfigError, ConfigResult, json_type_name};
use crate::loader::ConfigLoader;

/// Name and relative path of a document the resolver reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    /// Name matched against the first path segment
    pub name: String,
    /// Path handed to the loader
    pub path: PathBuf,
}

impl DocumentSpec {
    /// Create a document spec
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// `web` -> `config/web.json`
    pub fn web() -> Self {
        Self::new("web", "config/web.json")
    }

    /// `run` -> `config/run_config.json`
    pub fn run() -> Self {
        Self::new("run", "config/run_config.json")
    }

    /// `application` -> `config/application.json`
    pub fn application() -> Self {
        Self::new("application", "config/application.json")
    }

    /// The well-known documents in probe order
    pub fn defaults() -> Vec<Self> {
        vec![Self::web(), Self::run(), Self::application()]
    }
}

#[derive(Debug, Clone)]
struct NamedDocument {
    name: String,
    doc: Arc<ConfigDocument>,
}

/// A value found in a document, with the document it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Name of the document holding the value
    pub document: String,
    /// The value itself
    pub value: Value,
}

/// Resolves typed properties from overrides, documents and defaults.
///
/// Getters never fail and never block: they read an atomically swapped
/// snapshot of the loaded documents. [`ConfigResolver::refresh`] replaces the
/// snapshot as a whole.
#[derive(Debug)]
pub struct ConfigResolver {
    specs: Vec<DocumentSpec>,
    documents: ArcSwap<Vec<NamedDocument>>,
    overrides: Overrides,
    lenient: bool,
}

impl ConfigResolver {
    /// Load every document in `specs`; any failure fails the whole load
    pub async fn load(
        loader: &ConfigLoader,
        specs: Vec<DocumentSpec>,
        overrides: Overrides,
    ) -> ConfigResult<Self> {
        let documents = load_documents(loader, &specs, false, &[]).await?;
        Ok(Self::assemble(specs, documents, overrides, false))
    }

    /// Load every document in `specs`, skipping documents that are missing
    /// or invalid. Getters then fall back to overrides and defaults.
    pub async fn load_lenient(
        loader: &ConfigLoader,
        specs: Vec<DocumentSpec>,
        overrides: Overrides,
    ) -> ConfigResult<Self> {
        let documents = load_documents(loader, &specs, true, &[]).await?;
        Ok(Self::assemble(specs, documents, overrides, true))
    }

    /// Build a resolver over documents that are already in memory
    pub fn from_documents<I, N>(documents: I, overrides: Overrides) -> Self
    where
        I: IntoIterator<Item = (N, ConfigDocument)>,
        N: Into<String>,
    {
        let documents: Vec<NamedDocument> = documents
            .into_iter()
            .map(|(name, doc)| NamedDocument {
                name: name.into(),
                doc: Arc::new(doc),
            })
            .collect();
        let specs = documents
            .iter()
            .map(|d| DocumentSpec::new(d.name.clone(), d.doc.requested()))
            .collect();
        Self::assemble(specs, documents, overrides, false)
    }

    fn assemble(
        specs: Vec<DocumentSpec>,
        documents: Vec<NamedDocument>,
        overrides: Overrides,
        lenient: bool,
    ) -> Self {
        Self {
            specs,
            documents: ArcSwap::from_pointee(documents),
            overrides,
            lenient,
        }
    }

    /// Re-read every document through the loader's cache and swap the
    /// snapshot. Unchanged files are served from the cache. On a strict
    /// resolver a failure leaves the current snapshot untouched; a lenient
    /// one keeps the previous copy of any document that fails.
    pub async fn refresh(&self, loader: &ConfigLoader) -> ConfigResult<()> {
        let previous = self.documents.load_full();
        let documents = load_documents(loader, &self.specs, self.lenient, &previous).await?;
        self.documents.store(Arc::new(documents));
        tether_log::debug!(documents = self.specs.len(), "Configuration snapshot refreshed");
        Ok(())
    }

    /// The runtime overrides consulted first by every getter
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// The document registered under `name`
    pub fn document(&self, name: &str) -> Option<Arc<ConfigDocument>> {
        self.documents
            .load()
            .iter()
            .find(|d| d.name == name)
            .map(|d| Arc::clone(&d.doc))
    }

    /// Names of the loaded documents, in probe order
    pub fn document_names(&self) -> Vec<String> {
        self.documents.load().iter().map(|d| d.name.clone()).collect()
    }

    /// Find the value at `path`, or `None` when no document has it.
    ///
    /// Null values count as missing.
    pub fn resolve(&self, path: &str) -> Option<Resolved> {
        let documents = self.documents.load();
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        if let Some(named) = documents.iter().find(|d| d.name == head) {
            return rest
                .and_then(|rest| present(named.doc.query(rest)))
                .or_else(|| present(named.doc.query(path)))
                .map(|value| Resolved {
                    document: named.name.clone(),
                    value: value.clone(),
                });
        }

        documents.iter().find_map(|named| {
            present(named.doc.query(path)).map(|value| Resolved {
                document: named.name.clone(),
                value: value.clone(),
            })
        })
    }

    /// Raw value at `path`
    pub fn get_value(&self, path: &str) -> Option<Value> {
        self.resolve(path).map(|r| r.value)
    }

    /// Whether any document has a value at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// String property. Scalars are rendered as text; an empty
    /// `override_key` skips the override lookup.
    pub fn get_string(&self, override_key: &str, path: &str, default: &str) -> String {
        if let Some(value) = self.override_for(override_key) {
            return value;
        }
        match self.resolve(path) {
            Some(resolved) => match coerce_string(&resolved.value) {
                Some(s) => s,
                None => {
                    warn_malformed(&resolved, path, "string");
                    default.to_string()
                }
            },
            None => default.to_string(),
        }
    }

    /// Integer property. A malformed override falls back to the document
    /// value; a malformed document value falls back to `default`.
    pub fn get_int(&self, override_key: &str, path: &str, default: i64) -> i64 {
        if let Some(raw) = self.override_for(override_key) {
            match raw.trim().parse::<i64>() {
                Ok(value) => return value,
                Err(_) => tether_log::warn!(
                    key = override_key,
                    value = %raw,
                    "Override is not an integer, using configured value"
                ),
            }
        }
        match self.resolve(path) {
            Some(resolved) => coerce_int(&resolved.value).unwrap_or_else(|| {
                warn_malformed(&resolved, path, "integer");
                default
            }),
            None => default,
        }
    }

    /// Boolean property. Accepts `true`/`false` in any case from overrides
    /// and string document values.
    pub fn get_bool(&self, override_key: &str, path: &str, default: bool) -> bool {
        if let Some(raw) = self.override_for(override_key) {
            match parse_bool(&raw) {
                Some(value) => return value,
                None => tether_log::warn!(
                    key = override_key,
                    value = %raw,
                    "Override is not a boolean, using configured value"
                ),
            }
        }
        match self.resolve(path) {
            Some(resolved) => coerce_bool(&resolved.value).unwrap_or_else(|| {
                warn_malformed(&resolved, path, "boolean");
                default
            }),
            None => default,
        }
    }

    /// List-of-strings property. Overrides and string values are split on
    /// commas; sequences must hold scalars.
    pub fn get_list(&self, override_key: &str, path: &str, default: &[&str]) -> Vec<String> {
        if let Some(raw) = self.override_for(override_key) {
            return split_list(&raw);
        }
        let fallback = || default.iter().map(ToString::to_string).collect();
        match self.resolve(path) {
            Some(resolved) => coerce_list(&resolved.value).unwrap_or_else(|| {
                warn_malformed(&resolved, path, "list");
                fallback()
            }),
            None => fallback(),
        }
    }

    /// Deserialize the value at `path`. Missing is `Ok(None)`; a value of the
    /// wrong shape is a [`ConfigError::Type`] naming the document and path.
    pub fn get_typed<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<Option<T>> {
        let Some(resolved) = self.resolve(path) else {
            return Ok(None);
        };
        let actual = json_type_name(&resolved.value);
        T::deserialize(&resolved.value).map(Some).map_err(|e| {
            ConfigError::type_error(
                resolved.document.clone(),
                path,
                std::any::type_name::<T>(),
                format!("{actual} ({e})"),
            )
        })
    }

    fn override_for(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            None
        } else {
            self.overrides.get(key)
        }
    }
}

async fn load_documents(
    loader: &ConfigLoader,
    specs: &[DocumentSpec],
    lenient: bool,
    previous: &[NamedDocument],
) -> ConfigResult<Vec<NamedDocument>> {
    let mut documents = Vec::with_capacity(specs.len());
    for spec in specs {
        match loader.load(&spec.path).await {
            Ok(doc) => documents.push(NamedDocument {
                name: spec.name.clone(),
                doc,
            }),
            Err(e) if lenient && skippable(&e) => {
                tether_log::warn!(
                    document = %spec.name,
                    path = %spec.path.display(),
                    error = %e,
                    "Skipping configuration document"
                );
                if let Some(old) = previous.iter().find(|d| d.name == spec.name) {
                    documents.push(old.clone());
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(documents)
}

fn skippable(error: &ConfigError) -> bool {
    matches!(
        error,
        ConfigError::NotFound { .. } | ConfigError::Invalid { .. }
    )
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn warn_malformed(resolved: &Resolved, path: &str, expected: &str) {
    tether_log::warn!(
        document = %resolved.document,
        path,
        expected,
        actual = json_type_name(&resolved.value),
        "Configuration value has the wrong type, using default"
    );
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn coerce_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(coerce_string).collect(),
        Value::String(s) => Some(split_list(s)),
        _ => None,
    }
}
