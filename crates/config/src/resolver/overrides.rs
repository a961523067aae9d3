//! Runtime string overrides

use std::sync::Arc;

use dashmap::DashMap;

/// Shared, mutable map of runtime overrides.
///
/// Cloning yields another handle onto the same map, so an override set by
/// one holder is seen by every resolver built from it.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: Arc<DashMap<String, String>>,
}

impl Overrides {
    /// Create an empty override map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }

    /// Current value for `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Whether `key` has an override
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no overrides are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every override
    pub fn clear(&self) {
        self.values.clear();
    }

    /// Build overrides from process environment variables starting with
    /// `prefix`; see [`Overrides::from_vars`] for the key mapping
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Build overrides from `(name, value)` pairs.
    ///
    /// `{PREFIX}_REMOTE_URL=x` becomes `remote.url = x`: the prefix and its
    /// separator are stripped, the rest is lowercased and `_` turns into `.`.
    /// Variables without the prefix are ignored.
    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let overrides = Self::new();
        let prefix = format!("{}_", prefix.trim_end_matches('_'));

        for (name, value) in vars {
            let Some(rest) = name.as_ref().strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let key = rest.to_lowercase().replace('_', ".");
            overrides.set(key, value);
        }

        tether_log::debug!(
            prefix = %prefix,
            count = overrides.len(),
            "Collected environment overrides"
        );
        overrides
    }

    /// Build overrides from command-line style arguments.
    ///
    /// Accepts `key=value` and `-Dkey=value`. Anything else is skipped.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let overrides = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let body = arg.strip_prefix("-D").unwrap_or(arg);
            match body.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    overrides.set(key.trim(), value);
                }
                _ => tether_log::trace!(arg, "Ignoring argument without key=value"),
            }
        }
        overrides
    }

    /// Copy every entry of `other` into this map, replacing existing keys
    pub fn merge(&self, other: &Self) {
        for entry in other.values.iter() {
            self.values
                .insert(entry.key().clone(), entry.value().clone());
        }
    }
}
