//! Configuration tree loader with search-path resolution and mtime caching

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::core::{ConfigDocument, ConfigError, ConfigResult};

/// Ordered list of locations a requested path is resolved against.
///
/// Candidates are tried as: the primary resource root, each fallback prefix
/// in order, then the path itself.
#[derive(Debug, Clone)]
pub struct SearchPath {
    primary: PathBuf,
    fallbacks: Vec<PathBuf>,
}

impl Default for SearchPath {
    fn default() -> Self {
        Self {
            primary: PathBuf::from("resources"),
            fallbacks: vec![PathBuf::from("assets"), PathBuf::from("../resources")],
        }
    }
}

impl SearchPath {
    /// Create a search path with a primary root and no fallbacks
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
        }
    }

    /// Append a fallback directory prefix
    #[must_use = "builder methods must be chained or built"]
    pub fn with_fallback(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.fallbacks.push(prefix.into());
        self
    }

    /// Append several fallback prefixes, preserving order
    #[must_use = "builder methods must be chained or built"]
    pub fn with_fallbacks<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.fallbacks.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Primary resource root
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Fallback prefixes in search order
    pub fn fallbacks(&self) -> &[PathBuf] {
        &self.fallbacks
    }

    /// Every location `path` resolves to, in search order, without duplicates
    pub fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::with_capacity(self.fallbacks.len() + 2);
        let roots = std::iter::once(&self.primary).chain(self.fallbacks.iter());
        for candidate in roots
            .map(|root| root.join(path))
            .chain(std::iter::once(path.to_path_buf()))
        {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}

/// Loads named configuration documents and caches them by requested path.
///
/// A cached document is served until its source file's modification time
/// moves past the one recorded at load, at which point the next `load`
/// transparently reads it again. Concurrent loads of the same path may race;
/// the last successful load wins and readers always see a whole document.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    search: SearchPath,
    cache: DashMap<PathBuf, Arc<ConfigDocument>>,
}

impl ConfigLoader {
    /// Create a loader over the given search path
    pub fn new(search: SearchPath) -> Self {
        Self {
            search,
            cache: DashMap::new(),
        }
    }

    /// The search path used to resolve requests
    pub fn search_path(&self) -> &SearchPath {
        &self.search
    }

    /// Load a document, serving the cached copy while it is fresh
    pub async fn load(&self, path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigDocument>> {
        let requested = path.as_ref();

        // Clone the Arc out so the shard lock is released before awaiting.
        let cached = self
            .cache
            .get(requested)
            .map(|entry| Arc::clone(entry.value()));

        if let Some(doc) = cached {
            if !is_outdated(&doc).await {
                tether_log::trace!(path = %requested.display(), "Configuration cache hit");
                return Ok(doc);
            }
            tether_log::debug!(
                path = %requested.display(),
                source = %doc.source().display(),
                "Configuration changed on disk, reloading"
            );
            // Only drop the entry we judged stale; a concurrent load may
            // already have replaced it.
            self.cache
                .remove_if(requested, |_, current| Arc::ptr_eq(current, &doc));
        }

        self.load_fresh(requested).await
    }

    /// Evict the cached entry and load again regardless of file times
    pub async fn reload(&self, path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigDocument>> {
        let requested = path.as_ref();
        self.cache.remove(requested);
        self.load_fresh(requested).await
    }

    /// Drop the cached entry for `path`, if any
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        self.cache.remove(path.as_ref()).is_some()
    }

    /// Drop every cached entry
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Whether `path` currently has a cached document
    pub fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        self.cache.contains_key(path.as_ref())
    }

    /// Requested paths with cached documents
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.cache.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn load_fresh(&self, requested: &Path) -> ConfigResult<Arc<ConfigDocument>> {
        let (source, content, modified) = self.read_first_hit(requested).await?;
        let doc = Arc::new(ConfigDocument::parse(
            requested, &source, &content, modified,
        )?);

        self.cache.insert(requested.to_path_buf(), Arc::clone(&doc));
        tether_log::debug!(
            path = %requested.display(),
            source = %source.display(),
            "Loaded configuration document"
        );
        Ok(doc)
    }

    /// Read the first candidate with readable content; later candidates are
    /// not touched once one succeeds. When nothing is readable the last I/O
    /// failure wins over a plain not-found.
    async fn read_first_hit(
        &self,
        requested: &Path,
    ) -> ConfigResult<(PathBuf, String, Option<SystemTime>)> {
        let candidates = self.search.candidates(requested);
        let mut unreadable = None;

        for candidate in &candidates {
            // Stat before reading: a write landing in between then shows up
            // as a newer mtime on the next load instead of being missed.
            let modified = tokio::fs::metadata(candidate)
                .await
                .ok()
                .and_then(|m| m.modified().ok());

            match tokio::fs::read_to_string(candidate).await {
                Ok(content) => return Ok((candidate.clone(), content, modified)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tether_log::trace!(candidate = %candidate.display(), "Not found");
                }
                Err(e) => {
                    tether_log::warn!(
                        candidate = %candidate.display(),
                        error = %e,
                        "Unreadable configuration candidate, trying next"
                    );
                    unreadable = Some(ConfigError::read(candidate, &e));
                }
            }
        }

        Err(unreadable.unwrap_or_else(|| ConfigError::not_found(requested, candidates)))
    }
}

/// True when the source file's mtime is strictly newer than the one recorded
/// at load. A file that can no longer be stat'ed keeps its cached document.
async fn is_outdated(doc: &ConfigDocument) -> bool {
    let Some(recorded) = doc.modified() else {
        return false;
    };
    match tokio::fs::metadata(doc.source()).await {
        Ok(meta) => meta.modified().is_ok_and(|current| current > recorded),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidates_follow_search_order() {
        let search = SearchPath::new("res").with_fallbacks(["fb1", "fb2"]);
        let candidates = search.candidates(Path::new("config/web.json"));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("res/config/web.json"),
                PathBuf::from("fb1/config/web.json"),
                PathBuf::from("fb2/config/web.json"),
                PathBuf::from("config/web.json"),
            ]
        );
    }

    #[test]
    fn absolute_paths_are_not_repeated() {
        let search = SearchPath::new("res").with_fallback("fb");
        let abs = std::env::temp_dir().join("web.json");
        assert_eq!(search.candidates(&abs), vec![abs.clone()]);
    }

    #[test]
    fn default_search_path_has_fallbacks() {
        let search = SearchPath::default();
        assert_eq!(search.primary(), Path::new("resources"));
        assert_eq!(search.fallbacks().len(), 2);
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(SearchPath::new(dir.path().join("primary")));
        let err = loader
            .load(dir.path().join("nope").join("web.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "got: {err:?}");
        assert!(!loader.is_cached(dir.path().join("nope").join("web.json")));
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/app.json"), r#"{"name": "x"}"#).unwrap();

        let loader = ConfigLoader::new(SearchPath::new(dir.path()));
        loader.load("config/app.json").await.unwrap();
        assert_eq!(loader.cached_paths(), vec![PathBuf::from("config/app.json")]);

        assert!(loader.invalidate("config/app.json"));
        assert!(!loader.invalidate("config/app.json"));

        loader.load("config/app.json").await.unwrap();
        loader.clear_cache();
        assert!(loader.cached_paths().is_empty());
    }
}
