//! Runtime filter changes

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing_subscriber::{EnvFilter, Registry, layer::Layer, reload};

use crate::config::Level;
use crate::error::{LogError, LogResult};

type BoxedFilter = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Parse a directive string into an [`EnvFilter`]
pub(super) fn parse_filter(directives: &str) -> LogResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| LogError::Filter(format!("{directives}: {e}")))
}

/// Swaps the installed level filter while the process runs.
///
/// Cloning is cheap; every clone drives the same filter.
#[derive(Clone)]
pub struct ReloadHandle {
    inner: reload::Handle<EnvFilter, Registry>,
    directives: Arc<ArcSwap<String>>,
}

impl ReloadHandle {
    /// Replace the filter with `directives`.
    ///
    /// The previous filter stays active when `directives` does not parse.
    ///
    /// # Errors
    /// [`LogError::Filter`] for bad directives, [`LogError::Config`] when the
    /// subscriber holding the filter is gone.
    pub fn reload(&self, directives: &str) -> LogResult<()> {
        let filter = parse_filter(directives)?;
        self.inner
            .reload(filter)
            .map_err(|e| LogError::Config(format!("filter reload rejected: {e}")))?;
        self.directives.store(Arc::new(directives.to_owned()));
        Ok(())
    }

    /// Replace the filter with a single global level
    ///
    /// # Errors
    /// See [`reload`](Self::reload).
    pub fn set_level(&self, level: Level) -> LogResult<()> {
        self.reload(&level.to_string())
    }

    /// Directives currently in effect
    pub fn current_filter(&self) -> Arc<String> {
        self.directives.load_full()
    }
}

impl std::fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReloadHandle")
            .field(&self.directives.load().as_str())
            .finish()
    }
}

/// The filter layer to install, plus a handle when it may change later
pub(super) fn filter_layer(
    directives: &str,
    reloadable: bool,
) -> LogResult<(BoxedFilter, Option<ReloadHandle>)> {
    let filter = parse_filter(directives)?;
    if !reloadable {
        return Ok((Box::new(filter), None));
    }
    let (layer, inner) = reload::Layer::new(filter);
    let handle = ReloadHandle {
        inner,
        directives: Arc::new(ArcSwap::from_pointee(directives.to_owned())),
    };
    Ok((Box::new(layer), Some(handle)))
}
