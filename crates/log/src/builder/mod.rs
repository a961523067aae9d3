//! Logger builder implementation

mod reload;

pub use reload::ReloadHandle;

use tracing_subscriber::{
    Registry,
    fmt::{TestWriter, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{Config, Format, WriterConfig};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger alive
///
/// Holds the reload handle when the filter was built reloadable.
#[derive(Debug)]
pub struct LoggerGuard {
    reload_handle: Option<ReloadHandle>,
}

/// Apply the shared display options to a fmt layer and install it on top of
/// `$registry`. Timestamps change the layer type, so both branches install.
macro_rules! try_init_fmt {
    ($registry:expr, $layer:expr, $display:expr) => {{
        let layer = $layer
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids)
            .with_thread_names($display.thread_names);
        if $display.time {
            $registry.with(layer).try_init()
        } else {
            $registry.with(layer.without_time()).try_init()
        }
    }};
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let (filter_layer, reload_handle) =
            reload::filter_layer(&self.config.level, self.config.reloadable)?;

        let writer = match self.config.writer {
            WriterConfig::Stderr => BoxMakeWriter::new(std::io::stderr),
            WriterConfig::Stdout => BoxMakeWriter::new(std::io::stdout),
            WriterConfig::Test => BoxMakeWriter::new(TestWriter::new()),
        };

        let registry = Registry::default().with(filter_layer);
        let display = &self.config.display;

        let installed = match self.config.format {
            Format::Pretty => try_init_fmt!(
                registry,
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(writer),
                display
            ),
            Format::Compact => try_init_fmt!(
                registry,
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(writer),
                display
            ),
            Format::Json => try_init_fmt!(
                registry,
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .flatten_event(display.flatten)
                    .with_writer(writer),
                display
            ),
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        Ok(LoggerGuard { reload_handle })
    }
}

impl LoggerGuard {
    pub(crate) fn noop() -> Self {
        Self {
            reload_handle: None,
        }
    }

    /// Handle for changing the level filter at runtime, if the logger was
    /// built with `reloadable = true`
    pub fn reload_handle(&self) -> Option<&ReloadHandle> {
        self.reload_handle.as_ref()
    }
}
