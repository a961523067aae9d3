//! Ready-made configurations for local runs, CI harnesses and tests

use super::{Config, DisplayConfig, Format, WriterConfig};

/// Filter used by the debug-oriented presets: chatty tether crates, quiet
/// dependencies.
const TETHER_DEBUG_FILTER: &str = "info,tether_config=debug,tether_resource=debug";

impl Config {
    /// Read the configuration from the environment.
    ///
    /// `TETHER_LOG` wins over `RUST_LOG` for the filter; `TETHER_LOG_FORMAT`
    /// selects the format and the `TETHER_LOG_*` toggles adjust display.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = ["TETHER_LOG", "RUST_LOG"]
            .iter()
            .find_map(|name| std::env::var(name).ok())
        {
            config.level = level;
        }
        if let Ok(format) = std::env::var("TETHER_LOG_FORMAT") {
            config.format = Format::parse_lossy(&format);
        }
        config.display.parse_env();
        config
    }

    /// Local runs: pretty output with source locations
    #[must_use]
    pub fn development() -> Self {
        let display = DisplayConfig {
            source: true,
            ..DisplayConfig::default()
        };
        Self {
            level: TETHER_DEBUG_FILTER.to_string(),
            format: Format::Pretty,
            display,
            ..Self::default()
        }
    }

    /// Harness runs collected by CI: flattened JSON on stdout
    #[must_use]
    pub fn production() -> Self {
        let display = DisplayConfig {
            colors: false,
            thread_names: false,
            flatten: true,
            ..DisplayConfig::default()
        };
        Self {
            format: Format::Json,
            writer: WriterConfig::Stdout,
            display,
            ..Self::default()
        }
    }

    /// Unit and integration tests: output goes through libtest capture
    #[must_use]
    pub fn test() -> Self {
        let display = DisplayConfig {
            time: false,
            colors: false,
            thread_names: false,
            ..DisplayConfig::default()
        };
        Self {
            level: TETHER_DEBUG_FILTER.to_string(),
            writer: WriterConfig::Test,
            display,
            ..Self::default()
        }
    }
}
