//! # Tether Log
//!
//! Logging setup shared by the tether crates.
//!
//! Library crates only emit events through the re-exported `tracing`
//! macros; binaries and test harnesses pick a subscriber with one of the
//! `init*` functions below.
//!
//! ```rust,no_run
//! fn main() -> tether_log::LogResult<()> {
//!     let _guard = tether_log::auto_init()?;
//!     tether_log::info!(workers = 4, "harness starting");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod builder;
mod config;
mod error;

// Public API
pub use builder::{LoggerBuilder, LoggerGuard, ReloadHandle};
pub use config::{Config, DisplayConfig, Format, Level, WriterConfig};
pub use error::{LogError, LogResult};

// Re-export tracing macros
pub use tracing::{Span, debug, error, field, info, instrument, span, trace, warn};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{LogResult, auto_init, debug, error, info, init, init_with, trace, warn};
}

// ============================================================================
// Initialization Functions
// ============================================================================

/// Pick a configuration from the environment and build type.
///
/// `TETHER_LOG` or `RUST_LOG` in the environment selects [`Config::from_env`];
/// otherwise debug builds get [`Config::development`] and release builds
/// [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    if std::env::var("TETHER_LOG").is_ok() || std::env::var("RUST_LOG").is_ok() {
        init_with(Config::from_env())
    } else if cfg!(debug_assertions) {
        init_with(Config::development())
    } else {
        init_with(Config::production())
    }
}

/// Initialize with default configuration
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

/// Initialize for tests.
///
/// Safe to call from every test: once a global subscriber exists the call
/// returns a no-op guard instead of failing.
pub fn init_test() -> LogResult<LoggerGuard> {
    if tracing::dispatcher::has_been_set() {
        return Ok(LoggerGuard::noop());
    }
    match init_with(Config::test()) {
        // Another test thread won the race.
        Err(LogError::Init(_)) => Ok(LoggerGuard::noop()),
        other => other,
    }
}
