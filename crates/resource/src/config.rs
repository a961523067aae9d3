//! Registry settings

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_config::ConfigResolver;

use crate::monitor::MonitorConfig;

/// Settings for [`ResourceRegistry`](crate::ResourceRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Health monitor settings
    pub monitor: MonitorConfig,
    /// How long `release_all` waits for the monitor before aborting it
    pub shutdown_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Read `application.resources.*`, keeping defaults for anything absent.
    ///
    /// Zero or negative values are ignored.
    pub fn from_resolver(resolver: &ConfigResolver) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            let path = format!("application.resources.{name}");
            let fallback = i64::try_from(default.as_secs()).unwrap_or(i64::MAX);
            match u64::try_from(resolver.get_int(name, &path, fallback)) {
                Ok(0) | Err(_) => default,
                Ok(secs) => Duration::from_secs(secs),
            }
        };

        Self {
            monitor: MonitorConfig {
                interval: secs("monitorIntervalSecs", defaults.monitor.interval),
                max_age: secs("maxAgeSecs", defaults.monitor.max_age),
                probe_timeout: secs("probeTimeoutSecs", defaults.monitor.probe_timeout),
            },
            shutdown_timeout: secs("shutdownTimeoutSecs", defaults.shutdown_timeout),
        }
    }

    /// Replace the monitor settings
    #[must_use]
    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Replace the shutdown timeout
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
