//! Background health monitoring for registered resources
//!
//! The monitor runs on a fixed period. Each run:
//! 1. flags resources older than [`MonitorConfig::max_age`] as stale,
//! 2. releases the stale ones through the registry,
//! 3. probes connections, marking and releasing any that fail.
//!
//! It only holds a `Weak` reference to the registry and never closes handles
//! itself. Every release is conditional on the entry id seen in the snapshot,
//! so a handle re-registered under the same key mid-run is left alone.

use std::panic::AssertUnwindSafe;
use std::sync::Weak;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::handle::Handle;
use crate::registry::{ManagedResource, ResourceRegistry};
use crate::state::ResourceState;

/// Health monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Period between runs
    pub interval: Duration,
    /// Age after which a resource is stale
    pub max_age: Duration,
    /// Upper bound on a single liveness probe
    pub probe_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_age: Duration::from_secs(30 * 60),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of a single monitor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    /// Resources flagged stale and released
    pub stale: usize,
    /// Resources that failed their probe and were released
    pub invalid: usize,
    /// Probes attempted
    pub probed: usize,
}

impl MonitorReport {
    /// Whether the run evicted anything
    pub fn evicted_any(&self) -> bool {
        self.stale > 0 || self.invalid > 0
    }
}

/// Periodic stale/liveness sweep over a registry
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    registry: Weak<ResourceRegistry>,
    config: MonitorConfig,
}

impl HealthMonitor {
    /// Create a monitor over `registry`.
    ///
    /// A zero `interval` is replaced with the default period.
    pub fn new(registry: Weak<ResourceRegistry>, mut config: MonitorConfig) -> Self {
        if config.interval.is_zero() {
            let fallback = MonitorConfig::default().interval;
            tether_log::warn!(
                fallback_secs = fallback.as_secs(),
                "Zero monitor interval, using default"
            );
            config.interval = fallback;
        }
        Self { registry, config }
    }

    /// The monitor's settings
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Perform one sweep. A dropped registry yields an empty report.
    pub async fn run_once(&self) -> MonitorReport {
        let mut report = MonitorReport::default();
        let Some(registry) = self.registry.upgrade() else {
            return report;
        };

        let snapshot = registry.snapshot();
        let (stale, fresh): (Vec<ManagedResource>, Vec<ManagedResource>) = snapshot
            .into_iter()
            .partition(|r| r.age() > self.config.max_age);

        let mut condemned = Vec::with_capacity(stale.len());
        for resource in stale {
            if registry.mark_if_current(resource.key(), resource.id(), ResourceState::Stale) {
                tether_log::warn!(
                    key = resource.key(),
                    type_tag = resource.type_tag(),
                    age_secs = resource.age().as_secs(),
                    "Resource exceeded max age"
                );
                condemned.push(resource);
            }
        }
        for resource in condemned {
            if registry.release_if_current(resource.key(), resource.id()).await {
                report.stale += 1;
            }
        }

        for resource in fresh.iter().filter(|r| r.kind().supports_probe()) {
            let Handle::Connection(connection) = resource.handle() else {
                continue;
            };
            report.probed += 1;

            let probe = AssertUnwindSafe(connection.probe()).catch_unwind();
            let failure = match tokio::time::timeout(self.config.probe_timeout, probe).await {
                Ok(Ok(Ok(()))) => None,
                Ok(Ok(Err(e))) => Some(e.to_string()),
                Ok(Err(panic)) => Some(format!(
                    "probe panicked: {}",
                    panic_message(panic.as_ref())
                )),
                Err(_) => Some(format!(
                    "probe timed out after {}ms",
                    self.config.probe_timeout.as_millis()
                )),
            };
            let Some(reason) = failure else {
                continue;
            };

            if registry.mark_if_current(resource.key(), resource.id(), ResourceState::Invalid) {
                tether_log::warn!(key = resource.key(), reason = %reason, "Liveness probe failed");
                if registry.release_if_current(resource.key(), resource.id()).await {
                    report.invalid += 1;
                }
            }
        }

        report
    }

    /// Spawn the periodic loop on the current runtime
    pub(crate) fn spawn(self) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        MonitorHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        tether_log::debug!(
            interval_secs = self.config.interval.as_secs(),
            max_age_secs = self.config.max_age.as_secs(),
            "Health monitor started"
        );

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                () = cancel.cancelled() => break,
            }

            if self.registry.strong_count() == 0 {
                break;
            }

            match AssertUnwindSafe(self.run_once()).catch_unwind().await {
                Ok(report) if report.evicted_any() => tether_log::info!(
                    stale = report.stale,
                    invalid = report.invalid,
                    probed = report.probed,
                    "Health monitor evicted resources"
                ),
                Ok(report) => tether_log::trace!(probed = report.probed, "Health monitor run"),
                Err(panic) => tether_log::error!(
                    panic = panic_message(panic.as_ref()),
                    "Health monitor run panicked"
                ),
            }
        }

        tether_log::debug!("Health monitor stopped");
    }
}

/// Running monitor task
#[derive(Debug)]
pub(crate) struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop to stop without waiting
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the loop, waiting at most `timeout` before aborting it
    pub(crate) async fn stop(self, timeout: Duration) {
        self.cancel.cancel();
        let abort = self.task.abort_handle();
        if tokio::time::timeout(timeout, self.task).await.is_err() {
            tether_log::warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Health monitor did not stop in time, aborting"
            );
            abort.abort();
        }
    }
}

fn panic_message<'a>(panic: &'a (dyn std::any::Any + Send + 'static)) -> &'a str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_falls_back_to_default() {
        let config = MonitorConfig {
            interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        let monitor = HealthMonitor::new(Weak::new(), config);
        assert_eq!(monitor.config().interval, Duration::from_secs(30));
    }

    #[test]
    fn panic_payloads_render() {
        let literal: Box<dyn std::any::Any + Send> = Box::new("boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "<non-string panic>");
    }
}
