//! Resource registry: single owner of externally created handles
//!
//! At most one resource is live per key. Registering under a taken key
//! releases the previous occupant. Release is idempotent and every close
//! failure is logged and swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::RegistryConfig;
use crate::error::{ResourceError, Result};
use crate::handle::{Handle, HandleKind};
use crate::monitor::{HealthMonitor, MonitorHandle};
use crate::state::ResourceState;
use crate::stats::ResourceStatistics;

/// A handle tracked by the registry together with its bookkeeping
#[derive(Debug, Clone)]
pub struct ManagedResource {
    key: String,
    id: Uuid,
    handle: Handle,
    type_tag: String,
    kind: HandleKind,
    state: ResourceState,
    created_at: DateTime<Utc>,
    registered: Instant,
}

impl ManagedResource {
    fn new(key: String, handle: Handle, type_tag: String) -> Self {
        Self {
            kind: handle.kind(),
            key,
            id: Uuid::new_v4(),
            handle,
            type_tag,
            state: ResourceState::Registered,
            created_at: Utc::now(),
            registered: Instant::now(),
        }
    }

    /// Registry key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identity of this registration, distinct across re-registrations
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The managed handle
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Caller supplied type tag
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Kind, fixed at registration
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Lifecycle state at the time of the snapshot
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Wall-clock registration time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since registration
    pub fn age(&self) -> Duration {
        self.registered.elapsed()
    }

    fn transition(&mut self, to: ResourceState) {
        tether_log::trace!(
            key = %self.key,
            from = %self.state,
            to = %to,
            "Resource state transition"
        );
        self.state = to;
    }
}

/// Tracks live handles, closes them on release and owns the health monitor.
///
/// Must be created inside a Tokio runtime: construction spawns the monitor
/// task.
pub struct ResourceRegistry {
    entries: DashMap<String, ManagedResource>,
    config: RegistryConfig,
    monitor: Mutex<Option<MonitorHandle>>,
    hook_installed: AtomicBool,
}

impl ResourceRegistry {
    /// Create a registry and start its health monitor
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        let registry = Arc::new(Self {
            entries: DashMap::new(),
            config,
            monitor: Mutex::new(None),
            hook_installed: AtomicBool::new(false),
        });

        let monitor = HealthMonitor::new(Arc::downgrade(&registry), registry.config.monitor.clone());
        *registry.monitor.lock() = Some(monitor.spawn());

        tether_log::debug!("Resource registry created");
        registry
    }

    /// Create a registry with default settings
    pub fn with_defaults() -> Arc<Self> {
        Self::new(RegistryConfig::default())
    }

    /// The registry's settings
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Track `handle` under `key`, releasing any resource already there.
    ///
    /// Returns the id of the new registration.
    pub async fn register(
        &self,
        key: impl Into<String>,
        handle: Handle,
        type_tag: impl Into<String>,
    ) -> Result<Uuid> {
        let key = key.into();
        let type_tag = type_tag.into();
        if key.is_empty() {
            return Err(ResourceError::invalid_argument("resource key must not be empty"));
        }
        if type_tag.trim().is_empty() {
            return Err(ResourceError::invalid_argument(format!(
                "type tag for '{key}' must not be blank"
            )));
        }

        let mut resource = ManagedResource::new(key.clone(), handle, type_tag);
        resource.transition(ResourceState::Valid);
        let id = resource.id;
        let kind = resource.kind;
        let tag = resource.type_tag.clone();

        let previous = self.entries.insert(key.clone(), resource);
        if let Some(previous) = previous {
            tether_log::debug!(key = %key, "Replacing registered resource");
            close_released(previous).await;
        }

        tether_log::debug!(key = %key, type_tag = %tag, kind = %kind, "Registered resource");
        Ok(id)
    }

    /// Register using the handle kind's name as the type tag
    pub async fn register_handle(&self, key: impl Into<String>, handle: Handle) -> Result<Uuid> {
        let tag = handle.kind().as_str();
        self.register(key, handle, tag).await
    }

    /// Close and remove the resource under `key`.
    ///
    /// Returns `false` when nothing was registered.
    pub async fn release(&self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some((_, resource)) => {
                close_released(resource).await;
                true
            }
            None => false,
        }
    }

    /// Release `key` only while it still holds registration `id`
    pub(crate) async fn release_if_current(&self, key: &str, id: Uuid) -> bool {
        match self.entries.remove_if(key, |_, r| r.id == id) {
            Some((_, resource)) => {
                close_released(resource).await;
                true
            }
            None => false,
        }
    }

    /// Set the state of `key` only while it still holds registration `id`
    pub(crate) fn mark_if_current(&self, key: &str, id: Uuid, state: ResourceState) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.id == id => {
                entry.transition(state);
                true
            }
            _ => false,
        }
    }

    /// Release everything and stop the health monitor.
    ///
    /// Safe to call more than once; the monitor is stopped by the first call.
    pub async fn release_all(&self) {
        let mut released = 0usize;
        // Repeat until empty so handles registered mid-drain are closed too.
        loop {
            let keys = self.keys();
            if keys.is_empty() {
                break;
            }
            for key in &keys {
                if self.release(key).await {
                    released += 1;
                }
            }
        }

        tether_log::info!(released, "Released all resources");
        self.stop_monitor().await;
    }

    async fn stop_monitor(&self) {
        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            handle.stop(self.config.shutdown_timeout).await;
        }
    }

    /// Whether the health monitor is still running
    pub fn is_monitoring(&self) -> bool {
        self.monitor.lock().is_some()
    }

    /// Release every resource registered with `type_tag`.
    ///
    /// Returns how many were released.
    pub async fn cleanup_resources_by_type(&self, type_tag: &str) -> usize {
        let matching: Vec<(String, Uuid)> = self
            .entries
            .iter()
            .filter(|e| e.type_tag == type_tag)
            .map(|e| (e.key.clone(), e.id))
            .collect();

        let mut released = 0;
        for (key, id) in matching {
            if self.release_if_current(&key, id).await {
                released += 1;
            }
        }
        tether_log::debug!(type_tag, released, "Cleaned up resources by type");
        released
    }

    /// Install a Ctrl-C / SIGTERM hook that runs [`release_all`](Self::release_all)
    /// and then exits the process with [`ShutdownSignal::exit_code`].
    ///
    /// Only the first call installs it; later calls return `false`.
    pub fn register_shutdown_hook(self: &Arc<Self>) -> bool {
        if self.hook_installed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let signal = shutdown_signal().await;
            if let Some(registry) = registry.upgrade() {
                tether_log::info!(%signal, "Shutdown signal received, releasing resources");
                registry.release_all().await;
            }
            let code = signal.exit_code();
            tether_log::info!(code, "Exiting after shutdown signal");
            std::process::exit(code);
        });
        true
    }

    /// Counts by type and state at this instant
    pub fn statistics(&self) -> ResourceStatistics {
        let mut stats = ResourceStatistics::default();
        for entry in &self.entries {
            stats.record(&entry.type_tag, entry.state);
        }
        stats
    }

    /// The handle under `key`
    pub fn get(&self, key: &str) -> Option<Handle> {
        self.entries.get(key).map(|e| e.handle.clone())
    }

    /// Whether `key` holds a live resource
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// State of the resource under `key`
    pub fn state(&self, key: &str) -> Option<ResourceState> {
        self.entries.get(key).map(|e| e.state)
    }

    /// Registered keys
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of live resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies of every live entry
    pub fn snapshot(&self) -> Vec<ManagedResource> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.cancel();
        }
        if !self.entries.is_empty() {
            tether_log::warn!(
                remaining = self.entries.len(),
                "Resource registry dropped with live resources"
            );
        }
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.entries.len())
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

async fn close_released(mut resource: ManagedResource) {
    if let Err(e) = resource.handle.close().await {
        tether_log::warn!(
            key = %resource.key,
            kind = %resource.kind,
            error = %e,
            "Failed to close resource"
        );
    }
    resource.transition(ResourceState::Released);
    tether_log::debug!(key = %resource.key, type_tag = %resource.type_tag, "Released resource");
}

/// Signal that fired the shutdown hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl-C (SIGINT)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl ShutdownSignal {
    /// Exit status used after cleanup: 128 plus the signal number
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 143,
        }
    }
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tether_log::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tether_log::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => ShutdownSignal::Interrupt,
        () = terminate => ShutdownSignal::Terminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, MockSession, MockStream};

    #[tokio::test]
    async fn register_rejects_blank_arguments() {
        let registry = ResourceRegistry::with_defaults();
        let handle = MockStream::new().handle();

        let err = registry.register("", handle.clone(), "file").await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument { .. }));
        let err = registry.register("k", handle, "  ").await.unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn registered_resources_are_valid() {
        let registry = ResourceRegistry::with_defaults();
        let conn = MockConnection::new();
        registry.register_handle("db", conn.handle()).await.unwrap();

        assert_eq!(registry.state("db"), Some(ResourceState::Valid));
        assert_eq!(registry.statistics().count_for("connection"), 1);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].kind(), HandleKind::Connection);
        assert!(snapshot[0].created_at() <= Utc::now());
    }

    #[tokio::test]
    async fn failed_close_still_removes() {
        let registry = ResourceRegistry::with_defaults();
        let session = MockSession::new("s");
        session.fail_quit(true);
        registry.register("web", session.handle(), "chrome").await.unwrap();

        assert!(registry.release("web").await);
        assert_eq!(session.quit_count(), 1);
        assert!(!registry.contains("web"));
    }

    #[tokio::test]
    async fn conditional_release_respects_reregistration() {
        let registry = ResourceRegistry::with_defaults();
        let first = registry
            .register("k", MockStream::new().handle(), "file")
            .await
            .unwrap();
        let second = registry
            .register("k", MockStream::new().handle(), "file")
            .await
            .unwrap();

        assert!(!registry.mark_if_current("k", first, ResourceState::Stale));
        assert!(!registry.release_if_current("k", first).await);
        assert!(registry.contains("k"));
        assert!(registry.release_if_current("k", second).await);
    }

    #[test]
    fn shutdown_exit_codes_follow_signal_numbers() {
        assert_eq!(ShutdownSignal::Interrupt.exit_code(), 130);
        assert_eq!(ShutdownSignal::Terminate.exit_code(), 143);
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn drop_stops_monitor() {
        let registry = ResourceRegistry::with_defaults();
        assert!(registry.is_monitoring());
        drop(registry);
    }
}
