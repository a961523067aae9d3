//! Per-worker handle binding

use std::sync::Arc;

use crate::error::Result;
use crate::factory::{BuildConfig, HandleFactory};
use crate::handle::Handle;

/// Binds at most one registered handle to a worker.
///
/// Each worker (test thread, task, ...) owns its own context and passes it
/// explicitly. The registry still owns the handle; the context only remembers
/// the key, so an eviction by the health monitor is visible through
/// [`current`](Self::current).
#[derive(Debug)]
pub struct WorkerContext {
    factory: Arc<HandleFactory>,
    bound: Option<String>,
}

impl WorkerContext {
    /// Create an unbound context
    pub fn new(factory: Arc<HandleFactory>) -> Self {
        Self {
            factory,
            bound: None,
        }
    }

    /// Release the current binding, then create and bind a new handle
    pub async fn acquire(&mut self, type_name: &str, config: &BuildConfig) -> Result<Handle> {
        self.release().await;
        let registered = self.factory.create(type_name, config).await?;
        tether_log::debug!(key = %registered.key, "Bound handle to worker");
        self.bound = Some(registered.key);
        Ok(registered.handle)
    }

    /// The bound handle, if it is still registered
    pub fn current(&self) -> Option<Handle> {
        let key = self.bound.as_deref()?;
        self.factory.registry().get(key)
    }

    /// Key of the bound handle
    pub fn bound_key(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    /// Release the bound handle. Returns whether the registry still held it.
    pub async fn release(&mut self) -> bool {
        match self.bound.take() {
            Some(key) => self.factory.registry().release(&key).await,
            None => false,
        }
    }
}
