//! # tether-resource
//!
//! Lifecycle management for externally owned handles: browser sessions,
//! connections and streams.
//!
//! - [`ResourceRegistry`] is the single owner of every live handle. It
//!   replaces on re-register, releases idempotently and closes everything on
//!   shutdown.
//! - [`HealthMonitor`] periodically evicts handles that are too old or fail a
//!   liveness probe.
//! - [`HandleFactory`] builds handles by type name, applies
//!   [`CommonSettings`] to sessions and registers the result.
//! - [`WorkerContext`] binds one handle to one worker.
//!
//! ```no_run
//! use tether_resource::prelude::*;
//! use tether_resource::testing::MockBuilder;
//!
//! # async fn demo() -> tether_resource::Result<()> {
//! let registry = ResourceRegistry::new(RegistryConfig::default());
//! registry.register_shutdown_hook();
//!
//! let factory = HandleFactory::builder(registry.clone())
//!     .with_shared_builder("chrome", MockBuilder::sessions())
//!     .build();
//! let created = factory.create("chrome", &BuildConfig::default()).await?;
//!
//! registry.release(&created.key).await;
//! registry.release_all().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod monitor;
pub mod registry;
pub mod settings;
pub mod state;
pub mod stats;
pub mod testing;
pub mod worker;

pub use config::RegistryConfig;
pub use error::{ResourceError, Result};
pub use factory::{BuildConfig, HandleBuilder, HandleFactory, HandleFactoryBuilder, RegisteredHandle};
pub use handle::{AsAny, Connection, Handle, HandleError, HandleKind, Session, Stream};
pub use monitor::{HealthMonitor, MonitorConfig, MonitorReport};
pub use registry::{ManagedResource, ResourceRegistry, ShutdownSignal};
pub use settings::{CommonSettings, WindowSize};
pub use state::ResourceState;
pub use stats::ResourceStatistics;
pub use worker::WorkerContext;

/// Common imports
pub mod prelude {
    pub use crate::{
        BuildConfig, CommonSettings, Connection, Handle, HandleBuilder, HandleFactory,
        HandleKind, RegistryConfig, ResourceError, ResourceRegistry, ResourceState, Session,
        Stream, WorkerContext,
    };
}
