//! Handle factory: build by type name, apply settings, register

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tether_config::ConfigResolver;
use uuid::Uuid;

use crate::error::{ResourceError, Result};
use crate::handle::{Handle, HandleError};
use crate::registry::ResourceRegistry;
use crate::settings::CommonSettings;

/// Builds handles of one type.
///
/// Builders only construct; the factory applies settings and registers.
#[async_trait]
pub trait HandleBuilder: Send + Sync {
    /// Build a handle backed by a local driver or resource
    async fn build_local(&self, config: &BuildConfig) -> std::result::Result<Handle, HandleError>;

    /// Build a handle backed by a remote endpoint
    async fn build_remote(&self, config: &BuildConfig)
    -> std::result::Result<Handle, HandleError>;
}

/// Parameters handed to a [`HandleBuilder`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildConfig {
    /// Registry key; a `"{type}-{uuid}"` key is generated when absent
    pub key: Option<String>,
    /// Use `build_remote` instead of `build_local`
    pub remote: bool,
    /// Remote endpoint
    pub remote_url: Option<String>,
    /// Run without a visible window
    pub headless: bool,
    /// Extra driver arguments
    pub args: Vec<String>,
    /// Raw type-specific options
    pub options: Value,
    /// Settings applied to sessions after they are built
    pub settings: CommonSettings,
}

impl BuildConfig {
    /// Read build parameters for `type_name`.
    ///
    /// | field      | override key        | path                                  |
    /// |------------|---------------------|---------------------------------------|
    /// | remote     | `remote`            | `run.remote`                          |
    /// | remote_url | `remote.url`        | `run.remote.url`                      |
    /// | headless   | `headless`          | `run.headless`                        |
    /// | args       | `{type}.args`       | `web.{type}.defaultOptions.args`      |
    /// | options    |                     | `web.{type}.defaultOptions`           |
    pub fn from_resolver(resolver: &ConfigResolver, type_name: &str) -> Self {
        let remote_url = resolver.get_string("remote.url", "run.remote.url", "");
        Self {
            key: None,
            remote: resolver.get_bool("remote", "run.remote", false),
            remote_url: (!remote_url.is_empty()).then_some(remote_url),
            headless: resolver.get_bool("headless", "run.headless", false),
            args: resolver.get_list(
                &format!("{type_name}.args"),
                &format!("web.{type_name}.defaultOptions.args"),
                &[],
            ),
            options: resolver
                .get_value(&format!("web.{type_name}.defaultOptions"))
                .unwrap_or(Value::Null),
            settings: CommonSettings::from_resolver(resolver),
        }
    }

    /// Handle type named by the `browser` override or `run.browser`
    pub fn configured_type(resolver: &ConfigResolver, default: &str) -> String {
        resolver
            .get_string("browser", "run.browser", default)
            .to_lowercase()
    }

    /// Register under a fixed key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Select the remote builder
    #[must_use]
    pub fn remote(mut self, url: impl Into<String>) -> Self {
        self.remote = true;
        self.remote_url = Some(url.into());
        self
    }

    /// Replace the session settings
    #[must_use]
    pub fn with_settings(mut self, settings: CommonSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// A handle the factory built and registered
#[derive(Debug, Clone)]
pub struct RegisteredHandle {
    /// Key it is registered under
    pub key: String,
    /// The handle
    pub handle: Handle,
}

/// Dispatches creation requests to builders by type name
pub struct HandleFactory {
    registry: Arc<ResourceRegistry>,
    builders: HashMap<String, Arc<dyn HandleBuilder>>,
}

impl HandleFactory {
    /// Start configuring a factory that registers into `registry`
    pub fn builder(registry: Arc<ResourceRegistry>) -> HandleFactoryBuilder {
        HandleFactoryBuilder {
            registry,
            builders: HashMap::new(),
        }
    }

    /// The registry handles are registered into
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Type names with a builder, sorted
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.builders.keys().cloned().collect();
        types.sort();
        types
    }

    /// Whether `type_name` has a builder
    pub fn supports(&self, type_name: &str) -> bool {
        self.builders.contains_key(type_name)
    }

    /// Build a handle of `type_name`, apply session settings and register it
    /// under `config.key` (or a generated key) with `type_name` as its tag.
    pub async fn create(&self, type_name: &str, config: &BuildConfig) -> Result<RegisteredHandle> {
        let builder = self.builders.get(type_name).ok_or_else(|| {
            ResourceError::unsupported_type(type_name, self.builders.keys().cloned().collect())
        })?;

        let built = if config.remote {
            tether_log::debug!(
                type_name,
                url = config.remote_url.as_deref().unwrap_or(""),
                "Building remote handle"
            );
            builder.build_remote(config).await
        } else {
            tether_log::debug!(type_name, "Building local handle");
            builder.build_local(config).await
        };
        let handle = built.map_err(|e| ResourceError::creation_failed(type_name, e))?;

        if let Handle::Session(session) = &handle
            && let Err(e) = session.apply_settings(&config.settings).await
        {
            tether_log::warn!(type_name, error = %e, "Applying session settings failed");
            if let Err(quit_err) = session.quit().await {
                tether_log::warn!(
                    type_name,
                    error = %quit_err,
                    "Failed to quit session after settings failure"
                );
            }
            return Err(ResourceError::creation_failed(type_name, e));
        }

        let key = config
            .key
            .clone()
            .unwrap_or_else(|| format!("{type_name}-{}", Uuid::new_v4()));
        self.registry
            .register(key.clone(), handle.clone(), type_name)
            .await?;

        Ok(RegisteredHandle { key, handle })
    }
}

impl std::fmt::Debug for HandleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleFactory")
            .field("types", &self.supported_types())
            .finish_non_exhaustive()
    }
}

/// Builder for [`HandleFactory`]; the builder map is fixed once built
pub struct HandleFactoryBuilder {
    registry: Arc<ResourceRegistry>,
    builders: HashMap<String, Arc<dyn HandleBuilder>>,
}

impl HandleFactoryBuilder {
    /// Add (or replace) the builder for `type_name`
    #[must_use]
    pub fn with_builder(
        mut self,
        type_name: impl Into<String>,
        builder: impl HandleBuilder + 'static,
    ) -> Self {
        self.builders.insert(type_name.into(), Arc::new(builder));
        self
    }

    /// Add a shared builder for `type_name`
    #[must_use]
    pub fn with_shared_builder(
        mut self,
        type_name: impl Into<String>,
        builder: Arc<dyn HandleBuilder>,
    ) -> Self {
        self.builders.insert(type_name.into(), builder);
        self
    }

    /// Finish configuration
    pub fn build(self) -> HandleFactory {
        HandleFactory {
            registry: self.registry,
            builders: self.builders,
        }
    }
}
