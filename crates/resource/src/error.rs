//! Error types for resource management
use thiserror::Error;

use crate::handle::HandleError;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Errors surfaced by the registry and the handle factory.
///
/// Close and probe failures never show up here: they are logged and
/// swallowed on the best-effort paths.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A caller passed an unusable argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong
        message: String,
    },

    /// No builder is registered for the requested type
    #[error("Unsupported handle type '{type_name}' (supported: {})", .supported.join(", "))]
    UnsupportedType {
        /// The requested type name
        type_name: String,
        /// Type names the factory does know
        supported: Vec<String>,
    },

    /// A builder, or the settings applied after it, failed
    #[error("Failed to create handle of type '{type_name}': {source}")]
    HandleCreationFailed {
        /// The requested type name
        type_name: String,
        /// The underlying failure
        #[source]
        source: HandleError,
    },

    /// Configuration could not be read
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
        /// The underlying configuration error
        #[source]
        source: Option<tether_config::ConfigError>,
    },
}

impl ResourceError {
    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported-type error
    pub fn unsupported_type(type_name: impl Into<String>, mut supported: Vec<String>) -> Self {
        supported.sort();
        Self::UnsupportedType {
            type_name: type_name.into(),
            supported,
        }
    }

    /// Create a handle-creation error wrapping the cause
    pub fn creation_failed(type_name: impl Into<String>, source: HandleError) -> Self {
        Self::HandleCreationFailed {
            type_name: type_name.into(),
            source,
        }
    }
}

impl From<tether_config::ConfigError> for ResourceError {
    fn from(e: tether_config::ConfigError) -> Self {
        Self::Configuration {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_lists_known_types() {
        let err = ResourceError::unsupported_type(
            "opera",
            vec!["firefox".to_string(), "chrome".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Unsupported handle type 'opera' (supported: chrome, firefox)"
        );
    }

    #[test]
    fn creation_failure_keeps_source() {
        let err = ResourceError::creation_failed("chrome", "driver exited".into());
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("driver exited"));
    }

    #[test]
    fn config_errors_convert() {
        let err: ResourceError = tether_config::ConfigError::invalid("x.json", "empty").into();
        assert!(matches!(err, ResourceError::Configuration { source: Some(_), .. }));
    }
}
