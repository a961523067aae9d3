//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// No candidate location yielded readable content
    #[error("Configuration not found: {} (searched {})", .requested.display(), display_paths(.searched))]
    NotFound {
        /// Path the caller asked for
        requested: PathBuf,
        /// Every location that was tried, in order
        searched: Vec<PathBuf>,
    },

    /// A candidate exists but could not be read
    #[error("Cannot read configuration {}: {message}", .path.display())]
    Read {
        /// Candidate that failed
        path: PathBuf,
        /// Underlying I/O failure
        message: String,
    },

    /// Content was read but is not a usable document
    #[error("Invalid configuration in {}: {message}", .path.display())]
    Invalid {
        /// File the content came from
        path: PathBuf,
        /// What is wrong with it
        message: String,
    },

    /// A value exists but cannot be converted to the requested type
    #[error(
        "Configuration type error at '{path}' in document '{document}': expected {expected}, found {actual}"
    )]
    Type {
        /// Name of the document the value came from
        document: String,
        /// Dot-path of the value
        path: String,
        /// Expected type
        expected: String,
        /// Actual type encountered
        actual: String,
    },
}

impl ConfigError {
    /// Create a not-found error listing the searched locations
    pub fn not_found(requested: impl Into<PathBuf>, searched: Vec<PathBuf>) -> Self {
        Self::NotFound {
            requested: requested.into(),
            searched,
        }
    }

    /// Create a read error from an I/O failure
    pub fn read(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            message: error.to_string(),
        }
    }

    /// Create an invalid-configuration error
    pub fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(
        document: impl Into<String>,
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Type {
            document: document.into(),
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether the error means "nothing there" rather than "something broken"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
