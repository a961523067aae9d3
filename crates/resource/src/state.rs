//! Lifecycle states of a managed resource

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed resource.
///
/// ```text
/// Registered -> Valid -> Stale   -> Released
///                     -> Invalid -> Released
///                     ----------------> Released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Accepted by the registry, not yet confirmed usable
    Registered,
    /// Usable
    Valid,
    /// Older than the configured maximum age
    Stale,
    /// Failed a liveness probe
    Invalid,
    /// Closed and removed from the registry
    Released,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Registered => "registered",
            Self::Valid => "valid",
            Self::Stale => "stale",
            Self::Invalid => "invalid",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}
