//! Handle capabilities and the closed set of handle kinds
//!
//! The registry never interprets what a handle *is*; it only needs to know
//! how to close it and, for connections, how to probe it. Each kind exposes
//! exactly those capabilities through an async trait, and [`Handle`] is the
//! closed enum the registry stores.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::settings::CommonSettings;

/// Failure reported by a handle capability
pub type HandleError = Box<dyn std::error::Error + Send + Sync>;

/// Downcasting support for capability trait objects.
///
/// Call through the trait object (`(*arc).as_any()`), not on the `Arc`
/// itself, which would downcast the pointer instead of the handle.
pub trait AsAny: Any + Send + Sync {
    /// The concrete handle as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A browser automation session
#[async_trait]
pub trait Session: AsAny {
    /// Driver-assigned session identifier, when known
    fn session_id(&self) -> Option<String> {
        None
    }

    /// Apply timeouts and window settings after creation
    async fn apply_settings(&self, _settings: &CommonSettings) -> Result<(), HandleError> {
        Ok(())
    }

    /// Terminate the session and the driver behind it
    async fn quit(&self) -> Result<(), HandleError>;
}

/// A connection that can be checked for liveness
#[async_trait]
pub trait Connection: AsAny {
    /// Succeeds when the connection is usable
    async fn probe(&self) -> Result<(), HandleError>;

    /// Close the connection
    async fn close(&self) -> Result<(), HandleError>;
}

/// A file or byte stream
#[async_trait]
pub trait Stream: AsAny {
    /// Flush and close the stream
    async fn close(&self) -> Result<(), HandleError>;
}

/// The kind of a handle, fixed when it is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// Browser session, closed with `quit`
    Session,
    /// Probe-able connection, closed with `close`
    Connection,
    /// Stream, closed with `close`
    Stream,
}

impl HandleKind {
    /// Lowercase name, also used as the default type tag
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Connection => "connection",
            Self::Stream => "stream",
        }
    }

    /// Whether the health monitor probes handles of this kind
    pub fn supports_probe(self) -> bool {
        matches!(self, Self::Connection)
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An externally owned handle managed by the registry
#[derive(Clone)]
pub enum Handle {
    /// Browser session
    Session(Arc<dyn Session>),
    /// Probe-able connection
    Connection(Arc<dyn Connection>),
    /// File or byte stream
    Stream(Arc<dyn Stream>),
}

impl Handle {
    /// Wrap a session
    pub fn session(session: impl Session + 'static) -> Self {
        Self::Session(Arc::new(session))
    }

    /// Wrap a connection
    pub fn connection(connection: impl Connection + 'static) -> Self {
        Self::Connection(Arc::new(connection))
    }

    /// Wrap a stream
    pub fn stream(stream: impl Stream + 'static) -> Self {
        Self::Stream(Arc::new(stream))
    }

    /// The kind of this handle
    pub fn kind(&self) -> HandleKind {
        match self {
            Self::Session(_) => HandleKind::Session,
            Self::Connection(_) => HandleKind::Connection,
            Self::Stream(_) => HandleKind::Stream,
        }
    }

    /// Close the handle: `quit` for sessions, `close` for everything else
    pub async fn close(&self) -> Result<(), HandleError> {
        match self {
            Self::Session(s) => s.quit().await,
            Self::Connection(c) => c.close().await,
            Self::Stream(s) => s.close().await,
        }
    }

    /// The session behind this handle, if it is one
    pub fn as_session(&self) -> Option<&Arc<dyn Session>> {
        match self {
            Self::Session(s) => Some(s),
            _ => None,
        }
    }

    /// The connection behind this handle, if it is one
    pub fn as_connection(&self) -> Option<&Arc<dyn Connection>> {
        match self {
            Self::Connection(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast to the concrete handle type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let any = match self {
            Self::Session(s) => (**s).as_any(),
            Self::Connection(c) => (**c).as_any(),
            Self::Stream(s) => (**s).as_any(),
        };
        any.downcast_ref::<T>()
    }

    /// Whether both values point at the same underlying handle
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Session(a), Self::Session(b)) => Arc::ptr_eq(a, b),
            (Self::Connection(a), Self::Connection(b)) => Arc::ptr_eq(a, b),
            (Self::Stream(a), Self::Stream(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Handle");
        s.field("kind", &self.kind());
        if let Self::Session(session) = self {
            s.field("session_id", &session.session_id());
        }
        s.finish()
    }
}
