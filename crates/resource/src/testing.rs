//! Mock handles and builders for exercising the registry without real drivers
//!
//! Every mock counts the calls made on it and can be told to fail. Mocks are
//! created behind an `Arc` so a test can keep inspecting them after handing
//! a [`Handle`] to the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::factory::{BuildConfig, HandleBuilder};
use crate::handle::{Connection, Handle, HandleError, HandleKind, Session, Stream};
use crate::settings::CommonSettings;

fn injected(what: &str) -> HandleError {
    format!("injected {what} failure").into()
}

/// Mock browser session
#[derive(Debug, Default)]
pub struct MockSession {
    id: String,
    quits: AtomicUsize,
    settings_applied: AtomicUsize,
    fail_quit: AtomicBool,
    fail_settings: AtomicBool,
    last_settings: Mutex<Option<CommonSettings>>,
}

impl MockSession {
    /// Create a session with the given id
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            ..Self::default()
        })
    }

    /// A registry handle for this session
    pub fn handle(self: &Arc<Self>) -> Handle {
        Handle::Session(Arc::clone(self) as Arc<dyn Session>)
    }

    /// Make `quit` fail
    pub fn fail_quit(&self, fail: bool) {
        self.fail_quit.store(fail, Ordering::SeqCst);
    }

    /// Make `apply_settings` fail
    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// Number of `quit` calls
    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    /// Number of `apply_settings` calls
    pub fn settings_count(&self) -> usize {
        self.settings_applied.load(Ordering::SeqCst)
    }

    /// Settings from the last successful `apply_settings`
    pub fn last_settings(&self) -> Option<CommonSettings> {
        self.last_settings.lock().clone()
    }
}

#[async_trait]
impl Session for MockSession {
    fn session_id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    async fn apply_settings(&self, settings: &CommonSettings) -> Result<(), HandleError> {
        self.settings_applied.fetch_add(1, Ordering::SeqCst);
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(injected("settings"));
        }
        *self.last_settings.lock() = Some(settings.clone());
        Ok(())
    }

    async fn quit(&self) -> Result<(), HandleError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        if self.fail_quit.load(Ordering::SeqCst) {
            return Err(injected("quit"));
        }
        Ok(())
    }
}

/// How a [`MockConnection`] answers probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeBehavior {
    /// Probe succeeds
    #[default]
    Healthy,
    /// Probe returns an error
    Fail,
    /// Probe never completes
    Hang,
    /// Probe panics
    Panic,
}

/// Mock connection with scripted probe results
#[derive(Debug, Default)]
pub struct MockConnection {
    probes: AtomicUsize,
    closes: AtomicUsize,
    fail_close: AtomicBool,
    behavior: Mutex<ProbeBehavior>,
}

impl MockConnection {
    /// Create a healthy connection
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a connection with the given probe behavior
    pub fn with_probe(behavior: ProbeBehavior) -> Arc<Self> {
        let conn = Self::new();
        conn.set_probe(behavior);
        conn
    }

    /// A registry handle for this connection
    pub fn handle(self: &Arc<Self>) -> Handle {
        Handle::Connection(Arc::clone(self) as Arc<dyn Connection>)
    }

    /// Change how probes answer
    pub fn set_probe(&self, behavior: ProbeBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Make `close` fail
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Number of probes started
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn probe(&self) -> Result<(), HandleError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock();
        match behavior {
            ProbeBehavior::Healthy => Ok(()),
            ProbeBehavior::Fail => Err(injected("probe")),
            ProbeBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            ProbeBehavior::Panic => panic!("injected probe panic"),
        }
    }

    async fn close(&self) -> Result<(), HandleError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(injected("close"));
        }
        Ok(())
    }
}

/// Mock stream
#[derive(Debug, Default)]
pub struct MockStream {
    closes: AtomicUsize,
    fail_close: AtomicBool,
    close_delay: Mutex<Duration>,
}

impl MockStream {
    /// Create a stream
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A registry handle for this stream
    pub fn handle(self: &Arc<Self>) -> Handle {
        Handle::Stream(Arc::clone(self) as Arc<dyn Stream>)
    }

    /// Make `close` fail
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Make `close` take `delay` before completing
    pub fn set_close_delay(&self, delay: Duration) {
        *self.close_delay.lock() = delay;
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stream for MockStream {
    async fn close(&self) -> Result<(), HandleError> {
        let delay = *self.close_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(injected("close"));
        }
        Ok(())
    }
}

/// Builder producing fresh mocks of one kind and remembering them
#[derive(Debug)]
pub struct MockBuilder {
    kind: HandleKind,
    local_builds: AtomicUsize,
    remote_builds: AtomicUsize,
    fail_build: AtomicBool,
    fail_settings: AtomicBool,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    connections: Mutex<Vec<Arc<MockConnection>>>,
    streams: Mutex<Vec<Arc<MockStream>>>,
}

impl MockBuilder {
    /// A builder for handles of `kind`
    pub fn new(kind: HandleKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            local_builds: AtomicUsize::new(0),
            remote_builds: AtomicUsize::new(0),
            fail_build: AtomicBool::new(false),
            fail_settings: AtomicBool::new(false),
            sessions: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
        })
    }

    /// A builder for sessions
    pub fn sessions() -> Arc<Self> {
        Self::new(HandleKind::Session)
    }

    /// Make every build fail
    pub fn fail_build(&self, fail: bool) {
        self.fail_build.store(fail, Ordering::SeqCst);
    }

    /// Make built sessions reject their settings
    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// Number of `build_local` calls
    pub fn local_builds(&self) -> usize {
        self.local_builds.load(Ordering::SeqCst)
    }

    /// Number of `build_remote` calls
    pub fn remote_builds(&self) -> usize {
        self.remote_builds.load(Ordering::SeqCst)
    }

    /// Sessions built so far
    pub fn built_sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().clone()
    }

    /// Connections built so far
    pub fn built_connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.lock().clone()
    }

    /// Streams built so far
    pub fn built_streams(&self) -> Vec<Arc<MockStream>> {
        self.streams.lock().clone()
    }

    fn build(&self, origin: &str) -> Result<Handle, HandleError> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(injected("build"));
        }
        let handle = match self.kind {
            HandleKind::Session => {
                let mut sessions = self.sessions.lock();
                let session = MockSession::new(format!("{origin}-{}", sessions.len()));
                session.fail_settings(self.fail_settings.load(Ordering::SeqCst));
                sessions.push(Arc::clone(&session));
                session.handle()
            }
            HandleKind::Connection => {
                let conn = MockConnection::new();
                self.connections.lock().push(Arc::clone(&conn));
                conn.handle()
            }
            HandleKind::Stream => {
                let stream = MockStream::new();
                self.streams.lock().push(Arc::clone(&stream));
                stream.handle()
            }
        };
        Ok(handle)
    }
}

#[async_trait]
impl HandleBuilder for MockBuilder {
    async fn build_local(&self, _config: &BuildConfig) -> Result<Handle, HandleError> {
        self.local_builds.fetch_add(1, Ordering::SeqCst);
        self.build("local")
    }

    async fn build_remote(&self, _config: &BuildConfig) -> Result<Handle, HandleError> {
        self.remote_builds.fetch_add(1, Ordering::SeqCst);
        self.build("remote")
    }
}
