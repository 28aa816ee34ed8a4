//! Server configuration and shared application state.

use std::{
    sync::{
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{
    domain::ConnectionRegistry,
    infrastructure::{LogSink, TracingSink},
    usecase::BroadcastUseCase,
};

/// Display name announced in the server `hello`.
pub const DEFAULT_NAME: &str = "LiveReload";
/// Empty host binds every interface.
pub const DEFAULT_HOST: &str = "";
/// Port LiveReload browser extensions connect to.
pub const DEFAULT_PORT: u16 = 35729;
/// How long a client may take to send its `hello`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-mostly server configuration.
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Broadcast requests and lifecycle messages. `None` silences them.
    pub status_log: Option<Arc<dyn LogSink>>,
    /// Per-connection failures. `None` silences them.
    pub error_log: Option<Arc<dyn LogSink>>,
    /// Body served at `/livereload.js`.
    pub client_script: Option<Arc<str>>,
    /// Deadline for the client `hello`; expiry is a protocol violation.
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    pub fn new(name: String, host: String, port: u16) -> Self {
        let status_log: Arc<dyn LogSink> = Arc::new(TracingSink::status(name.clone()));
        let error_log: Arc<dyn LogSink> = Arc::new(TracingSink::error(name.clone()));

        Self {
            name,
            host,
            port,
            status_log: Some(status_log),
            error_log: Some(error_log),
            client_script: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Shared application state
pub struct AppState {
    config: RwLock<ServerConfig>,
    /// Read on every reload write, so kept outside the lock.
    live_css: AtomicBool,
    /// Set once graceful shutdown starts; late upgrades close immediately.
    shutting_down: AtomicBool,
    /// Connections eligible for broadcasts
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Reload / alert fan-out
    pub broadcast_usecase: BroadcastUseCase,
}

impl AppState {
    pub fn new(config: ServerConfig, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self {
            config: RwLock::new(config),
            live_css: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
            broadcast_usecase: BroadcastUseCase::new(registry.clone()),
            registry,
        }
    }

    /// Read access to the configuration. Never hold the guard across `.await`.
    pub fn config(&self) -> RwLockReadGuard<'_, ServerConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the configuration. Never hold the guard across `.await`.
    pub fn config_mut(&self) -> RwLockWriteGuard<'_, ServerConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> String {
        self.config().name.clone()
    }

    pub fn live_css(&self) -> bool {
        self.live_css.load(Ordering::Relaxed)
    }

    pub fn set_live_css(&self, live_css: bool) {
        self.live_css.store(live_css, Ordering::Relaxed);
    }

    pub fn client_script(&self) -> Option<Arc<str>> {
        self.config().client_script.clone()
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.config().handshake_timeout
    }

    /// Must happen before the final `close_all` snapshot is taken.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Checked by each connection after it has registered.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub fn log_status(&self, message: &str) {
        let sink = self.config().status_log.clone();
        if let Some(sink) = sink {
            sink.log(message);
        }
    }

    pub fn log_error(&self, message: &str) {
        let sink = self.config().error_log.clone();
        if let Some(sink) = sink {
            sink.log(message);
        }
    }
}
