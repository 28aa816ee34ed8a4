//! Server facade.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::{CloseReason, ConnectionRegistry},
    infrastructure::{InMemoryConnectionRegistry, LogSink},
    usecase::BroadcastReport,
};

use super::{
    error::ServerError,
    handler::{client_script, health_check, websocket_handler},
    signal::shutdown_signal,
    state::{AppState, DEFAULT_HOST, DEFAULT_NAME, DEFAULT_PORT, ServerConfig},
};

/// How long shutdown waits for connections to leave the registry.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// LiveReload server
///
/// Cheap to clone; every clone drives the same server. Configure it, call
/// [`Server::listen`] (or [`Server::run`]), and call [`Server::reload`] /
/// [`Server::alert`] from wherever file changes are detected.
///
/// # Example
///
/// ```ignore
/// let server = Server::new("LiveReload", "127.0.0.1", 35729);
/// let listener = server.listen().await?;
/// let serving = server.clone();
/// tokio::spawn(async move { serving.serve(listener, shutdown_signal()).await });
/// server.reload("css/site.css").await;
/// ```
#[derive(Clone)]
pub struct Server {
    state: Arc<AppState>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl Server {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::with_registry(
            name,
            host,
            port,
            Arc::new(InMemoryConnectionRegistry::new()),
        )
    }

    /// Create a server on top of a custom connection registry.
    pub fn with_registry(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        let config = ServerConfig::new(name.into(), host.into(), port);
        Self {
            state: Arc::new(AppState::new(config, registry)),
        }
    }

    pub fn name(&self) -> String {
        self.state.name()
    }

    pub fn host(&self) -> String {
        self.state.config().host.clone()
    }

    pub fn port(&self) -> u16 {
        self.state.config().port
    }

    /// `host:port` as configured. After [`Server::listen`] this is the bound address.
    pub fn addr(&self) -> String {
        let config = self.state.config();
        format!("{}:{}", config.host, config.port)
    }

    pub fn live_css(&self) -> bool {
        self.state.live_css()
    }

    pub fn set_live_css(&self, live_css: bool) {
        self.state.set_live_css(live_css);
    }

    pub fn status_log(&self) -> Option<Arc<dyn LogSink>> {
        self.state.config().status_log.clone()
    }

    pub fn set_status_log(&self, sink: Option<Arc<dyn LogSink>>) {
        self.state.config_mut().status_log = sink;
    }

    pub fn error_log(&self) -> Option<Arc<dyn LogSink>> {
        self.state.config().error_log.clone()
    }

    pub fn set_error_log(&self, sink: Option<Arc<dyn LogSink>>) {
        self.state.config_mut().error_log = sink;
    }

    pub fn client_script(&self) -> Option<Arc<str>> {
        self.state.client_script()
    }

    /// Script served at `/livereload.js`. `None` makes the route answer 404.
    pub fn set_client_script(&self, script: Option<String>) {
        self.state.config_mut().client_script = script.map(Arc::from);
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.state.handshake_timeout()
    }

    /// How long a new connection may wait before sending `hello`.
    pub fn set_handshake_timeout(&self, timeout: Duration) {
        self.state.config_mut().handshake_timeout = timeout;
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/livereload", get(websocket_handler))
            // HTTP エンドポイント
            .route("/livereload.js", get(client_script))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the listening socket.
    ///
    /// An empty host binds every interface. When port 0 is configured the
    /// address picked by the OS is written back, so [`Server::port`] reports it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn listen(&self) -> Result<TcpListener, ServerError> {
        let bind_addr = {
            let config = self.state.config();
            let host = if config.host.is_empty() {
                "0.0.0.0"
            } else {
                config.host.as_str()
            };
            format!("{}:{}", host, config.port)
        };

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind {
                addr: bind_addr,
                source,
            })?;
        self.apply_bound_addr(local_addr);

        tracing::info!("LiveReload server listening on {}", local_addr);
        self.state
            .log_status(&format!("listening on {}", local_addr));

        Ok(listener)
    }

    fn apply_bound_addr(&self, local_addr: SocketAddr) {
        let mut config = self.state.config_mut();
        if config.port == 0 {
            config.host = local_addr.ip().to_string();
            config.port = local_addr.port();
        }
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// On shutdown every open connection is told to close before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] if the accept loop fails.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = self.clone();
        let signal = async move {
            shutdown.await;
            server.shutdown_connections().await;
        };

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Server shutdown complete");
        self.state.log_status("server stopped");
        Ok(())
    }

    /// Bind and serve until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = self.listen().await?;
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Ask every connected browser to reload `file`.
    ///
    /// Returns once the command is queued on every live connection; per-client
    /// failures only reach the error log.
    pub async fn reload(&self, file: &str) {
        self.state
            .log_status(&format!("requesting reload: {}", file));
        let report = self.state.broadcast_usecase.reload(file).await;
        self.report_drops(&report);
    }

    /// Ask every connected browser to show `message`.
    pub async fn alert(&self, message: &str) {
        self.state
            .log_status(&format!("requesting alert: {}", message));
        let report = self.state.broadcast_usecase.alert(message).await;
        self.report_drops(&report);
    }

    /// Number of registered connections, handshaken or not.
    pub async fn connection_count(&self) -> usize {
        self.state.registry.count().await
    }

    /// Tell every open connection to close. Returns how many were signalled.
    pub async fn close_connections(&self) -> usize {
        self.state
            .broadcast_usecase
            .close_all(CloseReason::ServerShutdown)
            .await
    }

    async fn shutdown_connections(&self) {
        self.state.begin_shutdown();
        let signalled = self.close_connections().await;
        tracing::info!(signalled, "Closing connections");

        let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
        while self.connection_count().await > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    fn report_drops(&self, report: &BroadcastReport) {
        tracing::debug!(?report, attempted = report.attempted(), "Broadcast finished");
        if report.timed_out > 0 {
            self.state.log_error(&format!(
                "dropped command for {} unresponsive connection(s)",
                report.timed_out
            ));
        }
    }
}
