//! Speed test HTTP server
//!
//! Exposes the latency probe and the two traffic endpoints:
//!
//! - `GET  /api/ping` returns `{"t": <epoch ms>}`
//! - `GET  /api/download?size=N` streams N random bytes (default 20 MiB)
//! - `POST /api/upload` drains the body and returns `{"received": N}`
//!
//! All API responses carry `Cache-Control: no-store`. When a static directory
//! is configured it is served for every other path with no-cache headers.

pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::services::ServeDir;
use tower_http::set_header::{SetResponseHeader, SetResponseHeaderLayer};

use crate::error::{AppError, Result};
use crate::logging::{LogLevel, Logger};
use crate::models::Config;
use handlers::ServerState;

pub use handlers::{PingResponse, UploadResponse};

const API_CACHE_CONTROL: &str = "no-store";
const STATIC_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// HTTP server hosting the probe and traffic endpoints
pub struct SpeedTestServer {
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
    logger: Logger,
}

impl SpeedTestServer {
    /// Server bound to the configured host and port. Logs at info level
    /// unless debug output is enabled.
    pub fn new(config: &Config) -> Self {
        let mut logger = Logger::with_config("SERVER".to_string(), config);
        if !config.debug {
            logger.set_level(LogLevel::Info);
        }

        Self {
            host: config.host.clone(),
            port: config.port,
            static_dir: config.static_dir.clone(),
            logger,
        }
    }

    /// Replace the server logger
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Bind address as "host:port"
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the router with the API routes and the optional static fallback
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/api/ping", get(handlers::ping))
            .route("/api/download", get(handlers::download))
            .route("/api/upload", post(handlers::upload).layer(DefaultBodyLimit::disable()))
            .route_layer(SetResponseHeaderLayer::overriding(
                CACHE_CONTROL,
                HeaderValue::from_static(API_CACHE_CONTROL),
            ))
            .with_state(ServerState {
                logger: self.logger.clone(),
            });

        match &self.static_dir {
            Some(dir) => api.fallback_service(static_files(dir)),
            None => api,
        }
    }

    /// Bind the listener. Port 0 picks an ephemeral port; read it back with
    /// `local_addr` on the returned listener.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::server(format!("Failed to bind to {}: {}", addr, e)))
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr: SocketAddr = listener.local_addr()?;
        let router = self.router();

        self.logger
            .info(&format!("listening on {}", local_addr))
            .field("addr", local_addr.to_string())
            .field("static_dir", self.static_dir.as_ref().map(|d| d.display().to_string()))
            .log()
            .await;

        if let Err(e) = axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
        {
            let error = AppError::server(format!("Server error: {}", e));
            self.logger.error("server stopped on error").error_info(&error).log().await;
            return Err(error);
        }

        self.logger.info("server stopped").log().await;
        Ok(())
    }

    /// Bind and serve until Ctrl+C
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Bind and serve until a message arrives on `shutdown_rx` or its sender
    /// is dropped
    pub async fn run_until_stopped(self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, async {
            let _ = shutdown_rx.await;
        })
        .await
    }
}

/// Static assets with caching disabled
fn static_files(dir: &Path) -> SetResponseHeader<SetResponseHeader<SetResponseHeader<ServeDir, HeaderValue>, HeaderValue>, HeaderValue> {
    let files = SetResponseHeader::overriding(
        ServeDir::new(dir),
        CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHE_CONTROL),
    );
    let files = SetResponseHeader::overriding(files, PRAGMA, HeaderValue::from_static("no-cache"));
    SetResponseHeader::overriding(files, EXPIRES, HeaderValue::from_static("0"))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
