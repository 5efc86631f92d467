//! Dev server lifecycle
//!
//! [`DevServer::start`] binds the listener and returns the only handle to the
//! running server; whoever holds the handle is responsible for stopping it.
//! [`shutdown`] is the best-effort teardown used at the end of every run.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::handler::HandlerWithoutStateExt;
use axum::http::Uri;
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use tdbuild_common::config::ProjectConfig;
use tdbuild_common::{Error, Result};

use crate::mock::MockPayloads;

/// Configuration for the dev server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub host: IpAddr,

    /// Port to listen on (0 = any free port)
    pub port: u16,

    /// Directory of static test fixtures
    pub static_dir: PathBuf,

    pub payloads: MockPayloads,
}

impl DevServerConfig {
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: config.server.port,
            static_dir: config.folders.test.clone(),
            payloads: MockPayloads {
                success: config.server.success.clone(),
                error: config.server.error.clone(),
            },
        }
    }
}

/// Static fixtures first; anything not found there goes to the mock endpoint.
pub fn router(config: &DevServerConfig) -> Router {
    let payloads = Arc::new(config.payloads.clone());
    let mock = move |uri: Uri| {
        let payloads = Arc::clone(&payloads);
        async move { payloads.respond(&uri) }
    };

    let files = ServeDir::new(&config.static_dir).fallback(mock.into_service());

    Router::new()
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
}

/// Handle to a running dev server
pub struct DevServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl DevServer {
    /// Bind and start serving. Fails fatally when the port cannot be bound.
    pub async fn start(config: DevServerConfig) -> Result<Self> {
        let bind_addr = SocketAddr::new(config.host, config.port);
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| Error::ServerBind {
                port: config.port,
                reason: e.to_string(),
            })?;
        let addr = listener.local_addr()?;

        let app = router(&config);
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
        });

        info!(
            "Dev server listening on http://{} (fixtures: {})",
            addr,
            config.static_dir.display()
        );

        Ok(Self {
            addr,
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// URL reachable from this machine
    pub fn base_url(&self) -> String {
        let host = if self.addr.ip().is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.addr.ip()
        };
        format!("http://{}", SocketAddr::new(host, self.addr.port()))
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn stop(mut self) -> Result<()> {
        info!("Stopping dev server on {}", self.addr);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await??;
        }
        Ok(())
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Best-effort teardown: stops the server if there is one, logging rather
/// than returning any error.
pub async fn shutdown(server: Option<DevServer>) {
    match server {
        Some(server) => {
            if let Err(e) = server.stop().await {
                warn!("Error closing server: {}", e);
            }
        }
        None => debug!("No dev server running"),
    }
}
