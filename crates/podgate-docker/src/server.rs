//! Docker API server.

use crate::api::create_router;
use crate::error::{DockerError, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use podgate_core::PodmanBackend;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;
use tower::Service;
use tower_http::trace::TraceLayer;

/// Docker API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unix socket path.
    pub socket_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/docker.sock"),
        }
    }
}

/// Docker API server.
pub struct DockerApiServer {
    config: ServerConfig,
    backend: Arc<dyn PodmanBackend>,
}

impl DockerApiServer {
    /// Creates a new Docker API server.
    #[must_use]
    pub fn new(config: ServerConfig, backend: Arc<dyn PodmanBackend>) -> Self {
        Self { config, backend }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Binds the configured socket, replacing a stale socket file.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(&self) -> Result<UnixListener> {
        let path = &self.config.socket_path;
        let _ = std::fs::remove_file(path);

        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        UnixListener::bind(path).map_err(|e| {
            DockerError::server(format!("failed to bind {}: {e}", path.display()))
        })
    }

    /// Serves connections from `listener` until `shutdown` resolves.
    ///
    /// Connections already accepted keep running until they finish.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting a connection fails.
    pub async fn serve(
        &self,
        listener: UnixListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let app = create_router(Arc::clone(&self.backend)).layer(TraceLayer::new_for_http());
        tracing::info!(
            "Docker API server listening on {}",
            self.config.socket_path.display()
        );

        tokio::pin!(shutdown);
        loop {
            let stream = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Docker API server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    accepted.map_err(|e| DockerError::server(e.to_string()))?.0
                }
            };

            let tower_service = app.clone();
            tokio::spawn(async move {
                let hyper_service =
                    hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                        tower_service.clone().call(request)
                    });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), hyper_service)
                    .await
                {
                    let err_str = err.to_string().to_lowercase();
                    if !err_str.contains("shutting down")
                        && !err_str.contains("connection reset")
                        && !err_str.contains("broken pipe")
                    {
                        tracing::error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
