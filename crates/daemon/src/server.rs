//! HTTP server lifecycle.
//!
//! [`Server::bind`] opens the storage root and binds the listener up front so
//! that startup failures surface before any request is accepted. The bound
//! address is available through [`Server::local_addr`], which lets callers
//! bind to port 0 and discover the port afterwards.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::files::StorageRoot;
use crate::router::{create_router, AppState};

/// A bound, not yet running, file server.
pub struct Server {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    root: StorageRoot,
}

impl Server {
    /// Open the storage root and bind the listen address from `config`.
    ///
    /// The storage root is created if it does not exist yet.
    pub async fn bind(config: &Config) -> Result<Self> {
        let root = StorageRoot::open(&config.storage.root).with_context(|| {
            format!(
                "Failed to open storage root: {}",
                config.storage.root.display()
            )
        })?;

        let state = Arc::new(AppState::new(root.clone(), config.storage.max_upload_size));
        let router = create_router(state);

        let listener = TcpListener::bind(&config.server.bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read the bound listen address")?;

        Ok(Self {
            listener,
            router,
            local_addr,
            root,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Canonical storage root directory.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            addr = %self.local_addr,
            root = %self.root.path().display(),
            "File server listening"
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        info!("File server stopped");
        Ok(())
    }
}

/// Resolve when the process receives Ctrl-C or SIGTERM.
///
/// If a handler cannot be registered the failure is logged and that signal
/// is simply never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT"),
            Err(e) => {
                error!("Failed to register SIGINT handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.server.bind_addr = "127.0.0.1:0".to_string();
        config.storage.root = root.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_bind_creates_root_and_reports_port() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("storage");
        assert!(!root.exists());

        let server = Server::bind(&test_config(&root)).await.unwrap();

        assert!(root.is_dir());
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.root(), root.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_bind_rejects_file_as_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("not-a-dir");
        std::fs::write(&root, "x").unwrap();

        let result = Server::bind(&test_config(&root)).await;

        let err = result.err().unwrap().to_string();
        assert!(err.contains("Failed to open storage root"));
    }

    #[tokio::test]
    async fn test_bind_address_in_use() {
        let temp_dir = TempDir::new().unwrap();
        let first = Server::bind(&test_config(temp_dir.path())).await.unwrap();

        let mut config = test_config(temp_dir.path());
        config.server.bind_addr = first.local_addr().to_string();
        let result = Server::bind(&config).await;

        let err = result.err().unwrap().to_string();
        assert!(err.contains("Failed to bind"));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let server = Server::bind(&test_config(temp_dir.path())).await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(server.serve(async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
