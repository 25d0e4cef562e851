//! HTTP server lifecycle: bind, serve, graceful shutdown.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ServerError;

/// Owns the listener and the spawned server task.
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Create a server for the given bind address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Bind the listener and spawn the server task.
    ///
    /// Returns the bound address (port 0 resolves to the assigned port).
    pub async fn start(&mut self, app: Router) -> Result<SocketAddr, ServerError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.addr,
                source: e,
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr: self.addr,
            source: e,
        })?;

        tracing::info!("API server listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("API server shutting down");
                })
                .await
            {
                tracing::error!("API server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
