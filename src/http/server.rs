//! Monitor HTTP server.
//!
//! # Responsibilities
//! - Serve the control router on an already-bound listener
//! - Bound every request by `monitor.request_timeout_secs` and trace it
//! - Stop gracefully on cancellation, aborting if the stop overruns

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_monitor_router, MonitorState};

pub struct MonitorServer {
    router: Router,
}

impl MonitorServer {
    pub fn new(state: MonitorState, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, request_timeout),
        }
    }

    #[allow(deprecated)]
    fn build_router(state: MonitorState, request_timeout: Duration) -> Router {
        setup_monitor_router(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` is cancelled and in-flight requests finish.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Monitor server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("Monitor server stopped");
        Ok(())
    }

    /// Run on a background task.
    pub fn spawn(self, listener: TcpListener) -> io::Result<ServerHandle> {
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(listener, shutdown.clone()));
        Ok(ServerHandle { addr, shutdown, task })
    }
}

/// A running monitor server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Request a graceful stop and wait up to `timeout` for it. Returns false
    /// if the server had to be aborted.
    pub async fn stop(self, timeout: Duration) -> bool {
        self.shutdown.cancel();
        let mut task = self.task;

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Monitor server exited with error");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Monitor server task failed");
                true
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Monitor server did not stop in time, aborting"
                );
                task.abort();
                false
            }
        }
    }
}
