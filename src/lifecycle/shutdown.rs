//! Shutdown coordination for the node.
//!
//! # Responsibilities
//! - Run the teardown exactly once, however many times it is triggered
//! - Stop owned resources in a fixed order
//! - Send the close notification, best effort
//!
//! # Teardown Order
//! 1. Cancel and join supervised tasks (heartbeat, reload triggers)
//! 2. Close the database pool
//! 3. Disconnect the document store
//! 4. Stop the message bus
//! 5. Disconnect broker sessions
//! 6. POST the close notification
//! 7. Stop the monitor server (aborted if it overruns)
//! 8. Pause for the grace period

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::brokers::ConnectionRegistry;
use crate::config::NodeConfig;
use crate::heartbeat::{ManagementClient, Report};
use crate::http::ServerHandle;
use crate::lifecycle::supervisor::{JoinReport, Supervisor};
use crate::node::NodeIdentity;
use crate::observability::metrics;
use crate::resilience::bounded;
use crate::resources::ResourceHandles;

/// Deadlines applied during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSettings {
    /// Shared by all supervised task joins; also bounds each resource close.
    pub task_join_timeout: Duration,
    pub server_shutdown_timeout: Duration,
    pub grace: Duration,
}

impl ShutdownSettings {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            task_join_timeout: config.shutdown.task_join_timeout(),
            server_shutdown_timeout: config.monitor.server_shutdown_timeout(),
            grace: config.monitor.shutdown_grace(),
        }
    }
}

/// Everything the node owns that needs stopping.
pub struct Teardown {
    pub supervisor: Supervisor,
    pub identity: Arc<NodeIdentity>,
    pub resources: Arc<ResourceHandles>,
    pub registry: Arc<ConnectionRegistry>,
    /// Stops broker event loops that outlive their disconnect.
    pub broker_sessions: CancellationToken,
    pub client: ManagementClient,
    pub server: Option<ServerHandle>,
    pub watcher: Option<RecommendedWatcher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub tasks: JoinReport,
    pub close_notified: bool,
    /// `None` when no monitor server was running.
    pub server_stopped_gracefully: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Completed(ShutdownReport),
    AlreadyShutDown,
}

pub struct ShutdownCoordinator {
    started: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
    settings: ShutdownSettings,
}

impl ShutdownCoordinator {
    pub fn new(settings: ShutdownSettings, teardown: Teardown) -> Self {
        Self {
            started: AtomicBool::new(false),
            teardown: Mutex::new(Some(teardown)),
            settings,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Tear the node down. Only the first call does anything.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shutdown already triggered");
            return ShutdownOutcome::AlreadyShutDown;
        }
        let Some(teardown) = self.teardown.lock().await.take() else {
            return ShutdownOutcome::AlreadyShutDown;
        };

        tracing::info!(app_id = %teardown.identity.app_id(), "Shutting down");
        let report = self.run(teardown).await;
        tracing::info!(
            aborted_tasks = report.tasks.aborted.len(),
            close_notified = report.close_notified,
            "Shutdown complete"
        );
        ShutdownOutcome::Completed(report)
    }

    async fn run(&self, teardown: Teardown) -> ShutdownReport {
        let Teardown {
            supervisor,
            identity,
            resources,
            registry,
            broker_sessions,
            client,
            server,
            watcher,
        } = teardown;
        let step_timeout = self.settings.task_join_timeout;

        let tasks = supervisor.shutdown(step_timeout).await;
        drop(watcher);

        if let Some(database) = &resources.database {
            if bounded("database close", step_timeout, database.close()).await.is_err() {
                tracing::warn!("Database pool did not close in time");
            } else {
                tracing::info!(driver = database.driver(), "Database pool closed");
            }
        }

        if let Some(documents) = &resources.documents {
            if bounded("document store disconnect", step_timeout, documents.disconnect())
                .await
                .is_err()
            {
                tracing::warn!("Document store did not disconnect in time");
            } else {
                tracing::info!("Document store disconnected");
            }
        }

        if let Some(bus) = &resources.message_bus {
            if bounded("message bus stop", step_timeout, bus.stop()).await.is_err() {
                tracing::warn!("Message bus did not stop in time");
            } else {
                tracing::info!("Message bus stopped");
            }
        }

        if bounded("broker disconnect", step_timeout, registry.disconnect_all())
            .await
            .is_err()
        {
            tracing::warn!("Broker sessions did not disconnect in time");
        }
        broker_sessions.cancel();

        let close = client.send_close(&Report::closing(identity.view())).await;
        metrics::record_close_notification(close.is_ok());
        if let Err(e) = &close {
            tracing::warn!(error = %e, "Close notification failed");
        }

        let server_stopped_gracefully = match server {
            Some(server) => Some(server.stop(self.settings.server_shutdown_timeout).await),
            None => None,
        };

        tokio::time::sleep(self.settings.grace).await;

        ShutdownReport {
            tasks,
            close_notified: close.is_ok(),
            server_stopped_gracefully,
        }
    }
}
