//! The ordered collection of broker connections.
//!
//! # Responsibilities
//! - Run registry passes: read the broker file, open a session per broker,
//!   commit the batch, then set up subscriptions
//! - Hand out consistent snapshots to readers while a pass is in flight
//! - Signal readiness once the first pass has finished, whatever its outcome
//!
//! # Design Decisions
//! - Passes are serialized by a mutex; readers never take it
//! - A failed pass leaves the registry unchanged
//! - Sessions are opened concurrently but entries keep file order

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use tokio::sync::{watch, Mutex};

use crate::brokers::{BrokerConnection, BrokerConnector};
use crate::config::brokers::BrokerFileError;
use crate::config::{BrokerFile, ReloadMode};
use crate::observability::metrics;
use crate::resources::ResourceHandles;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    BrokerFile(#[from] BrokerFileError),
    #[error("registry pass did not complete: {0}")]
    Interrupted(String),
}

/// Outcome of one registry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Brokers declared in the file.
    pub declared: usize,
    /// Of those, how many got a session.
    pub connected: usize,
    /// Entries retired by a replace-mode pass.
    pub retired: usize,
    /// Registry size after the pass.
    pub total: usize,
}

pub type Snapshot = Arc<Vec<Arc<BrokerConnection>>>;

pub struct ConnectionRegistry {
    entries: ArcSwap<Vec<Arc<BrokerConnection>>>,
    pass_lock: Mutex<()>,
    ready: watch::Sender<bool>,
    path: PathBuf,
    mode: ReloadMode,
    app_server: String,
    resources: Arc<ResourceHandles>,
    connector: Arc<dyn BrokerConnector>,
}

impl ConnectionRegistry {
    pub fn new(
        path: impl Into<PathBuf>,
        mode: ReloadMode,
        app_server: impl Into<String>,
        resources: Arc<ResourceHandles>,
        connector: Arc<dyn BrokerConnector>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            pass_lock: Mutex::new(()),
            ready,
            path: path.into(),
            mode,
            app_server: app_server.into(),
            resources,
            connector,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ReloadMode {
        self.mode
    }

    /// Current entries in insertion order.
    pub fn snapshot(&self) -> Snapshot {
        self.entries.load_full()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once the first pass has finished.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends on readiness.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Run one registry pass.
    pub async fn load(&self) -> Result<PassSummary, RegistryError> {
        let _pass = self.pass_lock.lock().await;
        let start = Instant::now();

        let result = self.run_pass().await;
        self.ready.send_replace(true);
        metrics::record_reload(result.is_ok());

        match &result {
            Ok(summary) => tracing::info!(
                path = %self.path.display(),
                mode = ?self.mode,
                declared = summary.declared,
                connected = summary.connected,
                retired = summary.retired,
                total = summary.total,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Broker registry loaded"
            ),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Broker registry pass failed"
            ),
        }
        result
    }

    /// Run one registry pass on its own task.
    ///
    /// Dropping the returned future does not cancel the pass: sessions it
    /// opens are still committed to the registry.
    pub async fn reload(self: &Arc<Self>) -> Result<PassSummary, RegistryError> {
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.load().await })
            .await
            .map_err(|e| RegistryError::Interrupted(e.to_string()))?
    }

    async fn run_pass(&self) -> Result<PassSummary, RegistryError> {
        let file = BrokerFile::read(&self.path).await?;
        let declared = file.brokers.len();

        let sessions = join_all(
            file.brokers
                .iter()
                .map(|settings| self.connector.connect(settings, &self.resources)),
        )
        .await;

        let created: Vec<Arc<BrokerConnection>> = file
            .brokers
            .into_iter()
            .zip(sessions)
            .map(|(settings, session)| {
                let session = match session {
                    Ok(session) => Some(session),
                    Err(e) => {
                        tracing::warn!(
                            host = %settings.host,
                            port = settings.port,
                            error = %e,
                            "Broker unavailable, registering without session"
                        );
                        None
                    }
                };
                Arc::new(BrokerConnection::new(
                    settings,
                    session,
                    self.resources.clone(),
                    self.app_server.clone(),
                    file.api_key.clone(),
                ))
            })
            .collect();
        let connected = created.iter().filter(|c| c.session().is_some()).count();

        let retired = match self.mode {
            ReloadMode::Additive => {
                let mut next = Vec::clone(&self.entries.load());
                next.extend(created.iter().cloned());
                self.entries.store(Arc::new(next));
                Vec::new()
            }
            ReloadMode::Replace => {
                let previous = self.entries.swap(Arc::new(created.clone()));
                Vec::clone(&previous)
            }
        };
        let total = self.len();

        for connection in &created {
            match connection.setup_subscriptions().await {
                Ok(0) => {}
                Ok(topics) => tracing::debug!(host = %connection.host(), topics, "Subscriptions ready"),
                Err(e) => tracing::warn!(host = %connection.host(), error = %e, "Subscription setup failed"),
            }
        }

        for connection in &retired {
            connection.disconnect().await;
        }

        Ok(PassSummary {
            declared,
            connected,
            retired: retired.len(),
            total,
        })
    }

    /// Disconnect every session. Entries stay registered.
    pub async fn disconnect_all(&self) {
        let _pass = self.pass_lock.lock().await;
        let entries = self.snapshot();
        join_all(entries.iter().map(|c| c.disconnect())).await;
        tracing::info!(count = entries.len(), "Broker sessions disconnected");
    }
}
