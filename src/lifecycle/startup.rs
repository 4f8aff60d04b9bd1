//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the node identity
//! - Initialize resources, then start the registry's first pass
//! - Start the heartbeat loop, monitor server and reload triggers
//! - Hand everything to the shutdown coordinator
//!
//! # Design Decisions
//! - Degraded, not fatal: resources, brokers and the monitor port may all
//!   fail and the node still runs
//! - Resource init completes before the first registry pass starts
//! - The caller waits only on the termination signal

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::admin::MonitorState;
use crate::brokers::{BrokerConnector, ConnectionRegistry, MqttConnector};
use crate::config::watcher::BrokerFileWatcher;
use crate::config::NodeConfig;
use crate::health::HealthService;
use crate::heartbeat::{HeartbeatScheduler, ManagementClient, ReportError};
use crate::http::MonitorServer;
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownSettings, Teardown};
use crate::lifecycle::signals;
use crate::lifecycle::supervisor::Supervisor;
use crate::net::bind_in_range;
use crate::node::{HostAddress, NodeIdentity};
use crate::resources::{self, LiveResources, ResourceConnector, ResourceHandles};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("management client: {0}")]
    Client(#[from] ReportError),
}

/// Factories for the node's external collaborators.
pub struct Connectors {
    pub resources: Arc<dyn ResourceConnector>,
    pub brokers: Arc<dyn BrokerConnector>,
    /// Cancelled after broker sessions are disconnected at shutdown.
    pub broker_sessions: CancellationToken,
}

impl Connectors {
    /// The real drivers: sqlx, the document store client, HTTP message bus, MQTT.
    pub fn live(config: &NodeConfig) -> Self {
        let broker_sessions = CancellationToken::new();
        Self {
            resources: Arc::new(LiveResources),
            brokers: Arc::new(MqttConnector::new(
                config.brokers.connect_timeout(),
                config.brokers.keep_alive(),
                broker_sessions.clone(),
            )),
            broker_sessions,
        }
    }
}

/// A started node.
pub struct RunningNode {
    pub identity: Arc<NodeIdentity>,
    pub resources: Arc<ResourceHandles>,
    pub registry: Arc<ConnectionRegistry>,
    pub monitor_addr: Option<SocketAddr>,
    coordinator: ShutdownCoordinator,
}

impl RunningNode {
    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.coordinator
    }

    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.coordinator.shutdown().await
    }
}

/// Start every component. Returns once the background tasks are running.
pub async fn launch(config: &NodeConfig, connectors: Connectors) -> Result<RunningNode, StartupError> {
    let identity = Arc::new(NodeIdentity::new(&config.node));
    tracing::info!(
        app_id = %identity.app_id(),
        name = identity.name(),
        version = env!("CARGO_PKG_VERSION"),
        "Node starting"
    );
    identity.assign_address(HostAddress::discover());

    let resources = Arc::new(resources::initialize(config, connectors.resources.as_ref()).await);

    let registry = Arc::new(ConnectionRegistry::new(
        PathBuf::from(&config.brokers.path),
        config.brokers.reload_mode,
        config.app_server.url.clone(),
        resources.clone(),
        connectors.brokers,
    ));

    let mut supervisor = Supervisor::new();

    let first_pass = registry.clone();
    supervisor.spawn("registry-first-pass", move |cancel| async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = first_pass.load() => {}
        }
    });

    let health = HealthService::new(&config.health, identity.clone(), resources.clone(), registry.clone());
    let client = ManagementClient::new(&config.app_server, config.heartbeat.request_timeout())?;

    let scheduler = HeartbeatScheduler::new(health.clone(), client.clone(), config.heartbeat.interval());
    supervisor.spawn("heartbeat", move |cancel| scheduler.run(cancel));

    let monitor = &config.monitor;
    let server = match bind_in_range(&monitor.bind_host, monitor.port_min, monitor.port_max).await {
        Ok(listener) => {
            let state = MonitorState::new(health, config.app_server.authorization());
            let spawned = MonitorServer::new(state, monitor.request_timeout()).spawn(listener);
            match spawned {
                Ok(handle) => {
                    identity.assign_monitor_port(handle.local_addr().port());
                    Some(handle)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Monitor server failed to start");
                    None
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Continuing without monitor server");
            None
        }
    };
    let monitor_addr = server.as_ref().map(|s| s.local_addr());

    let watcher = if config.brokers.watch {
        let (watcher, changes) = BrokerFileWatcher::new(registry.path());
        match watcher.run() {
            Ok(watcher) => {
                let reload = registry.clone();
                supervisor.spawn("broker-file-watch", move |cancel| {
                    signals::reload_on_change(reload, changes, cancel)
                });
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %registry.path().display(), "Broker file watch unavailable");
                None
            }
        }
    } else {
        None
    };

    #[cfg(unix)]
    {
        let reload = registry.clone();
        supervisor.spawn("hangup-reload", move |cancel| signals::reload_on_hangup(reload, cancel));
    }

    let coordinator = ShutdownCoordinator::new(
        ShutdownSettings::from_config(config),
        Teardown {
            supervisor,
            identity: identity.clone(),
            resources: resources.clone(),
            registry: registry.clone(),
            broker_sessions: connectors.broker_sessions,
            client,
            server,
            watcher,
        },
    );

    Ok(RunningNode {
        identity,
        resources,
        registry,
        monitor_addr,
        coordinator,
    })
}

/// Run the node until SIGINT or SIGTERM, then shut down.
pub async fn run(config: NodeConfig) -> Result<(), StartupError> {
    let node = launch(&config, Connectors::live(&config)).await?;

    let signal = signals::wait_for_termination().await;
    tracing::info!(signal, "Termination signal received");

    node.shutdown().await;
    Ok(())
}
