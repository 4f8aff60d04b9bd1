//! Shared fakes and builders for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use broker_node::brokers::{BrokerConnector, BrokerError, BrokerSession, ContactClock};
use broker_node::config::{
    BrokerSettings, DatabaseConfig, DocumentConfig, MessageBusConfig, NodeConfig, TopicSubscription,
};
use broker_node::lifecycle::Connectors;
use broker_node::resources::{
    Database, DocumentStore, MessageBus, ResourceConnector, ResourceError,
};

/// Ordered record of teardown calls made on fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct FakeDatabase(EventLog);

#[async_trait]
impl Database for FakeDatabase {
    fn driver(&self) -> &str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    async fn close(&self) {
        self.0.push("database.close");
    }
}

struct FakeDocuments(EventLog);

#[async_trait]
impl DocumentStore for FakeDocuments {
    fn database_name(&self) -> &str {
        "nodes"
    }

    async fn ping(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    async fn disconnect(&self) {
        self.0.push("documents.disconnect");
    }
}

struct FakeBus(EventLog);

#[async_trait]
impl MessageBus for FakeBus {
    async fn ping(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    async fn stop(&self) {
        self.0.push("message_bus.stop");
    }
}

/// Brings up every resource except the document store, which is refused.
pub struct FakeResources(pub EventLog);

#[async_trait]
impl ResourceConnector for FakeResources {
    async fn database(
        &self,
        _config: &DatabaseConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn Database>, ResourceError> {
        Ok(Arc::new(FakeDatabase(self.0.clone())))
    }

    async fn documents(
        &self,
        _config: &DocumentConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ResourceError> {
        Err(ResourceError::MissingField {
            resource: "documents",
            field: "connection",
        })
    }

    async fn message_bus(
        &self,
        _config: &MessageBusConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn MessageBus>, ResourceError> {
        Ok(Arc::new(FakeBus(self.0.clone())))
    }
}

/// Same as [`FakeResources`] but with a document store.
pub struct AllResources(pub EventLog);

#[async_trait]
impl ResourceConnector for AllResources {
    async fn database(
        &self,
        config: &DatabaseConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn Database>, ResourceError> {
        FakeResources(self.0.clone()).database(config, timeout).await
    }

    async fn documents(
        &self,
        _config: &DocumentConfig,
        _timeout: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ResourceError> {
        Ok(Arc::new(FakeDocuments(self.0.clone())))
    }

    async fn message_bus(
        &self,
        config: &MessageBusConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn MessageBus>, ResourceError> {
        FakeResources(self.0.clone()).message_bus(config, timeout).await
    }
}

struct FakeSession {
    host: String,
    clock: ContactClock,
    log: EventLog,
}

#[async_trait]
impl BrokerSession for FakeSession {
    async fn subscribe(&self, _topics: &[TopicSubscription]) -> Result<(), BrokerError> {
        Ok(())
    }

    fn last_contact(&self) -> Option<Instant> {
        self.clock.last()
    }

    async fn disconnect(&self) {
        self.log.push(format!("broker.disconnect:{}", self.host));
    }
}

/// Opens a session for every host except those starting with "down".
/// Hosts starting with "slow" take 300ms to connect.
pub struct FakeBrokers(pub EventLog);

#[async_trait]
impl BrokerConnector for FakeBrokers {
    async fn connect(
        &self,
        settings: &BrokerSettings,
        _resources: &Arc<broker_node::resources::ResourceHandles>,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        if settings.host.starts_with("down") {
            return Err(BrokerError::Connect {
                host: settings.host.clone(),
                reason: "connection refused".into(),
            });
        }
        if settings.host.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        let session = FakeSession {
            host: settings.host.clone(),
            clock: ContactClock::new(),
            log: self.0.clone(),
        };
        session.clock.touch();
        Ok(Arc::new(session))
    }
}

pub fn connectors(log: &EventLog) -> Connectors {
    Connectors {
        resources: Arc::new(FakeResources(log.clone())),
        brokers: Arc::new(FakeBrokers(log.clone())),
        broker_sessions: CancellationToken::new(),
    }
}

/// Write a broker file declaring `hosts` in order.
pub fn write_brokers(path: &Path, hosts: &[&str]) {
    let brokers: Vec<_> = hosts
        .iter()
        .map(|h| serde_json::json!({ "Host": h, "Port": 1883, "Topics": [{ "Topic": "node/in" }] }))
        .collect();
    std::fs::write(
        path,
        serde_json::json!({ "ApiKey": "broker-key", "ActiveMQs": brokers }).to_string(),
    )
    .unwrap();
}

/// A config pointing at `app_server`, with a broker file in `dir` and
/// teardown pauses shortened.
pub fn node_config(dir: &Path, app_server: &str) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.app_server.url = app_server.to_string();
    config.app_server.apikey = "secret".into();
    config.brokers.path = dir.join("activemqconfig.json").display().to_string();
    config.monitor.bind_host = "127.0.0.1".into();
    config.monitor.shutdown_grace_secs = 0;
    config.monitor.server_shutdown_timeout_secs = 1;
    config.shutdown.task_join_timeout_secs = 1;
    config.heartbeat.request_timeout_secs = 2;
    config
}

/// Find `len` consecutive free ports on the loopback.
pub fn free_port_run(len: u16) -> u16 {
    loop {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let start = probe.local_addr().unwrap().port();
        drop(probe);
        if start.checked_add(len).is_none() {
            continue;
        }
        let free = (start..start + len).all(|port| std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
        if free {
            return start;
        }
    }
}
