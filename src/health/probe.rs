//! Reachability probes for the node's resources.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::bounded;
use crate::resources::{ResourceError, ResourceHandles};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentState {
    Up,
    Down,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    #[serde(rename = "Status")]
    pub state: ComponentState,
    #[serde(rename = "LatencyMs", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn not_configured() -> Self {
        Self {
            state: ComponentState::NotConfigured,
            latency_ms: None,
            error: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.state == ComponentState::Up
    }
}

/// Result of one probe round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    #[serde(rename = "Database")]
    pub database: ComponentHealth,
    #[serde(rename = "DocumentStore")]
    pub documents: ComponentHealth,
    #[serde(rename = "MessageBus")]
    pub message_bus: ComponentHealth,
}

impl ProbeReport {
    pub fn all_up(&self) -> bool {
        self.database.is_up() && self.documents.is_up() && self.message_bus.is_up()
    }
}

/// Ping every present handle concurrently, each under `timeout`.
pub async fn probe_resources(handles: &ResourceHandles, timeout: Duration) -> ProbeReport {
    let (database, documents, message_bus) = tokio::join!(
        probe("database", timeout, handles.database.as_ref().map(|db| db.ping())),
        probe("documents", timeout, handles.documents.as_ref().map(|docs| docs.ping())),
        probe("message_bus", timeout, handles.message_bus.as_ref().map(|bus| bus.ping())),
    );

    ProbeReport {
        database,
        documents,
        message_bus,
    }
}

async fn probe<F>(component: &'static str, timeout: Duration, ping: Option<F>) -> ComponentHealth
where
    F: Future<Output = Result<(), ResourceError>>,
{
    let Some(ping) = ping else {
        return ComponentHealth::not_configured();
    };

    let start = Instant::now();
    let result = match bounded("health probe", timeout, ping).await {
        Ok(result) => result,
        Err(e) => Err(ResourceError::from(e)),
    };
    let elapsed = start.elapsed();
    metrics::record_probe(component, result.is_ok(), elapsed);

    match result {
        Ok(()) => ComponentHealth {
            state: ComponentState::Up,
            latency_ms: Some(elapsed.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(component, error = %e, "Health probe failed");
            ComponentHealth {
                state: ComponentState::Down,
                latency_ms: Some(elapsed.as_millis() as u64),
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::resources::{Database, MessageBus};

    struct Reachable;

    #[async_trait]
    impl Database for Reachable {
        fn driver(&self) -> &str {
            "postgres"
        }

        async fn ping(&self) -> Result<(), ResourceError> {
            Ok(())
        }

        async fn close(&self) {}
    }

    struct Hanging;

    #[async_trait]
    impl MessageBus for Hanging {
        async fn ping(&self) -> Result<(), ResourceError> {
            std::future::pending().await
        }

        async fn stop(&self) {}
    }

    #[tokio::test]
    async fn test_probe_states() {
        let handles = ResourceHandles {
            database: Some(Arc::new(Reachable)),
            documents: None,
            message_bus: Some(Arc::new(Hanging)),
        };

        let report = probe_resources(&handles, Duration::from_millis(50)).await;

        assert!(report.database.is_up());
        assert_eq!(report.documents.state, ComponentState::NotConfigured);
        assert_eq!(report.message_bus.state, ComponentState::Down);
        assert!(report.message_bus.error.as_deref().unwrap().contains("timed out"));
        assert!(!report.all_up());
    }

    #[tokio::test]
    async fn test_report_serialization() {
        let report = probe_resources(&ResourceHandles::default(), Duration::from_millis(50)).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Database"]["Status"], "NotConfigured");
        assert!(json["MessageBus"].get("Error").is_none());
    }
}
