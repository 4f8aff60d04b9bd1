//! Startup of the node's external resources.
//!
//! # Responsibilities
//! - Attempt database, document store and message bus independently
//! - Bound every attempt by `resources.connect_timeout_secs`
//! - Log and record the outcome and duration of each attempt
//!
//! # Design Decisions
//! - Never fails: an attempt that errors leaves its handle empty
//! - Attempts run concurrently; none waits on another

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::{DatabaseConfig, DocumentConfig, MessageBusConfig, NodeConfig};
use crate::observability::metrics;
use crate::resilience::bounded;
use crate::resources::{
    Database, DocumentStore, DocumentStoreClient, HttpMessageBus, MessageBus, ResourceError,
    ResourceHandles, SqlDatabase,
};

/// Creates resource handles from their configuration sections.
#[async_trait]
pub trait ResourceConnector: Send + Sync {
    async fn database(
        &self,
        config: &DatabaseConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn Database>, ResourceError>;

    async fn documents(
        &self,
        config: &DocumentConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ResourceError>;

    async fn message_bus(
        &self,
        config: &MessageBusConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn MessageBus>, ResourceError>;
}

/// Connector for the real drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveResources;

#[async_trait]
impl ResourceConnector for LiveResources {
    async fn database(
        &self,
        config: &DatabaseConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn Database>, ResourceError> {
        Ok(Arc::new(SqlDatabase::connect(config, timeout).await?))
    }

    async fn documents(
        &self,
        config: &DocumentConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn DocumentStore>, ResourceError> {
        Ok(Arc::new(DocumentStoreClient::connect(config, timeout).await?))
    }

    async fn message_bus(
        &self,
        config: &MessageBusConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn MessageBus>, ResourceError> {
        Ok(Arc::new(HttpMessageBus::connect(config, timeout).await?))
    }
}

/// Bring up every resource that can be brought up.
pub async fn initialize(config: &NodeConfig, connector: &dyn ResourceConnector) -> ResourceHandles {
    let timeout = config.resources.connect_timeout();

    let (database, documents, message_bus) = tokio::join!(
        attempt("database", timeout, connector.database(&config.database, timeout)),
        attempt("documents", timeout, connector.documents(&config.documents, timeout)),
        attempt("message_bus", timeout, connector.message_bus(&config.message_bus, timeout)),
    );

    let handles = ResourceHandles {
        database,
        documents,
        message_bus,
    };

    if handles.is_complete() {
        tracing::info!("All resources initialized");
    } else {
        tracing::warn!(resources = ?handles, "Running with degraded resources");
    }
    handles
}

async fn attempt<T, F>(resource: &'static str, timeout: Duration, connect: F) -> Option<T>
where
    F: Future<Output = Result<T, ResourceError>>,
{
    let start = Instant::now();
    let outcome = match bounded("resource connect", timeout, connect).await {
        Ok(result) => result,
        Err(e) => Err(ResourceError::from(e)),
    };
    let elapsed = start.elapsed();

    match outcome {
        Ok(handle) => {
            tracing::info!(resource, elapsed_ms = elapsed.as_millis() as u64, "Resource initialized");
            metrics::record_resource_init(resource, true, elapsed);
            Some(handle)
        }
        Err(e) => {
            tracing::error!(resource, error = %e, elapsed_ms = elapsed.as_millis() as u64, "Resource initialization failed");
            metrics::record_resource_init(resource, false, elapsed);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullDatabase;

    #[async_trait]
    impl Database for NullDatabase {
        fn driver(&self) -> &str {
            "null"
        }
        async fn ping(&self) -> Result<(), ResourceError> {
            Ok(())
        }
        async fn close(&self) {}
    }

    struct NullBus;

    #[async_trait]
    impl MessageBus for NullBus {
        async fn ping(&self) -> Result<(), ResourceError> {
            Ok(())
        }
        async fn stop(&self) {}
    }

    /// Database and bus succeed, documents fail, and each call is counted.
    #[derive(Default)]
    struct PartialConnector {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceConnector for PartialConnector {
        async fn database(
            &self,
            _config: &DatabaseConfig,
            _timeout: Duration,
        ) -> Result<Arc<dyn Database>, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullDatabase))
        }

        async fn documents(
            &self,
            _config: &DocumentConfig,
            _timeout: Duration,
        ) -> Result<Arc<dyn DocumentStore>, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ResourceError::MissingField {
                resource: "document store",
                field: "database",
            })
        }

        async fn message_bus(
            &self,
            _config: &MessageBusConfig,
            _timeout: Duration,
        ) -> Result<Arc<dyn MessageBus>, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullBus))
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let connector = PartialConnector::default();
        let handles = initialize(&NodeConfig::default(), &connector).await;

        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
        assert!(handles.database.is_some());
        assert!(handles.documents.is_none());
        assert!(handles.message_bus.is_some());
        assert!(!handles.is_complete());
    }

    #[tokio::test]
    async fn test_live_connector_with_empty_config_degrades_everything() {
        let handles = initialize(&NodeConfig::default(), &LiveResources).await;
        assert!(handles.database.is_none());
        assert!(handles.documents.is_none());
        assert!(handles.message_bus.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_connect_is_bounded() {
        let out: Option<()> = attempt("database", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(out.is_none());
    }
}
