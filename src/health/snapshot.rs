//! Point-in-time node health.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::brokers::ConnectionRegistry;
use crate::config::{EmptyRegistryStatus, HealthConfig};
use crate::health::{probe_resources, LivenessPolicy, ProbeReport, ServiceStatus};
use crate::node::{NodeIdentity, NodeView};
use crate::observability::metrics;
use crate::resources::ResourceHandles;

#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub node: NodeView,
    pub result: ProbeReport,
    pub service_status: ServiceStatus,
    pub taken_at: DateTime<Utc>,
}

/// Builds health snapshots from the node's shared state.
#[derive(Clone)]
pub struct HealthService {
    identity: Arc<NodeIdentity>,
    resources: Arc<ResourceHandles>,
    registry: Arc<ConnectionRegistry>,
    probe_timeout: Duration,
    policy: LivenessPolicy,
    empty: EmptyRegistryStatus,
}

impl HealthService {
    pub fn new(
        config: &HealthConfig,
        identity: Arc<NodeIdentity>,
        resources: Arc<ResourceHandles>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            identity,
            resources,
            registry,
            probe_timeout: config.probe_timeout(),
            policy: LivenessPolicy::from_config(config),
            empty: config.empty_registry,
        }
    }

    pub fn identity(&self) -> &Arc<NodeIdentity> {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn service_status(&self) -> ServiceStatus {
        let entries = self.registry.snapshot();
        let status = ServiceStatus::from_registry(&entries, self.policy, self.empty, Instant::now());
        metrics::record_registry(status.total, status.live);
        status
    }

    pub async fn snapshot(&self) -> HealthSnapshot {
        let result = probe_resources(&self.resources, self.probe_timeout).await;
        HealthSnapshot {
            node: self.identity.view(),
            result,
            service_status: self.service_status(),
            taken_at: Utc::now(),
        }
    }
}
