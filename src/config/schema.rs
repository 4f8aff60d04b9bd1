//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the node.
//! All types derive Serde traits for deserialization from the TOML file.
//! Resource sections keep their required fields optional: a missing field
//! degrades that one resource at startup instead of rejecting the file.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Idle pool connections used when `maxidleconns` is absent or malformed.
pub const DEFAULT_MAX_IDLE_CONNS: u32 = 5;

/// Open pool connections used when `maxopenconns` is absent or malformed.
pub const DEFAULT_MAX_OPEN_CONNS: u32 = 10;

/// Root configuration for a node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity fields reported with every heartbeat.
    pub node: NodeSection,

    /// Relational database pool.
    pub database: DatabaseConfig,

    /// Document store client.
    pub documents: DocumentConfig,

    /// Message bus client (forwarded as-is to the client).
    pub message_bus: MessageBusConfig,

    /// Remote management endpoint.
    pub app_server: AppServerConfig,

    /// Logging settings.
    pub log: LogConfig,

    /// Local control surface.
    pub monitor: MonitorConfig,

    /// Heartbeat reporting.
    pub heartbeat: HeartbeatConfig,

    /// Health probes and aggregation policy.
    pub health: HealthConfig,

    /// Broker registry.
    pub brokers: BrokersConfig,

    /// Resource initialization.
    pub resources: ResourcesConfig,

    /// Metrics exposition.
    pub observability: ObservabilityConfig,

    /// Teardown bounds.
    pub shutdown: ShutdownConfig,
}

/// Static identity of this node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeSection {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            name: "broker-node".to_string(),
            description: "Message broker connection service".to_string(),
            node_type: "ActiveMQ".to_string(),
        }
    }
}

/// Relational database configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Driver name (`postgres`, `mysql`).
    #[serde(rename = "type")]
    pub driver: Option<String>,

    /// Connection string; a bare DSN gets the driver prefixed as URL scheme.
    pub connection: Option<String>,

    #[serde(deserialize_with = "lenient_count")]
    pub maxidleconns: Option<u32>,

    #[serde(deserialize_with = "lenient_count")]
    pub maxopenconns: Option<u32>,
}

impl DatabaseConfig {
    pub fn max_idle_conns(&self) -> u32 {
        self.maxidleconns.unwrap_or(DEFAULT_MAX_IDLE_CONNS)
    }

    pub fn max_open_conns(&self) -> u32 {
        match self.maxopenconns {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_OPEN_CONNS,
        }
    }
}

/// Accepts any TOML value and keeps it only when it is a non-negative whole
/// number. Everything else falls back to the caller's default.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Other(serde::de::IgnoredAny),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Int(n)) => u32::try_from(n).ok(),
        Some(Raw::Float(f)) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            Some(f as u32)
        }
        Some(Raw::Float(_)) | Some(Raw::Other(_)) | None => None,
    })
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DocumentConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub connection: Option<String>,
    pub database: Option<String>,
}

/// Message bus configuration.
///
/// Only `url` is interpreted here; every other key is carried along for the
/// client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MessageBusConfig {
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

/// Remote management endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppServerConfig {
    /// Base URL, e.g. `https://mgmt.example.com/api`.
    pub url: String,
    /// Shared secret used both for outbound calls and the local control surface.
    pub apikey: String,
}

impl AppServerConfig {
    /// Value of the `Authorization` header for this secret.
    pub fn authorization(&self) -> String {
        format!("apikey {}", self.apikey)
    }

    pub fn heartbeat_url(&self) -> String {
        format!("{}/IACComponents/heartbeat", self.url.trim_end_matches('/'))
    }

    pub fn close_url(&self) -> String {
        format!("{}/IACComponents/close", self.url.trim_end_matches('/'))
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (`info`, `broker_node=debug,tower_http=info`, ...).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Local control surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub bind_host: String,

    /// First port tried (inclusive).
    pub port_min: u16,

    /// Last port tried (inclusive).
    pub port_max: u16,

    pub request_timeout_secs: u64,

    /// Upper bound for draining in-flight requests on shutdown.
    pub server_shutdown_timeout_secs: u64,

    /// Pause before the process exits.
    pub shutdown_grace_secs: u64,
}

impl MonitorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn server_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server_shutdown_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port_min: 8800,
            port_max: 8900,
            request_timeout_secs: 30,
            server_shutdown_timeout_secs: 5,
            shutdown_grace_secs: 2,
        }
    }
}

/// Heartbeat reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            request_timeout_secs: 10,
        }
    }
}

/// How a broker entry is judged live.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerLiveness {
    /// Session present and heard from within `broker_stale_after_secs`.
    #[default]
    Staleness,
    /// Session present.
    Handle,
}

/// Overall status reported when no broker is registered.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRegistryStatus {
    #[default]
    Ok,
    NoBrokers,
}

/// Health probes and aggregation policy.
///
/// A broker counts as live by default only while its session has been
/// heard from within `broker_stale_after_secs`. Set
/// `broker_liveness = "handle"` to count any broker holding a session as
/// live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Deadline of each individual resource probe.
    pub probe_timeout_secs: u64,
    pub broker_liveness: BrokerLiveness,
    pub broker_stale_after_secs: u64,
    pub empty_registry: EmptyRegistryStatus,
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn broker_stale_after(&self) -> Duration {
        Duration::from_secs(self.broker_stale_after_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 3,
            broker_liveness: BrokerLiveness::Staleness,
            broker_stale_after_secs: 90,
            empty_registry: EmptyRegistryStatus::Ok,
        }
    }
}

/// What a reload does with the connections of earlier passes.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMode {
    /// Append; earlier connections stay registered and open.
    #[default]
    Additive,
    /// Swap the whole set; earlier sessions are disconnected.
    Replace,
}

/// Broker registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokersConfig {
    /// Broker file, relative to the working directory.
    pub path: String,
    pub reload_mode: ReloadMode,
    /// Reload when the broker file changes on disk.
    pub watch: bool,
    pub connect_timeout_secs: u64,
    pub keep_alive_secs: u64,
}

impl BrokersConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for BrokersConfig {
    fn default() -> Self {
        Self {
            path: "activemqconfig.json".to_string(),
            reload_mode: ReloadMode::Additive,
            watch: false,
            connect_timeout_secs: 10,
            keep_alive_secs: 30,
        }
    }
}

/// Resource initialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub connect_timeout_secs: u64,
}

impl ResourcesConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shutdown bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long background tasks get to finish after cancellation.
    pub task_join_timeout_secs: u64,
}

impl ShutdownConfig {
    pub fn task_join_timeout(&self) -> Duration {
        Duration::from_secs(self.task_join_timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            task_join_timeout_secs: 5,
        }
    }
}
