//! Node identity record.

use std::net::IpAddr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::schema::NodeSection;
use crate::node::host::HostAddress;

/// Identity of this node for the lifetime of the process.
///
/// Everything is fixed at construction except the monitor port and host
/// address, which are each written at most once during startup.
#[derive(Debug)]
pub struct NodeIdentity {
    name: String,
    app_id: Uuid,
    description: String,
    node_type: String,
    version: &'static str,
    status: &'static str,
    start_time: DateTime<Utc>,
    monitor_port: OnceLock<u16>,
    address: OnceLock<HostAddress>,
}

/// Serialized form of [`NodeIdentity`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AppID")]
    pub app_id: Uuid,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Type")]
    pub node_type: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "MonitorPort", skip_serializing_if = "Option::is_none")]
    pub monitor_port: Option<u16>,
    #[serde(rename = "Host", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(rename = "healthapi", skip_serializing_if = "Option::is_none")]
    pub health_api: Option<String>,
}

impl NodeIdentity {
    pub fn new(section: &NodeSection) -> Self {
        Self {
            name: section.name.clone(),
            app_id: Uuid::new_v4(),
            description: section.description.clone(),
            node_type: section.node_type.clone(),
            version: env!("CARGO_PKG_VERSION"),
            status: "Running",
            start_time: Utc::now(),
            monitor_port: OnceLock::new(),
            address: OnceLock::new(),
        }
    }

    pub fn app_id(&self) -> Uuid {
        self.app_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn monitor_port(&self) -> Option<u16> {
        self.monitor_port.get().copied()
    }

    pub fn address(&self) -> Option<&HostAddress> {
        self.address.get()
    }

    /// Record the bound monitor port. Returns false if one was already set.
    pub fn assign_monitor_port(&self, port: u16) -> bool {
        self.monitor_port.set(port).is_ok()
    }

    /// Record the discovered host address. Returns false if one was already set.
    pub fn assign_address(&self, address: HostAddress) -> bool {
        self.address.set(address).is_ok()
    }

    pub fn view(&self) -> NodeView {
        let monitor_port = self.monitor_port();
        let address = self.address();
        let health_api = match (address, monitor_port) {
            (Some(a), Some(port)) => Some(format!("http://{}:{}/health", a.host, port)),
            _ => None,
        };

        NodeView {
            name: self.name.clone(),
            app_id: self.app_id,
            description: self.description.clone(),
            node_type: self.node_type.clone(),
            version: self.version.to_string(),
            status: self.status.to_string(),
            start_time: self.start_time,
            monitor_port,
            host: address.map(|a| a.host.clone()),
            ip_address: address.and_then(|a| a.ip),
            health_api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_is_write_once() {
        let identity = NodeIdentity::new(&NodeSection::default());
        assert!(identity.assign_monitor_port(8801));
        assert!(!identity.assign_monitor_port(8802));
        assert_eq!(identity.monitor_port(), Some(8801));

        let first = HostAddress { host: "node-a".into(), ip: None };
        let second = HostAddress { host: "node-b".into(), ip: None };
        assert!(identity.assign_address(first));
        assert!(!identity.assign_address(second));
        assert_eq!(identity.address().map(|a| a.host.as_str()), Some("node-a"));
    }

    #[test]
    fn test_view_serializes_node_keys() {
        let identity = NodeIdentity::new(&NodeSection::default());
        identity.assign_monitor_port(8800);
        identity.assign_address(HostAddress {
            host: "node-a".into(),
            ip: Some("10.0.0.5".parse().unwrap()),
        });

        let json = serde_json::to_value(identity.view()).unwrap();
        assert_eq!(json["Name"], "broker-node");
        assert_eq!(json["Type"], "ActiveMQ");
        assert_eq!(json["Status"], "Running");
        assert_eq!(json["AppID"], identity.app_id().to_string());
        assert_eq!(json["MonitorPort"], 8800);
        assert_eq!(json["IPAddress"], "10.0.0.5");
        assert_eq!(json["healthapi"], "http://node-a:8800/health");
    }

    #[test]
    fn test_view_omits_unassigned_placement() {
        let identity = NodeIdentity::new(&NodeSection::default());
        let json = serde_json::to_value(identity.view()).unwrap();
        assert!(json.get("MonitorPort").is_none());
        assert!(json.get("healthapi").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = NodeIdentity::new(&NodeSection::default());
        let b = NodeIdentity::new(&NodeSection::default());
        assert_ne!(a.app_id(), b.app_id());
    }
}
