//! Broker file definitions.
//!
//! The broker file is JSON, separate from the node configuration, and is
//! re-read on every registry pass:
//!
//! ```json
//! { "ApiKey": "...", "ActiveMQs": [ { "Host": "mq1", "Port": 1883, "Topics": [...] } ] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error reading or parsing the broker file.
#[derive(Debug, thiserror::Error)]
pub enum BrokerFileError {
    #[error("failed to read broker file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse broker file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Contents of the broker file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BrokerFile {
    /// Key copied onto every connection created from this file.
    #[serde(rename = "ApiKey", default)]
    pub api_key: String,

    /// Brokers in declaration order.
    #[serde(rename = "ActiveMQs", default)]
    pub brokers: Vec<BrokerSettings>,
}

/// Settings of one broker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerSettings {
    /// Host identifier; also the key in the aggregated service status.
    #[serde(rename = "Host")]
    pub host: String,

    #[serde(rename = "Port", default = "default_port")]
    pub port: u16,

    #[serde(rename = "Username", default)]
    pub username: Option<String>,

    #[serde(rename = "Password", default)]
    pub password: Option<String>,

    #[serde(rename = "ClientID", default)]
    pub client_id: Option<String>,

    #[serde(rename = "Topics", default)]
    pub topics: Vec<TopicSubscription>,

    /// Broker-specific keys not interpreted by the registry.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_port() -> u16 {
    1883
}

/// A topic to subscribe to once the session is up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicSubscription {
    #[serde(rename = "Topic")]
    pub topic: String,

    /// Name of the downstream handler the messages are meant for.
    #[serde(rename = "Handler", default)]
    pub handler: Option<String>,
}

impl BrokerFile {
    pub async fn read(path: &Path) -> Result<Self, BrokerFileError> {
        let data = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker_file() {
        let file: BrokerFile = serde_json::from_str(
            r#"{
                "ApiKey": "abc",
                "ActiveMQs": [
                    { "Host": "mq1", "Port": 1884, "Topics": [ { "Topic": "orders", "Handler": "OrderIn" } ] },
                    { "Host": "mq2", "Heartbeat": "10000,10000" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(file.api_key, "abc");
        assert_eq!(file.brokers.len(), 2);
        assert_eq!(file.brokers[0].port, 1884);
        assert_eq!(file.brokers[0].topics[0].topic, "orders");
        assert_eq!(file.brokers[1].port, 1883);
        assert!(file.brokers[1].extra.contains_key("Heartbeat"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = BrokerFile::read(Path::new("/nonexistent/activemqconfig.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerFileError::Read(_)));
    }
}
