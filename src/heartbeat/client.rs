//! HTTP client for the management endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::AppServerConfig;
use crate::health::{HealthSnapshot, ProbeReport, ServiceStatus};
use crate::node::NodeView;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
}

/// Body of heartbeat and close notifications.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(rename = "Node")]
    pub node: NodeView,
    #[serde(rename = "Result", skip_serializing_if = "Option::is_none")]
    pub result: Option<ProbeReport>,
    #[serde(rename = "ServiceStatus", skip_serializing_if = "Option::is_none")]
    pub service_status: Option<ServiceStatus>,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    pub fn closing(node: NodeView) -> Self {
        Self {
            node,
            result: None,
            service_status: None,
            timestamp: Utc::now(),
        }
    }
}

impl From<HealthSnapshot> for Report {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            node: snapshot.node,
            result: Some(snapshot.result),
            service_status: Some(snapshot.service_status),
            timestamp: snapshot.taken_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    authorization: String,
    heartbeat_url: String,
    close_url: String,
}

impl ManagementClient {
    pub fn new(config: &AppServerConfig, timeout: Duration) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReportError::Client)?;

        Ok(Self {
            http,
            authorization: config.authorization(),
            heartbeat_url: config.heartbeat_url(),
            close_url: config.close_url(),
        })
    }

    pub async fn send_heartbeat(&self, report: &Report) -> Result<(), ReportError> {
        self.post(&self.heartbeat_url, report).await
    }

    pub async fn send_close(&self, report: &Report) -> Result<(), ReportError> {
        self.post(&self.close_url, report).await
    }

    async fn post(&self, url: &str, report: &Report) -> Result<(), ReportError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.authorization)
            .json(report)
            .send()
            .await
            .map_err(|source| ReportError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
