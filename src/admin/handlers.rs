use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::admin::MonitorState;
use crate::health::{HealthSnapshot, ProbeReport, ServiceStatus};
use crate::node::NodeView;
use crate::observability::metrics;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    #[serde(rename = "Node")]
    pub node: NodeView,
    #[serde(rename = "Result")]
    pub result: ProbeReport,
    #[serde(rename = "ServiceStatus")]
    pub service_status: ServiceStatus,
    pub time: DateTime<Utc>,
}

impl From<HealthSnapshot> for HealthBody {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            node: snapshot.node,
            result: snapshot.result,
            service_status: snapshot.service_status,
            time: snapshot.taken_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReloadBody {
    #[serde(rename = "Status")]
    pub status: &'static str,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health(State(state): State<MonitorState>) -> Json<HealthBody> {
    let snapshot = state.health.snapshot().await;
    metrics::record_health_request(StatusCode::OK.as_u16());
    Json(snapshot.into())
}

pub async fn reload_config(State(state): State<MonitorState>) -> Response {
    match state.registry.reload().await {
        Ok(_) => Json(ReloadBody {
            status: "Success",
            error: None,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ReloadBody {
                status: "Failed",
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}
