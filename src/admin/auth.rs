use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admin::MonitorState;
use crate::observability::metrics;

/// Reject requests whose `Authorization` header is not exactly `apikey <key>`.
pub async fn require_api_key(
    State(state): State<MonitorState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|value| value == &*state.authorization);

    if authorized {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Rejected unauthorized request");
    if request.uri().path() == "/health" {
        metrics::record_health_request(StatusCode::UNAUTHORIZED.as_u16());
    }
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
