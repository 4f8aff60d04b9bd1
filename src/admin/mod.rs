//! Local control surface.
//!
//! # Routes
//! - `GET /health`: node identity, probe report and broker status
//! - `POST /reloadconfig`: re-run the broker registry pass
//!
//! # Design Decisions
//! - Auth wraps each method handler, so a wrong method answers 405 before the key is checked
//! - A reload runs on its own task, so a request timeout cannot cancel a pass midway
//! - Unknown paths answer 404 without auth

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::brokers::ConnectionRegistry;
use crate::health::HealthService;

pub mod auth;
pub mod handlers;

use self::auth::require_api_key;
use self::handlers::{health, reload_config};

/// State shared by the control handlers.
#[derive(Clone)]
pub struct MonitorState {
    pub health: HealthService,
    pub registry: Arc<ConnectionRegistry>,
    /// Expected `Authorization` header value.
    pub authorization: Arc<str>,
}

impl MonitorState {
    pub fn new(health: HealthService, authorization: impl Into<Arc<str>>) -> Self {
        Self {
            registry: health.registry().clone(),
            health,
            authorization: authorization.into(),
        }
    }
}

pub fn setup_monitor_router(state: MonitorState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), require_api_key);
    Router::new()
        .route("/health", get(health).route_layer(auth.clone()))
        .route("/reloadconfig", post(reload_config).route_layer(auth))
        .with_state(state)
}
