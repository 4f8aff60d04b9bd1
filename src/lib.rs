//! Broker node: lifecycle and health orchestration for a broker-connected
//! service instance.
//!
//! # Architecture Overview
//!
//! ```text
//!   config ──▶ resources ──▶ brokers (registry) ──┬──▶ heartbeat ──▶ management endpoint
//!                                                 │
//!                                                 └──▶ http server + admin ◀── operators
//!
//!   health: probes + aggregate status, read by heartbeat and /health
//!   lifecycle: startup, supervised tasks, signals, ordered shutdown
//! ```

// Core subsystems
pub mod config;
pub mod node;
pub mod resources;
pub mod brokers;

// Reporting and control
pub mod health;
pub mod heartbeat;
pub mod http;
pub mod net;
pub mod admin;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::NodeConfig;
pub use lifecycle::{launch, run, Connectors, RunningNode, ShutdownCoordinator, ShutdownOutcome};
