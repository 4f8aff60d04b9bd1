//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Bound listener (net::listener)
//!     → server.rs (axum serve, trace + timeout layers)
//!     → admin router (auth, /health, /reloadconfig)
//! ```

pub mod server;

pub use server::{MonitorServer, ServerHandle};
