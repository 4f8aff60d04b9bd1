//! Node identity.
//!
//! # Responsibilities
//! - Generate the unique identifier and start time once per process
//! - Record the monitor port and host address discovered at startup
//! - Render the `Node` object sent with heartbeats and health responses

pub mod host;
pub mod identity;

pub use host::HostAddress;
pub use identity::{NodeIdentity, NodeView};
