//! Health subsystem.
//!
//! # Data Flow
//! ```text
//! Registry snapshot
//!     → status.rs (liveness per entry, aggregate status; pure)
//!
//! Resource handles
//!     → probe.rs (concurrent bounded pings)
//!
//! snapshot.rs:
//!     NodeIdentity view + probe report + ServiceStatus + timestamp
//!     → /health handler, heartbeat ticks
//! ```
//!
//! # Design Decisions
//! - Status is recomputed on every request, never cached
//! - Probe deadlines are independent of request deadlines
//! - Liveness policy and the empty-registry answer are configuration

pub mod probe;
pub mod snapshot;
pub mod status;

pub use probe::{probe_resources, ComponentHealth, ComponentState, ProbeReport};
pub use snapshot::{HealthService, HealthSnapshot};
pub use status::{overall_status, LivenessPolicy, OverallStatus, ServiceStatus};
