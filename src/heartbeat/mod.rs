//! Reporting to the management endpoint.
//!
//! # Data Flow
//! ```text
//! scheduler.rs: interval tick
//!     → HealthService snapshot
//!     → client.rs: POST <app-server>/IACComponents/heartbeat
//!
//! Shutdown:
//!     → client.rs: POST <app-server>/IACComponents/close
//! ```
//!
//! # Design Decisions
//! - No retries; the next tick is the retry
//! - The close notification is sent once, best effort

pub mod client;
pub mod scheduler;

pub use client::{ManagementClient, Report, ReportError};
pub use scheduler::HeartbeatScheduler;
