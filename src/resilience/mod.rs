//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external dependency:
//!     → timeouts.rs (every probe, connect and POST has a deadline)
//!     → On broker session loss: backoff.rs (delay before reconnecting)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Heartbeats are never retried in place; the next tick is the retry

pub mod backoff;
pub mod timeouts;

pub use backoff::Backoff;
pub use timeouts::{bounded, TimedOut};
