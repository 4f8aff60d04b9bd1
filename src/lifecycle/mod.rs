//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Identity → Resources → Registry first pass (task)
//!     → Heartbeat (task) + Monitor server + reload triggers (tasks)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel and join tasks → Close resources
//!     → Disconnect brokers → Close notification → Stop server → Grace pause
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//!     SIGHUP → Reload the broker registry
//! ```
//!
//! # Design Decisions
//! - One teardown path behind a one-shot latch
//! - Every background task is owned by the supervisor (supervisor.rs)
//! - Shutdown steps are bounded; overruns are aborted, not awaited

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownReport, ShutdownSettings, Teardown};
pub use startup::{launch, run, Connectors, RunningNode, StartupError};
pub use supervisor::{JoinReport, Supervisor};
