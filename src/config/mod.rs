//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! node config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NodeConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! broker file (JSON)
//!     → brokers.rs (parse)
//!     → re-read on every registry pass
//!     → watcher.rs signals changes when enabled
//! ```
//!
//! # Design Decisions
//! - Node config is loaded once; a bad file stops the process before anything starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod brokers;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use brokers::{BrokerFile, BrokerSettings, TopicSubscription};
pub use loader::{load_config, ConfigError};
pub use schema::{
    AppServerConfig, BrokerLiveness, DatabaseConfig, DocumentConfig, EmptyRegistryStatus,
    HealthConfig, LogConfig, LogFormat, MessageBusConfig, MonitorConfig, NodeConfig, ReloadMode,
};
