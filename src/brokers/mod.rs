//! Broker connection registry.
//!
//! # Data Flow
//! ```text
//! broker file (JSON)
//!     → registry.rs (one pass: read, connect each broker, commit, subscribe)
//!     → connection.rs (BrokerConnection per declared broker)
//!     → mqtt.rs (session + event loop feeding the contact clock)
//!
//! Readers (health, heartbeat) take lock-free snapshots of the registry.
//! ```
//!
//! # Design Decisions
//! - A broker that cannot be reached is still registered, without a session
//! - Passes are serialized; insertion order is file order
//! - Additive reload keeps earlier entries; replace mode retires them

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::{BrokerSettings, TopicSubscription};
use crate::resilience::TimedOut;
use crate::resources::ResourceHandles;

pub mod connection;
pub mod mqtt;
pub mod registry;

pub use connection::{BrokerConnection, ContactClock};
pub use mqtt::MqttConnector;
pub use registry::{ConnectionRegistry, PassSummary, RegistryError};

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker {host} refused the session: {reason}")]
    Connect { host: String, reason: String },
    #[error("subscription to '{topic}' on {host} failed: {reason}")]
    Subscribe {
        host: String,
        topic: String,
        reason: String,
    },
    #[error(transparent)]
    TimedOut(#[from] TimedOut),
}

/// A live session with one broker.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    async fn subscribe(&self, topics: &[TopicSubscription]) -> Result<(), BrokerError>;

    /// When the broker was last heard from.
    fn last_contact(&self) -> Option<Instant>;

    async fn disconnect(&self);
}

/// Opens broker sessions.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(
        &self,
        settings: &BrokerSettings,
        resources: &Arc<ResourceHandles>,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError>;
}
