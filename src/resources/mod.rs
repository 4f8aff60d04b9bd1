//! External resources owned by the node.
//!
//! # Data Flow
//! ```text
//! NodeConfig.{database, documents, message_bus}
//!     → initializer.rs (one independent, bounded attempt per resource)
//!     → ResourceHandles (each handle optional)
//!     → shared via Arc with health probes, brokers and shutdown
//! ```
//!
//! # Design Decisions
//! - A failed resource leaves its handle empty; the node keeps running degraded
//! - Handles are written once at startup and never reconnected
//! - The core only sees the traits below; drivers live in their own modules

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::resilience::TimedOut;

pub mod database;
pub mod documents;
pub mod initializer;
pub mod message_bus;

pub use database::SqlDatabase;
pub use documents::DocumentStoreClient;
pub use initializer::{initialize, LiveResources, ResourceConnector};
pub use message_bus::HttpMessageBus;

/// Errors raised while creating or probing a resource.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{resource} configuration is missing '{field}'")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },
    #[error("unsupported {resource} type '{kind}'")]
    Unsupported { resource: &'static str, kind: String },
    #[error("invalid {resource} connection string: {reason}")]
    InvalidConnection {
        resource: &'static str,
        reason: String,
    },
    #[error("{resource} is unreachable: {reason}")]
    Unreachable {
        resource: &'static str,
        reason: String,
    },
    #[error("{resource} has been closed")]
    Closed { resource: &'static str },
    #[error(transparent)]
    TimedOut(#[from] TimedOut),
}

/// Relational database pool.
#[async_trait]
pub trait Database: Send + Sync {
    /// Driver name, for logs.
    fn driver(&self) -> &str;
    async fn ping(&self) -> Result<(), ResourceError>;
    async fn close(&self);
}

/// Document store client.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn database_name(&self) -> &str;
    async fn ping(&self) -> Result<(), ResourceError>;
    async fn disconnect(&self);
}

/// Message bus client.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn ping(&self) -> Result<(), ResourceError>;
    async fn stop(&self);
}

/// Handles to the node's external resources. Any of them may be absent.
#[derive(Clone, Default)]
pub struct ResourceHandles {
    pub database: Option<Arc<dyn Database>>,
    pub documents: Option<Arc<dyn DocumentStore>>,
    pub message_bus: Option<Arc<dyn MessageBus>>,
}

impl ResourceHandles {
    /// True when every resource came up.
    pub fn is_complete(&self) -> bool {
        self.database.is_some() && self.documents.is_some() && self.message_bus.is_some()
    }
}

impl fmt::Debug for ResourceHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandles")
            .field("database", &self.database.as_ref().map(|d| d.driver().to_string()))
            .field(
                "documents",
                &self.documents.as_ref().map(|d| d.database_name().to_string()),
            )
            .field("message_bus", &self.message_bus.is_some())
            .finish()
    }
}
