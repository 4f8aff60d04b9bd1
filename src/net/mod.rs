//! Networking.
//!
//! # Design Decisions
//! - The monitor listener is bound once and handed to the server as-is

pub mod listener;

pub use listener::{bind_in_range, ListenerError};
