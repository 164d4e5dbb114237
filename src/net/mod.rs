//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (connection ID for log correlation)
//!     → Hand off to the minimal HTTP tier
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - The full tier relies on axum's own accept loop; the raw tier on std

pub mod connection;
pub mod listener;

pub use connection::ConnectionId;
pub use listener::{ConnectionPermit, Listener, ListenerError};
