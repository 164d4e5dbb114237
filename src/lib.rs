//! MCP Bootstrap Library
//!
//! Brings an HTTP-exposed MCP service online through an ordered chain of
//! fallback tiers, so that *something* always answers on the configured port.
//!
//! # Architecture Overview
//!
//! ```text
//!   RuntimeConfig (read once)
//!        │
//!        ▼
//!   ┌───────────┐   for each tier   ┌────────────┐     ┌──────────────┐
//!   │ Sequencer │ ────────────────▶ │  Strategy  │ ──▶ │  capability  │
//!   └─────┬─────┘                   └─────┬──────┘     │    probe     │
//!         │                               │            └──────────────┘
//!         │ first success                 ▼
//!         ▼                        ┌─────────────┐
//!   BoundServer::serve()  ◀─────── │  transport  │  full_async | minimal_async | raw_socket
//!                                  └─────────────┘
//!
//!   health-check (separate process) ──GET /mcp, /health, /──▶ whatever tier bound
//! ```

// Core subsystems
pub mod bootstrap;
pub mod capability;
pub mod config;
pub mod http;
pub mod service;
pub mod transport;

// Supporting layers
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use bootstrap::{BootstrapError, Sequencer, SequencerState};
pub use config::RuntimeConfig;
pub use health::HealthProber;
pub use transport::{BoundServer, TransportKind};
