//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (tier, name, cause, address)
//!     → spans per connection (minimal tier) or per request (TraceLayer, full tier)
//!
//! Consumers:
//!     → logging.rs installs the fmt subscriber (stderr)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Request ID flows from the x-request-id header into the request span

pub mod logging;

pub use logging::{default_filter, init_logging};
