//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Init logging → Sequencer picks a tier → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → async tiers stop accepting → drain → exit 0
//! ```
//!
//! # Design Decisions
//! - The external supervisor owns restarts; nothing here respawns a tier
//! - The raw socket tier has no graceful path; the signal terminates it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
