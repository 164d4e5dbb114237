//! Out-of-process health checking.
//!
//! # Data Flow
//! ```text
//! health-check binary
//!     → prober.rs (GET /mcp, /health, / in order, bounded timeout each)
//!     → ProbeOutcome per candidate (never aborts the rest)
//!     → ProbeReport (printed, then summarized)
//!     → exit 0 if any candidate answered with HTTP, else 1
//! ```
//!
//! # Design Decisions
//! - Responsiveness, not correctness: a 404 still proves a listener is up
//! - The prober shares no state with the server it checks

pub mod prober;

pub use prober::{
    default_base_url, HealthProber, ProbeError, ProbeOutcome, ProbeRecord, ProbeReport,
    CANDIDATE_PATHS, DEFAULT_TIMEOUT,
};
