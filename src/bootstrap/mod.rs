//! Degrading bootstrap.
//!
//! # Data Flow
//! ```text
//! RuntimeConfig
//!     → plan.rs (BootstrapPlan::standard: four tiers, fixed order)
//!     → sequencer.rs (for each tier, ascending)
//!         → strategy.rs
//!             1. probe required capability      → CapabilityUnavailable
//!             2. construct entry point if any   → EntryPointConstruction
//!             3. surface.rs builds the routes
//!             4. adapter.bind                   → BindFailure | InvalidRoutes
//!     → first BoundServer serves; all failed → AllTiersExhausted
//! ```
//!
//! # Design Decisions
//! - At most one tier holds the port; nothing below it is attempted
//! - Tiers run strictly one after another, never concurrently
//! - A serving error after bind is fatal; there is no hot swap to a lower tier

pub mod plan;
pub mod sequencer;
pub mod strategy;
pub mod surface;

pub use plan::{BootstrapPlan, StrategyDescriptor, TierSummary};
pub use sequencer::{BootstrapError, Sequencer, SequencerState, ServingTier};
pub use strategy::{BootstrapContext, Strategy, StrategyFailed, StrategyFailure};
