//! Walks the tiers in order and serves on the first that binds.
//!
//! ```text
//! Pending(first) ──attempt ok──▶ Serving(tier)   (blocks in serve)
//!       │
//!       └─attempt failed─▶ Pending(next) ... ─▶ Exhausted   (fatal)
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::bootstrap::strategy::{BootstrapContext, Strategy, StrategyFailed};
use crate::bootstrap::BootstrapPlan;
use crate::transport::{adapter_for, BoundServer, TransportAdapter, TransportError, TransportKind};

/// Sequencer position, by tier number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Pending(u8),
    Serving(u8),
    Exhausted,
}

/// Error type for a bootstrap run.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("all {attempted} bootstrap tiers failed")]
    AllTiersExhausted { attempted: usize },
    #[error("bootstrap already ran")]
    AlreadyStarted,
    #[error("tier {tier} ({name}) stopped serving: {source}")]
    Serve {
        tier: u8,
        name: String,
        #[source]
        source: TransportError,
    },
}

/// The tier that bound the port, ready to serve.
#[derive(Debug)]
pub struct ServingTier {
    pub tier: u8,
    pub name: String,
    pub server: BoundServer,
}

impl ServingTier {
    /// Serve for the rest of the process lifetime.
    pub fn serve(self) -> Result<(), BootstrapError> {
        let ServingTier { tier, name, server } = self;
        server.serve().map_err(|source| BootstrapError::Serve { tier, name, source })
    }
}

/// Ordered fallback over strategies. Tiers are tried strictly one at a time.
pub struct Sequencer {
    strategies: Vec<Strategy>,
    cursor: usize,
    state: SequencerState,
    failures: Vec<StrategyFailed>,
}

impl Sequencer {
    pub fn new(mut strategies: Vec<Strategy>) -> Self {
        strategies.sort_by_key(Strategy::tier);
        let state = strategies
            .first()
            .map(|strategy| SequencerState::Pending(strategy.tier()))
            .unwrap_or(SequencerState::Exhausted);
        Self {
            strategies,
            cursor: 0,
            state,
            failures: Vec::new(),
        }
    }

    /// Pair each descriptor with the production adapter for its transport.
    pub fn from_plan(plan: BootstrapPlan) -> Self {
        Self::with_adapters(plan, adapter_for)
    }

    pub fn with_adapters(
        plan: BootstrapPlan,
        adapters: impl Fn(TransportKind) -> Arc<dyn TransportAdapter>,
    ) -> Self {
        let strategies = plan
            .into_descriptors()
            .into_iter()
            .map(|descriptor| {
                let adapter = adapters(descriptor.transport);
                Strategy::new(descriptor, adapter)
            })
            .collect();
        Self::new(strategies)
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Failed tiers, in the order they were attempted.
    pub fn failures(&self) -> &[StrategyFailed] {
        &self.failures
    }

    /// Tier numbers attempted so far, including the one serving.
    pub fn attempted(&self) -> Vec<u8> {
        let mut attempted: Vec<u8> = self.failures.iter().map(|failure| failure.tier).collect();
        if let SequencerState::Serving(tier) = self.state {
            attempted.push(tier);
        }
        attempted
    }

    /// Attempt tiers until one binds. Never attempts a tier after a success.
    pub fn select(&mut self, ctx: &BootstrapContext<'_>) -> Result<ServingTier, BootstrapError> {
        if self.cursor > 0 || matches!(self.state, SequencerState::Serving(_)) {
            return Err(BootstrapError::AlreadyStarted);
        }

        while let Some(strategy) = self.strategies.get(self.cursor) {
            self.cursor += 1;
            match strategy.attempt(ctx) {
                Ok(server) => {
                    let descriptor = strategy.descriptor();
                    self.state = SequencerState::Serving(descriptor.tier);
                    tracing::info!(
                        tier = descriptor.tier,
                        name = %descriptor.name,
                        transport = %server.kind(),
                        address = %server.local_addr(),
                        degraded = descriptor.degraded,
                        "Tier bound, serving"
                    );
                    return Ok(ServingTier {
                        tier: descriptor.tier,
                        name: descriptor.name.clone(),
                        server,
                    });
                }
                Err(failed) => {
                    if failed.cause.is_expected() {
                        tracing::info!(
                            tier = failed.tier,
                            name = %failed.name,
                            cause = %failed.cause,
                            "Tier skipped"
                        );
                    } else {
                        tracing::error!(
                            tier = failed.tier,
                            name = %failed.name,
                            cause = %failed.cause,
                            "Tier failed"
                        );
                    }
                    self.failures.push(failed);
                    self.state = self
                        .strategies
                        .get(self.cursor)
                        .map(|next| SequencerState::Pending(next.tier()))
                        .unwrap_or(SequencerState::Exhausted);
                }
            }
        }

        self.state = SequencerState::Exhausted;
        tracing::error!(attempted = self.failures.len(), "All bootstrap tiers failed");
        Err(BootstrapError::AllTiersExhausted {
            attempted: self.failures.len(),
        })
    }

    /// Select a tier and serve on it until shutdown.
    pub fn run(mut self, ctx: &BootstrapContext<'_>) -> Result<(), BootstrapError> {
        self.select(ctx)?.serve()
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("strategies", &self.strategies)
            .field("state", &self.state)
            .field("failures", &self.failures.len())
            .finish()
    }
}
