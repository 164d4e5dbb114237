//! A single tier attempt: probe, acquire, route, bind.

use std::sync::Arc;

use thiserror::Error;

use crate::bootstrap::surface::{degraded_routes, service_routes};
use crate::bootstrap::StrategyDescriptor;
use crate::capability::{Capability, CapabilityProbe};
use crate::config::RuntimeConfig;
use crate::lifecycle::Shutdown;
use crate::service::{EntryPointError, ServiceRegistry};
use crate::transport::{BindTarget, BoundServer, TransportAdapter, TransportError};

/// Why a tier could not bind.
#[derive(Debug, Error)]
pub enum StrategyFailure {
    /// The tier's requirement is missing. Expected on degraded hosts.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(Capability),
    #[error("entry point construction failed: {0}")]
    EntryPointConstruction(#[source] EntryPointError),
    /// The transport refused the route table.
    #[error("routes rejected: {0}")]
    InvalidRoutes(#[source] TransportError),
    #[error("bind failed: {0}")]
    BindFailure(#[source] TransportError),
}

impl StrategyFailure {
    /// Whether this failure is an ordinary "not on this host" outcome.
    pub fn is_expected(&self) -> bool {
        matches!(self, StrategyFailure::CapabilityUnavailable(_))
    }
}

impl From<TransportError> for StrategyFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::UnsupportedHandler { .. } => StrategyFailure::InvalidRoutes(err),
            other => StrategyFailure::BindFailure(other),
        }
    }
}

/// A failed tier, kept by the sequencer for inspection.
#[derive(Debug, Error)]
#[error("tier {tier} ({name}) failed: {cause}")]
pub struct StrategyFailed {
    pub tier: u8,
    pub name: String,
    #[source]
    pub cause: StrategyFailure,
}

/// What every attempt reads. Shared by all tiers of one run.
pub struct BootstrapContext<'a> {
    pub config: &'a RuntimeConfig,
    pub probe: &'a dyn CapabilityProbe,
    pub registry: &'a ServiceRegistry,
    /// In-process stop trigger handed to the async tiers.
    pub shutdown: Option<Shutdown>,
}

impl<'a> BootstrapContext<'a> {
    pub fn new(
        config: &'a RuntimeConfig,
        probe: &'a dyn CapabilityProbe,
        registry: &'a ServiceRegistry,
    ) -> Self {
        Self {
            config,
            probe,
            registry,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// A descriptor paired with the adapter that serves it.
#[derive(Clone)]
pub struct Strategy {
    descriptor: StrategyDescriptor,
    adapter: Arc<dyn TransportAdapter>,
}

impl Strategy {
    pub fn new(descriptor: StrategyDescriptor, adapter: Arc<dyn TransportAdapter>) -> Self {
        Self {
            descriptor,
            adapter,
        }
    }

    pub fn descriptor(&self) -> &StrategyDescriptor {
        &self.descriptor
    }

    pub fn tier(&self) -> u8 {
        self.descriptor.tier
    }

    /// Try to bring this tier up. Returns the bound server without serving.
    pub fn attempt(&self, ctx: &BootstrapContext<'_>) -> Result<BoundServer, StrategyFailed> {
        self.try_bind(ctx).map_err(|cause| StrategyFailed {
            tier: self.descriptor.tier,
            name: self.descriptor.name.clone(),
            cause,
        })
    }

    fn try_bind(&self, ctx: &BootstrapContext<'_>) -> Result<BoundServer, StrategyFailure> {
        let required = &self.descriptor.required_capability;
        if !ctx.probe.probe(required) {
            let missing = ctx.probe.first_missing(required).unwrap_or_else(|| required.clone());
            return Err(StrategyFailure::CapabilityUnavailable(missing));
        }

        let routes = if self.descriptor.degraded {
            degraded_routes(&self.descriptor, ctx.config)
        } else {
            let locator = self
                .descriptor
                .entry_point
                .as_ref()
                .ok_or_else(|| StrategyFailure::CapabilityUnavailable(required.clone()))?;
            let service = ctx
                .registry
                .construct(locator, ctx.config)
                .map_err(StrategyFailure::EntryPointConstruction)?;
            service_routes(&self.descriptor, ctx.config, service)
        };

        let path_prefix = (!self.descriptor.degraded).then(|| ctx.config.mcp_path.clone());
        let mut target = BindTarget::from_config(ctx.config, path_prefix);
        if let Some(shutdown) = &ctx.shutdown {
            target = target.with_shutdown(shutdown.clone());
        }

        Ok(self.adapter.bind(&target, routes)?)
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("descriptor", &self.descriptor)
            .field("transport", &self.adapter.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapPlan;
    use crate::capability::EnvironmentProbe;
    use crate::config::ValidationError;
    use crate::http::{Handler, RouteTable, ServiceResponse};
    use crate::service::{builtin_registry, EntryPointLocator};
    use crate::transport::{adapter_for, TransportKind};
    use axum::http::{Method, StatusCode};

    fn config() -> RuntimeConfig {
        RuntimeConfig::new("127.0.0.1", 0)
    }

    #[test]
    fn missing_entry_point_is_capability_unavailable() {
        let mut config = config();
        config.entry_point = Some(EntryPointLocator::new("not_installed", "mcp"));
        let registry = Arc::new(builtin_registry());
        let probe = EnvironmentProbe::new(Arc::clone(&registry), &config);
        let ctx = BootstrapContext::new(&config, &probe, &registry);

        let descriptor = BootstrapPlan::standard(&config).descriptors()[0].clone();
        let strategy = Strategy::new(descriptor, adapter_for(TransportKind::FullAsync));

        let failed = strategy.attempt(&ctx).unwrap_err();
        assert_eq!(failed.tier, 1);
        assert!(failed.cause.is_expected());
        assert!(matches!(
            failed.cause,
            StrategyFailure::CapabilityUnavailable(Capability::EntryPoint(_))
        ));
    }

    #[test]
    fn reserved_mcp_path_skips_service_tiers() {
        let mut config = config();
        config.mcp_path = "/health".to_string();
        config.service_issues = vec![ValidationError::ReservedMcpPath("/health".to_string())];
        let registry = Arc::new(builtin_registry());
        let probe = EnvironmentProbe::new(Arc::clone(&registry), &config);
        let ctx = BootstrapContext::new(&config, &probe, &registry);

        for descriptor in &BootstrapPlan::standard(&config).descriptors()[..2] {
            let failed = Strategy::new(descriptor.clone(), adapter_for(TransportKind::FullAsync))
                .attempt(&ctx)
                .unwrap_err();
            assert!(matches!(
                failed.cause,
                StrategyFailure::CapabilityUnavailable(Capability::Setting("mcp_path"))
            ));
        }
    }

    #[test]
    fn panicking_service_is_construction_failure() {
        let config = config();
        let mut registry = ServiceRegistry::new();
        registry.register(config.entry_point.clone().unwrap(), |_| panic!("boom"));
        let registry = Arc::new(registry);
        let probe = EnvironmentProbe::new(Arc::clone(&registry), &config);
        let ctx = BootstrapContext::new(&config, &probe, &registry);

        let descriptor = BootstrapPlan::standard(&config).descriptors()[0].clone();
        let failed = Strategy::new(descriptor, adapter_for(TransportKind::FullAsync))
            .attempt(&ctx)
            .unwrap_err();
        assert!(matches!(failed.cause, StrategyFailure::EntryPointConstruction(_)));
        assert!(!failed.cause.is_expected());
    }

    #[test]
    fn degraded_tier_binds_raw_socket() {
        let config = config();
        let registry = Arc::new(ServiceRegistry::new());
        let probe = EnvironmentProbe::new(Arc::clone(&registry), &config);
        let ctx = BootstrapContext::new(&config, &probe, &registry);

        let descriptor = BootstrapPlan::standard(&config).descriptors()[3].clone();
        let bound = Strategy::new(descriptor, adapter_for(TransportKind::RawSocket))
            .attempt(&ctx)
            .unwrap();
        assert_eq!(bound.kind(), TransportKind::RawSocket);
        assert_ne!(bound.local_addr().port(), 0);
    }

    #[test]
    fn unsupported_handler_maps_to_invalid_routes() {
        let err = TransportError::UnsupportedHandler {
            kind: TransportKind::RawSocket,
            path: "/mcp/".to_string(),
        };
        assert!(matches!(StrategyFailure::from(err), StrategyFailure::InvalidRoutes(_)));

        // The raw tier refuses async handlers before binding.
        let routes = RouteTable::new().route(
            Method::POST,
            "/mcp/",
            Handler::from_async(|_| async { ServiceResponse::empty(StatusCode::OK) }),
        );
        let err = adapter_for(TransportKind::RawSocket)
            .bind(&BindTarget::new("127.0.0.1", 0), routes)
            .unwrap_err();
        assert!(matches!(StrategyFailure::from(err), StrategyFailure::InvalidRoutes(_)));
    }
}
