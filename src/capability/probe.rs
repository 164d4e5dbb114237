//! Probe backed by the service registry and the resolved configuration.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::capability::{Capability, CapabilityProbe};
use crate::config::{OAuthFlags, RuntimeConfig, ValidationError};
use crate::service::ServiceRegistry;
use crate::transport::TransportKind;

/// Answers capability questions about this process.
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    registry: Arc<ServiceRegistry>,
    disabled_transports: BTreeSet<TransportKind>,
    invalid_settings: BTreeSet<&'static str>,
    oauth: OAuthFlags,
}

impl EnvironmentProbe {
    pub fn new(registry: Arc<ServiceRegistry>, config: &RuntimeConfig) -> Self {
        Self {
            registry,
            disabled_transports: config.disabled_transports.clone(),
            invalid_settings: config
                .service_issues
                .iter()
                .filter_map(ValidationError::service_setting)
                .collect(),
            oauth: config.oauth.clone(),
        }
    }

    fn check(&self, capability: &Capability) -> bool {
        match capability {
            Capability::EntryPoint(locator) => match self.registry.check(locator) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(locator = %locator, error = %e, "Entry point not resolvable");
                    false
                }
            },
            Capability::Setting(name) => !self.invalid_settings.contains(name),
            Capability::Transport(kind) => !self.disabled_transports.contains(kind),
            Capability::OAuthConfigured => self.oauth.enabled(),
            Capability::All(parts) => parts.iter().all(|part| self.check(part)),
        }
    }
}

impl CapabilityProbe for EnvironmentProbe {
    fn probe(&self, capability: &Capability) -> bool {
        catch_unwind(AssertUnwindSafe(|| self.check(capability))).unwrap_or(false)
    }
}
