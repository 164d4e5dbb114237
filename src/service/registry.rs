//! Registry of service entry points.
//!
//! # Responsibilities
//! - Map `module` → `attribute` → factory
//! - Answer "does this locator resolve?" without constructing anything
//! - Construct a service, turning factory errors and panics into `EntryPointError`

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::service::{EntryPointLocator, ServiceEntryPoint};

type ServiceFactory =
    dyn Fn(&RuntimeConfig) -> Result<Arc<dyn ServiceEntryPoint>, EntryPointError> + Send + Sync;

/// Error type for entry point resolution and construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryPointError {
    #[error("no module named '{0}'")]
    ModuleNotFound(String),
    #[error("module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound { module: String, attribute: String },
    #[error("construction of {locator} failed: {reason}")]
    Construction { locator: String, reason: String },
}

/// Named service factories, keyed by module then attribute path.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    modules: BTreeMap<String, BTreeMap<String, Arc<ServiceFactory>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `locator`, replacing any earlier one.
    pub fn register<F>(&mut self, locator: EntryPointLocator, factory: F) -> &mut Self
    where
        F: Fn(&RuntimeConfig) -> Result<Arc<dyn ServiceEntryPoint>, EntryPointError>
            + Send
            + Sync
            + 'static,
    {
        self.modules
            .entry(locator.module().to_string())
            .or_default()
            .insert(locator.attribute().to_string(), Arc::new(factory));
        self
    }

    /// Look up a factory. Never runs it.
    fn resolve(&self, locator: &EntryPointLocator) -> Result<&Arc<ServiceFactory>, EntryPointError> {
        let module = self
            .modules
            .get(locator.module())
            .ok_or_else(|| EntryPointError::ModuleNotFound(locator.module().to_string()))?;
        module
            .get(locator.attribute())
            .ok_or_else(|| EntryPointError::AttributeNotFound {
                module: locator.module().to_string(),
                attribute: locator.attribute().to_string(),
            })
    }

    /// Check that the locator resolves, without side effects.
    pub fn check(&self, locator: &EntryPointLocator) -> Result<(), EntryPointError> {
        self.resolve(locator).map(|_| ())
    }

    pub fn contains(&self, locator: &EntryPointLocator) -> bool {
        self.check(locator).is_ok()
    }

    /// Run the factory for `locator`. A panic inside the factory is reported
    /// as a construction error.
    pub fn construct(
        &self,
        locator: &EntryPointLocator,
        config: &RuntimeConfig,
    ) -> Result<Arc<dyn ServiceEntryPoint>, EntryPointError> {
        let factory = self.resolve(locator)?;
        match catch_unwind(AssertUnwindSafe(|| factory(config))) {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "factory panicked".to_string());
                Err(EntryPointError::Construction {
                    locator: locator.to_string(),
                    reason,
                })
            }
        }
    }

    /// All registered locators, sorted.
    pub fn locators(&self) -> Vec<EntryPointLocator> {
        self.modules
            .iter()
            .flat_map(|(module, attributes)| {
                attributes
                    .keys()
                    .map(move |attribute| EntryPointLocator::new(module.clone(), attribute.clone()))
            })
            .collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("locators", &self.locators())
            .finish()
    }
}
