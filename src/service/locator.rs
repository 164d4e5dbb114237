//! Entry point locators: `module.path:attribute.path`.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorParseError {
    #[error("expected 'module:attribute'")]
    MissingSeparator,
    #[error("module path is empty")]
    EmptyModule,
    #[error("attribute path is empty")]
    EmptyAttribute,
    #[error("invalid path segment '{0}'")]
    InvalidSegment(String),
}

/// Describes how to find a service entry point in the [`ServiceRegistry`].
///
/// [`ServiceRegistry`]: crate::service::ServiceRegistry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryPointLocator {
    module: String,
    attribute: String,
}

impl EntryPointLocator {
    /// Build a locator without validation. Use `parse` for untrusted input.
    pub fn new(module: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            attribute: attribute.into(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl FromStr for EntryPointLocator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, attribute) = s
            .trim()
            .split_once(':')
            .ok_or(LocatorParseError::MissingSeparator)?;
        if module.is_empty() {
            return Err(LocatorParseError::EmptyModule);
        }
        if attribute.is_empty() {
            return Err(LocatorParseError::EmptyAttribute);
        }
        for segment in module.split('.').chain(attribute.split('.')) {
            let valid = !segment.is_empty()
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !segment.starts_with(|c: char| c.is_ascii_digit());
            if !valid {
                return Err(LocatorParseError::InvalidSegment(segment.to_string()));
            }
        }
        Ok(Self::new(module, attribute))
    }
}

impl std::fmt::Display for EntryPointLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.attribute)
    }
}
