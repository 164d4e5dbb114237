//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port 1-65535, non-zero limits)
//! - Keep the primary path from shadowing the diagnostic paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: BootstrapFile → Result<(), Vec<ValidationError>>
//! - Runs after environment overrides are applied, before anything binds
//! - Only listener and limit errors are fatal. Service settings only
//!   disqualify the service tiers, so the degraded tiers still bind

use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::BootstrapFile;
use crate::service::EntryPointLocator;

/// Paths the bootstrapper serves itself on every tier.
pub const RESERVED_PATHS: [&str; 2] = ["/health", "/"];

/// Setting names used by `Capability::Setting`.
pub const SETTING_MCP_PATH: &str = "mcp_path";
pub const SETTING_ENTRY_POINT: &str = "entry_point";
pub const SETTING_FALLBACK_ENTRY_POINT: &str = "fallback_entry_point";

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port {0} is outside 1-65535")]
    PortOutOfRange(u32),
    #[error("bind host is empty")]
    EmptyHost,
    #[error("mcp path '{0}' must start with '/' and contain no wildcards, parameters or query")]
    InvalidMcpPath(String),
    #[error("mcp path '{0}' collides with a diagnostic path")]
    ReservedMcpPath(String),
    #[error("{setting} '{value}': {reason}")]
    EntryPoint {
        setting: &'static str,
        value: String,
        reason: String,
    },
    #[error("workers must be 1, got {0}")]
    Workers(u32),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl ValidationError {
    /// The service setting this error disqualifies, if it is not fatal.
    pub fn service_setting(&self) -> Option<&'static str> {
        match self {
            ValidationError::InvalidMcpPath(_) | ValidationError::ReservedMcpPath(_) => {
                Some(SETTING_MCP_PATH)
            }
            ValidationError::EntryPoint { setting, .. } => Some(*setting),
            _ => None,
        }
    }
}

/// Validate the settings every tier depends on. Any error here is fatal.
pub fn validate_config(file: &BootstrapFile) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(port) = file.server.port {
        if !(1..=65535).contains(&port) {
            errors.push(ValidationError::PortOutOfRange(port));
        }
    }

    if file.server.host.as_deref().is_some_and(|host| host.trim().is_empty()) {
        errors.push(ValidationError::EmptyHost);
    }

    if file.supervisor.workers != 1 {
        errors.push(ValidationError::Workers(file.supervisor.workers));
    }
    if file.supervisor.worker_connections == 0 {
        errors.push(ValidationError::Zero("supervisor.worker_connections"));
    }
    if file.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if file.server.io_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.io_timeout_secs"));
    }
    if file.server.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("server.max_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the settings only the service tiers read.
///
/// Errors here are reported but never stop the process.
pub fn validate_service(file: &BootstrapFile) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let path = &file.server.mcp_path;
    if !is_literal_path(path) {
        errors.push(ValidationError::InvalidMcpPath(path.clone()));
    } else if RESERVED_PATHS.contains(&path.as_str()) {
        errors.push(ValidationError::ReservedMcpPath(path.clone()));
    }

    let entry_points = [
        (SETTING_ENTRY_POINT, &file.service.entry_point),
        (SETTING_FALLBACK_ENTRY_POINT, &file.service.fallback_entry_point),
    ];
    for (setting, value) in entry_points {
        if let Err(e) = EntryPointLocator::from_str(value) {
            errors.push(ValidationError::EntryPoint {
                setting,
                value: value.clone(),
                reason: e.to_string(),
            });
        }
    }

    errors
}

/// A path usable as an exact route on every transport.
fn is_literal_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}', '?', '#'])
        && !path.chars().any(char::is_whitespace)
        && !path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let file = BootstrapFile::default();
        assert!(validate_config(&file).is_ok());
        assert!(validate_service(&file).is_empty());
    }

    #[test]
    fn collects_every_error() {
        let mut file = BootstrapFile::default();
        file.server.port = Some(70000);
        file.server.max_body_bytes = 0;
        file.supervisor.workers = 4;

        let errors = validate_config(&file).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::PortOutOfRange(70000)));
        assert!(errors.contains(&ValidationError::Workers(4)));
    }

    #[test]
    fn service_settings_are_not_fatal() {
        let mut file = BootstrapFile::default();
        file.server.mcp_path = "mcp".to_string();
        file.service.entry_point = "no-colon".to_string();
        file.service.fallback_entry_point = "also-no-colon".to_string();

        assert!(validate_config(&file).is_ok());
        let settings: Vec<_> = validate_service(&file)
            .iter()
            .filter_map(ValidationError::service_setting)
            .collect();
        assert_eq!(
            settings,
            vec![SETTING_MCP_PATH, SETTING_ENTRY_POINT, SETTING_FALLBACK_ENTRY_POINT]
        );
    }

    #[test]
    fn port_zero_is_rejected() {
        let mut file = BootstrapFile::default();
        file.server.port = Some(0);
        assert_eq!(
            validate_config(&file).unwrap_err(),
            vec![ValidationError::PortOutOfRange(0)]
        );
    }

    #[test]
    fn mcp_path_rules() {
        let mut file = BootstrapFile::default();
        for ok in ["/mcp", "/mcp/", "/api/mcp/"] {
            file.server.mcp_path = ok.to_string();
            assert!(validate_service(&file).is_empty(), "{ok} should be valid");
        }
        for bad in ["/mcp/{id}", "/:mcp", "/*rest", "/mcp?x=1", "/m cp"] {
            file.server.mcp_path = bad.to_string();
            assert!(!validate_service(&file).is_empty(), "{bad} should be invalid");
        }
        file.server.mcp_path = "/health".to_string();
        assert_eq!(
            validate_service(&file),
            vec![ValidationError::ReservedMcpPath("/health".to_string())]
        );
    }
}
