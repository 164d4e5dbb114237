//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file (--config / BOOTSTRAP_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → environment overlay (PORT, HOST, BOOTSTRAP_*, MCP_PATH)
//!     → validation.rs (semantic checks, all errors at once)
//!         - listener and limits: fatal, the process exits
//!         - mcp_path and entry points: kept as service_issues
//!     → RuntimeConfig (resolved, immutable)
//!     → passed by reference to every tier
//! ```
//!
//! # Design Decisions
//! - Read exactly once at process start; there is no reload path
//! - All fields have defaults to allow running with no file at all
//! - OAuth variables are only checked for presence

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_runtime_config, ConfigError, Environment, ProcessEnvironment, StaticEnvironment};
pub use schema::{BootstrapFile, DeploymentProfile, EnvironmentSnapshot, OAuthFlags, RuntimeConfig};
pub use validation::{
    ValidationError, SETTING_ENTRY_POINT, SETTING_FALLBACK_ENTRY_POINT, SETTING_MCP_PATH,
};
