//! Configuration schema definitions.
//!
//! `BootstrapFile` mirrors the optional TOML file; every field has a default
//! so an empty file (or no file) is valid. `RuntimeConfig` is the resolved,
//! immutable value the rest of the process reads.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::service::EntryPointLocator;
use crate::transport::{ServerLimits, TransportKind};

/// Default primary entry point.
pub const DEFAULT_ENTRY_POINT: &str = "atlassian_mcp.server:mcp";
/// Default secondary entry point, tried when the primary one is missing.
pub const DEFAULT_FALLBACK_ENTRY_POINT: &str = "atlassian_mcp:server.mcp";
/// Default primary protocol path. The trailing slash is significant.
pub const DEFAULT_MCP_PATH: &str = "/mcp/";
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// OAuth variables whose presence is reported. Values are never read past emptiness.
pub const OAUTH_VARIABLES: [&str; 5] = [
    "ATLASSIAN_OAUTH_CLIENT_ID",
    "ATLASSIAN_OAUTH_CLIENT_SECRET",
    "ATLASSIAN_OAUTH_REDIRECT_URI",
    "ATLASSIAN_OAUTH_SCOPE",
    "ATLASSIAN_OAUTH_CLOUD_ID",
];
/// The variable that decides whether OAuth counts as configured.
pub const OAUTH_CLIENT_ID_VARIABLE: &str = OAUTH_VARIABLES[0];

/// Number of environment variable names kept for diagnostics.
pub const ENVIRONMENT_PREVIEW_LEN: usize = 10;

/// How the process is launched, which decides the default port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentProfile {
    /// Run directly; default port 8000.
    #[default]
    Standalone,
    /// Run under a process supervisor; default port 10000.
    Supervised,
}

impl DeploymentProfile {
    pub fn default_port(&self) -> u16 {
        match self {
            DeploymentProfile::Standalone => 8000,
            DeploymentProfile::Supervised => 10000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentProfile::Standalone => "standalone",
            DeploymentProfile::Supervised => "supervised",
        }
    }
}

impl FromStr for DeploymentProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(DeploymentProfile::Standalone),
            "supervised" => Ok(DeploymentProfile::Supervised),
            other => Err(format!("unknown deployment profile '{}'", other)),
        }
    }
}

/// Root of the optional TOML configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BootstrapFile {
    pub server: ServerSection,
    pub service: ServiceSection,
    pub transports: TransportSection,
    pub supervisor: SupervisorSection,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    /// Kept wide so out-of-range values reach validation instead of failing to parse.
    pub port: Option<u32>,
    pub profile: DeploymentProfile,
    pub mcp_path: String,
    pub request_timeout_secs: u64,
    pub io_timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            profile: DeploymentProfile::default(),
            mcp_path: DEFAULT_MCP_PATH.to_string(),
            request_timeout_secs: 30,
            io_timeout_secs: 10,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Where to find the wrapped service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    pub entry_point: String,
    pub fallback_entry_point: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            fallback_entry_point: DEFAULT_FALLBACK_ENTRY_POINT.to_string(),
        }
    }
}

/// Transport availability.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransportSection {
    /// Transport kinds that must not be used on this host.
    pub disabled: Vec<TransportKind>,
}

/// Settings describing the supervisor contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorSection {
    /// Process name reported in startup logs.
    pub proc_name: String,
    /// Worker processes. Only one process may hold the port.
    pub workers: u32,
    /// Concurrent connections accepted by the minimal tier.
    pub worker_connections: usize,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            proc_name: "xerus-atlassian-mcp".to_string(),
            workers: 1,
            worker_connections: 1000,
            log_level: "info".to_string(),
        }
    }
}

/// Presence of each OAuth variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OAuthFlags {
    flags: BTreeMap<&'static str, bool>,
}

impl OAuthFlags {
    /// Build from a variable lookup; a variable counts only when non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flags = OAUTH_VARIABLES
            .iter()
            .map(|&name| {
                let present = lookup(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
                (name, present)
            })
            .collect();
        Self { flags }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// OAuth counts as configured when the client ID is present.
    pub fn enabled(&self) -> bool {
        self.is_set(OAUTH_CLIENT_ID_VARIABLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.flags.iter().map(|(name, present)| (*name, *present))
    }
}

/// Snapshot of the process environment taken once at startup, for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnvironmentSnapshot {
    pub working_dir: Option<PathBuf>,
    /// First few variable names, sorted. Values are never captured.
    pub variables: Vec<String>,
    pub total_variables: usize,
}

impl EnvironmentSnapshot {
    pub fn from_names(working_dir: Option<PathBuf>, mut names: Vec<String>) -> Self {
        names.sort();
        let total_variables = names.len();
        names.truncate(ENVIRONMENT_PREVIEW_LEN);
        Self {
            working_dir,
            variables: names,
            total_variables,
        }
    }
}

/// Resolved configuration, read once at process start and never mutated.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub profile: DeploymentProfile,
    pub mcp_path: String,
    /// `None` when the configured value did not parse.
    pub entry_point: Option<EntryPointLocator>,
    pub fallback_entry_point: Option<EntryPointLocator>,
    /// Invalid service settings. They keep the service tiers down, nothing else.
    pub service_issues: Vec<ValidationError>,
    pub disabled_transports: BTreeSet<TransportKind>,
    pub oauth: OAuthFlags,
    pub limits: ServerLimits,
    pub supervisor: SupervisorSection,
    pub environment: EnvironmentSnapshot,
}

impl RuntimeConfig {
    /// Defaults for everything except the bind address. No environment is read.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let file = BootstrapFile::default();
        Self {
            bind_host: host.into(),
            bind_port: port,
            profile: file.server.profile,
            mcp_path: file.server.mcp_path.clone(),
            entry_point: Some(EntryPointLocator::new("atlassian_mcp.server", "mcp")),
            fallback_entry_point: Some(EntryPointLocator::new("atlassian_mcp", "server.mcp")),
            service_issues: Vec::new(),
            disabled_transports: BTreeSet::new(),
            oauth: OAuthFlags::default(),
            limits: limits_from(&file.server, &file.supervisor),
            supervisor: file.supervisor,
            environment: EnvironmentSnapshot::default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    pub fn transport_enabled(&self, kind: TransportKind) -> bool {
        !self.disabled_transports.contains(&kind)
    }

    /// Whether a service setting passed validation.
    pub fn setting_valid(&self, setting: &str) -> bool {
        !self
            .service_issues
            .iter()
            .any(|issue| issue.service_setting() == Some(setting))
    }
}

pub(crate) fn limits_from(server: &ServerSection, supervisor: &SupervisorSection) -> ServerLimits {
    ServerLimits {
        request_timeout: Duration::from_secs(server.request_timeout_secs),
        io_timeout: Duration::from_secs(server.io_timeout_secs),
        max_body_bytes: server.max_body_bytes,
        max_connections: supervisor.worker_connections,
    }
}
