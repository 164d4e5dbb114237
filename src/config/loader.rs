//! Configuration loading: optional TOML file, then environment overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{
    limits_from, BootstrapFile, DeploymentProfile, EnvironmentSnapshot, OAuthFlags, RuntimeConfig,
    DEFAULT_HOST,
};
use crate::config::validation::{validate_config, validate_service, ValidationError};
use crate::service::EntryPointLocator;
use crate::transport::TransportKind;

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PROFILE: &str = "BOOTSTRAP_PROFILE";
pub const ENV_MCP_PATH: &str = "MCP_PATH";
pub const ENV_ENTRY_POINT: &str = "BOOTSTRAP_ENTRY_POINT";
pub const ENV_FALLBACK_ENTRY_POINT: &str = "BOOTSTRAP_FALLBACK_ENTRY_POINT";
pub const ENV_DISABLED_TRANSPORTS: &str = "BOOTSTRAP_DISABLED_TRANSPORTS";
pub const ENV_CONFIG: &str = "BOOTSTRAP_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {variable}: '{value}' ({reason})")]
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source of environment variables and process facts.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
    /// Names of all variables; values are not needed.
    fn names(&self) -> Vec<String>;
    fn current_dir(&self) -> Option<PathBuf>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn names(&self) -> Vec<String> {
        std::env::vars_os()
            .map(|(name, _)| name.to_string_lossy().into_owned())
            .collect()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}

/// A fixed environment, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    vars: BTreeMap<String, String>,
    current_dir: Option<PathBuf>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        self.current_dir.clone()
    }
}

/// Load and parse a TOML configuration file.
pub fn load_file(path: &Path) -> Result<BootstrapFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the runtime configuration.
///
/// Precedence, lowest first: built-in defaults, the TOML file, environment
/// variables, then `profile_override` (the command line).
pub fn load_runtime_config(
    path: Option<&Path>,
    profile_override: Option<DeploymentProfile>,
    env: &dyn Environment,
) -> Result<RuntimeConfig, ConfigError> {
    let mut file = match path {
        Some(path) => load_file(path)?,
        None => BootstrapFile::default(),
    };

    apply_environment(&mut file, env)?;
    if let Some(profile) = profile_override {
        file.server.profile = profile;
    }
    if file.server.port.is_none() {
        file.server.port = Some(u32::from(file.server.profile.default_port()));
    }

    validate_config(&file).map_err(ConfigError::Validation)?;
    resolve(file, env)
}

/// Overlay environment variables onto the file. Empty values count as unset.
fn apply_environment(file: &mut BootstrapFile, env: &dyn Environment) -> Result<(), ConfigError> {
    let var = |name: &str| env.var(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var(ENV_HOST) {
        file.server.host = Some(host.trim().to_string());
    }
    if let Some(port) = var(ENV_PORT) {
        let parsed = port.trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
            variable: ENV_PORT,
            value: port.clone(),
            reason: e.to_string(),
        })?;
        file.server.port = Some(parsed);
    }
    if let Some(profile) = var(ENV_PROFILE) {
        file.server.profile =
            DeploymentProfile::from_str(&profile).map_err(|reason| ConfigError::InvalidValue {
                variable: ENV_PROFILE,
                value: profile.clone(),
                reason,
            })?;
    }
    if let Some(path) = var(ENV_MCP_PATH) {
        file.server.mcp_path = path;
    }
    if let Some(entry_point) = var(ENV_ENTRY_POINT) {
        file.service.entry_point = entry_point.trim().to_string();
    }
    if let Some(entry_point) = var(ENV_FALLBACK_ENTRY_POINT) {
        file.service.fallback_entry_point = entry_point.trim().to_string();
    }
    if let Some(disabled) = var(ENV_DISABLED_TRANSPORTS) {
        file.transports.disabled = disabled
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(|item| {
                TransportKind::from_str(item).map_err(|reason| ConfigError::InvalidValue {
                    variable: ENV_DISABLED_TRANSPORTS,
                    value: disabled.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(())
}

fn resolve(file: BootstrapFile, env: &dyn Environment) -> Result<RuntimeConfig, ConfigError> {
    let service_issues = validate_service(&file);
    let entry_point = EntryPointLocator::from_str(&file.service.entry_point).ok();
    let fallback_entry_point = EntryPointLocator::from_str(&file.service.fallback_entry_point).ok();

    let port = file.server.port.unwrap_or_else(|| u32::from(file.server.profile.default_port()));
    let bind_port = u16::try_from(port)
        .map_err(|_| ConfigError::Validation(vec![ValidationError::PortOutOfRange(port)]))?;

    Ok(RuntimeConfig {
        bind_host: file
            .server
            .host
            .clone()
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        bind_port,
        profile: file.server.profile,
        mcp_path: file.server.mcp_path.clone(),
        entry_point,
        fallback_entry_point,
        service_issues,
        disabled_transports: file.transports.disabled.iter().copied().collect(),
        oauth: OAuthFlags::from_lookup(|name| env.var(name)),
        limits: limits_from(&file.server, &file.supervisor),
        supervisor: file.supervisor,
        environment: EnvironmentSnapshot::from_names(env.current_dir(), env.names()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::{SETTING_ENTRY_POINT, SETTING_FALLBACK_ENTRY_POINT, SETTING_MCP_PATH};
    use std::io::Write;

    #[test]
    fn defaults_without_file_or_env() {
        let config = load_runtime_config(None, None, &StaticEnvironment::new()).unwrap();
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.bind_port, 8000);
        assert_eq!(config.mcp_path, "/mcp/");
        assert_eq!(
            config.entry_point.map(|locator| locator.to_string()).as_deref(),
            Some("atlassian_mcp.server:mcp")
        );
        assert!(config.service_issues.is_empty());
        assert!(!config.oauth.enabled());
    }

    #[test]
    fn supervised_profile_defaults_to_10000() {
        let env = StaticEnvironment::new().with(ENV_PROFILE, "supervised");
        let config = load_runtime_config(None, None, &env).unwrap();
        assert_eq!(config.bind_port, 10000);

        let config =
            load_runtime_config(None, Some(DeploymentProfile::Standalone), &env).unwrap();
        assert_eq!(config.bind_port, 8000);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"127.0.0.1\"\nport = 9100\nmcp_path = \"/mcp\"\n"
        )
        .unwrap();

        let env = StaticEnvironment::new()
            .with(ENV_PORT, "9001")
            .with("ATLASSIAN_OAUTH_CLIENT_ID", "abc")
            .with_current_dir("/srv/app");
        let config = load_runtime_config(Some(file.path()), None, &env).unwrap();

        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.bind_port, 9001);
        assert_eq!(config.mcp_path, "/mcp");
        assert!(config.oauth.enabled());
        assert_eq!(config.environment.working_dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.environment.total_variables, 2);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let env = StaticEnvironment::new().with(ENV_PORT, "eighty");
        let err = load_runtime_config(None, None, &env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { variable: "PORT", .. }));
    }

    #[test]
    fn out_of_range_port_fails_validation() {
        let env = StaticEnvironment::new().with(ENV_PORT, "65536");
        let err = load_runtime_config(None, None, &env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors)
            if errors == &vec![ValidationError::PortOutOfRange(65536)]));
    }

    #[test]
    fn malformed_service_settings_still_load() {
        let env = StaticEnvironment::new()
            .with(ENV_ENTRY_POINT, "atlassian_mcp.server")
            .with(ENV_MCP_PATH, "/health");
        let config = load_runtime_config(None, None, &env).unwrap();

        assert!(config.entry_point.is_none());
        assert!(config.fallback_entry_point.is_some());
        assert!(!config.setting_valid(SETTING_ENTRY_POINT));
        assert!(!config.setting_valid(SETTING_MCP_PATH));
        assert!(config.setting_valid(SETTING_FALLBACK_ENTRY_POINT));
        assert_eq!(config.service_issues.len(), 2);
    }

    #[test]
    fn empty_port_counts_as_unset() {
        let env = StaticEnvironment::new().with(ENV_PORT, "");
        let config = load_runtime_config(None, None, &env).unwrap();
        assert_eq!(config.bind_port, 8000);
    }

    #[test]
    fn disabled_transports_parse_from_env() {
        let env = StaticEnvironment::new().with(ENV_DISABLED_TRANSPORTS, "full_async, raw-socket");
        let config = load_runtime_config(None, None, &env).unwrap();
        assert!(!config.transport_enabled(TransportKind::FullAsync));
        assert!(config.transport_enabled(TransportKind::MinimalAsync));
        assert!(!config.transport_enabled(TransportKind::RawSocket));

        let env = StaticEnvironment::new().with(ENV_DISABLED_TRANSPORTS, "gunicorn");
        assert!(load_runtime_config(None, None, &env).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_runtime_config(
            Some(Path::new("/definitely/not/here.toml")),
            None,
            &StaticEnvironment::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
