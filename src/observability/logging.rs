//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Derive the default filter from the configured log level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives for a configured level such as `info` or `debug`.
pub fn default_filter(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        other => other.to_string(),
    };
    format!("mcp_bootstrap={level},tower_http={level}")
}

/// Install the global subscriber. `RUST_LOG` overrides `default_directives`.
///
/// Returns false when a subscriber was already installed.
pub fn init_logging(default_directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_maps_supervisor_levels() {
        assert_eq!(default_filter("info"), "mcp_bootstrap=info,tower_http=info");
        assert_eq!(default_filter("WARNING"), "mcp_bootstrap=warn,tower_http=warn");
        assert_eq!(default_filter(""), "mcp_bootstrap=info,tower_http=info");
    }

    #[test]
    fn second_init_is_refused() {
        let _ = init_logging("mcp_bootstrap=debug");
        assert!(!init_logging("mcp_bootstrap=debug"));
    }
}
