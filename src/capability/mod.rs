//! Capability probing.
//!
//! # Data Flow
//! ```text
//! Strategy.required_capability
//!     → probe.rs (EnvironmentProbe)
//!         - EntryPoint:  registry lookup, never constructs
//!         - Setting:     the service setting passed validation
//!         - Transport:   not disabled by configuration
//!         - OAuthConfigured: client ID present
//!     → bool (errors collapse to false)
//! ```
//!
//! # Design Decisions
//! - Probing has no side effects; a failed probe leaves nothing to undo
//! - OAuth is reported but never gates a tier

pub mod probe;

use crate::service::EntryPointLocator;
use crate::transport::TransportKind;

pub use probe::EnvironmentProbe;

/// Something a tier needs before it is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// The entry point resolves in the service registry.
    EntryPoint(EntryPointLocator),
    /// The named service setting passed validation.
    Setting(&'static str),
    /// The transport kind is enabled on this host.
    Transport(TransportKind),
    /// `ATLASSIAN_OAUTH_CLIENT_ID` is non-empty.
    OAuthConfigured,
    /// Every listed capability is available.
    All(Vec<Capability>),
}

impl Capability {
    /// Requirement of a tier serving `entry_point` over `transport`.
    pub fn service_over(entry_point: EntryPointLocator, transport: TransportKind) -> Self {
        Capability::All(vec![
            Capability::EntryPoint(entry_point),
            Capability::Transport(transport),
        ])
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::EntryPoint(locator) => write!(f, "entry point {}", locator),
            Capability::Setting(name) => write!(f, "valid {} setting", name),
            Capability::Transport(kind) => write!(f, "{} transport", kind),
            Capability::OAuthConfigured => f.write_str("OAuth configuration"),
            Capability::All(parts) => {
                let parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" + "))
            }
        }
    }
}

/// Side-effect-free check of whether a capability is available.
pub trait CapabilityProbe: Send + Sync {
    fn probe(&self, capability: &Capability) -> bool;

    /// The first missing leaf capability, for logging.
    fn first_missing(&self, capability: &Capability) -> Option<Capability> {
        match capability {
            Capability::All(parts) => parts.iter().find_map(|part| self.first_missing(part)),
            leaf if self.probe(leaf) => None,
            leaf => Some(leaf.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyTransports;

    impl CapabilityProbe for OnlyTransports {
        fn probe(&self, capability: &Capability) -> bool {
            match capability {
                Capability::Transport(_) => true,
                Capability::All(parts) => parts.iter().all(|part| self.probe(part)),
                _ => false,
            }
        }
    }

    #[test]
    fn display_joins_composite() {
        let capability = Capability::service_over(
            EntryPointLocator::new("atlassian_mcp.server", "mcp"),
            TransportKind::FullAsync,
        );
        assert_eq!(
            capability.to_string(),
            "entry point atlassian_mcp.server:mcp + full_async transport"
        );
    }

    #[test]
    fn first_missing_finds_the_leaf() {
        let locator = EntryPointLocator::new("pkg", "mcp");
        let capability = Capability::service_over(locator.clone(), TransportKind::FullAsync);
        assert_eq!(
            OnlyTransports.first_missing(&capability),
            Some(Capability::EntryPoint(locator))
        );
        assert_eq!(
            OnlyTransports.first_missing(&Capability::Transport(TransportKind::RawSocket)),
            None
        );
    }
}
