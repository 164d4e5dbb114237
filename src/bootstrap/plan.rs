//! The ordered list of tiers to try.

use serde::Serialize;

use crate::capability::Capability;
use crate::config::{RuntimeConfig, SETTING_ENTRY_POINT, SETTING_FALLBACK_ENTRY_POINT, SETTING_MCP_PATH};
use crate::service::EntryPointLocator;
use crate::transport::TransportKind;

pub const PRIMARY: &str = "primary";
pub const FALLBACK_IMPORT: &str = "fallback-import";
pub const MINIMAL_HEALTH: &str = "minimal-health";
pub const RAW_SOCKET: &str = "raw-socket";

/// One tier of the bootstrap chain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDescriptor {
    /// 1 is the richest tier.
    pub tier: u8,
    pub name: String,
    pub required_capability: Capability,
    /// `None` for the degraded tiers, and for service tiers whose locator did not parse.
    pub entry_point: Option<EntryPointLocator>,
    pub transport: TransportKind,
    /// Serves diagnostics only.
    pub degraded: bool,
}

/// Summary of a descriptor for logs and tests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TierSummary {
    pub tier: u8,
    pub name: String,
    pub transport: TransportKind,
    pub degraded: bool,
}

/// Tiers in ascending order. The order is fixed at construction.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    descriptors: Vec<StrategyDescriptor>,
}

impl BootstrapPlan {
    pub fn new(mut descriptors: Vec<StrategyDescriptor>) -> Self {
        descriptors.sort_by_key(|descriptor| descriptor.tier);
        Self { descriptors }
    }

    /// Primary entry point, fallback entry point, minimal health, raw socket.
    ///
    /// Service tiers also require their settings to be valid, so a bad
    /// entry point or primary path only skips them.
    pub fn standard(config: &RuntimeConfig) -> Self {
        let service_tier = |tier: u8,
                            name: &str,
                            setting: &'static str,
                            locator: &Option<EntryPointLocator>| {
            let mut required = vec![
                Capability::Setting(SETTING_MCP_PATH),
                Capability::Setting(setting),
            ];
            required.push(match locator {
                Some(locator) => Capability::service_over(locator.clone(), TransportKind::FullAsync),
                None => Capability::Transport(TransportKind::FullAsync),
            });
            StrategyDescriptor {
                tier,
                name: name.to_string(),
                required_capability: Capability::All(required),
                entry_point: locator.clone(),
                transport: TransportKind::FullAsync,
                degraded: false,
            }
        };
        let degraded_tier = |tier: u8, name: &str, transport: TransportKind| StrategyDescriptor {
            tier,
            name: name.to_string(),
            required_capability: Capability::Transport(transport),
            entry_point: None,
            transport,
            degraded: true,
        };

        Self::new(vec![
            service_tier(1, PRIMARY, SETTING_ENTRY_POINT, &config.entry_point),
            service_tier(2, FALLBACK_IMPORT, SETTING_FALLBACK_ENTRY_POINT, &config.fallback_entry_point),
            degraded_tier(3, MINIMAL_HEALTH, TransportKind::MinimalAsync),
            degraded_tier(4, RAW_SOCKET, TransportKind::RawSocket),
        ])
    }

    pub fn descriptors(&self) -> &[StrategyDescriptor] {
        &self.descriptors
    }

    pub fn into_descriptors(self) -> Vec<StrategyDescriptor> {
        self.descriptors
    }

    pub fn summaries(&self) -> Vec<TierSummary> {
        self.descriptors
            .iter()
            .map(|descriptor| TierSummary {
                tier: descriptor.tier,
                name: descriptor.name.clone(),
                transport: descriptor.transport,
                degraded: descriptor.degraded,
            })
            .collect()
    }
}
