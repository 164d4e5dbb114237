//! mcp-bootstrap: bring the Atlassian MCP server up on the best tier available.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use mcp_bootstrap::bootstrap::{BootstrapContext, BootstrapPlan, Sequencer};
use mcp_bootstrap::capability::{Capability, CapabilityProbe, EnvironmentProbe};
use mcp_bootstrap::config::{load_runtime_config, DeploymentProfile, ProcessEnvironment};
use mcp_bootstrap::observability::{default_filter, init_logging};
use mcp_bootstrap::service::builtin_registry;
use mcp_bootstrap::RuntimeConfig;

#[derive(Parser)]
#[command(name = "mcp-bootstrap")]
#[command(about = "Start the Atlassian MCP HTTP server, degrading to health-only tiers on failure", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long, env = "BOOTSTRAP_CONFIG")]
    config: Option<PathBuf>,

    /// Deployment profile; decides the default port
    #[arg(short, long, value_enum)]
    profile: Option<DeploymentProfile>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_runtime_config(cli.config.as_deref(), cli.profile, &ProcessEnvironment) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&default_filter("info"));
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&default_filter(&config.supervisor.log_level));

    match run(&config) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Server could not start or stopped abnormally");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RuntimeConfig) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        proc_name = %config.supervisor.proc_name,
        profile = config.profile.as_str(),
        address = %config.bind_address(),
        mcp_path = %config.mcp_path,
        "Starting Atlassian MCP HTTP server"
    );
    for issue in &config.service_issues {
        tracing::warn!(issue = %issue, "Invalid service setting, service tiers will be skipped");
    }

    let registry = Arc::new(builtin_registry());
    let probe = EnvironmentProbe::new(Arc::clone(&registry), config);

    tracing::info!(
        oauth_enabled = probe.probe(&Capability::OAuthConfigured),
        "OAuth configuration"
    );
    for (variable, present) in config.oauth.iter() {
        tracing::debug!(variable, present, "OAuth variable");
    }
    let plan = BootstrapPlan::standard(config);
    for tier in plan.summaries() {
        tracing::debug!(
            tier = tier.tier,
            name = %tier.name,
            transport = %tier.transport,
            degraded = tier.degraded,
            "Planned tier"
        );
    }

    let ctx = BootstrapContext::new(config, &probe, &registry);
    Sequencer::from_plan(plan)
        .run(&ctx)
        .context("bootstrap failed")
}
