use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use mcp_bootstrap::health::{default_base_url, HealthProber};
use mcp_bootstrap::observability::init_logging;

#[derive(Parser)]
#[command(name = "health-check")]
#[command(about = "Check whether the Atlassian MCP server is answering HTTP", long_about = None)]
struct Cli {
    /// Base URL; defaults to http://{HOST or localhost}:{PORT or 10000}
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = 10)]
    timeout_secs: u64,

    /// Log each request to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.verbose {
        init_logging("mcp_bootstrap=debug");
    }

    let base_url = cli
        .base_url
        .unwrap_or_else(|| default_base_url(|name| std::env::var(name).ok()));

    match probe(&base_url, Duration::from_secs(cli.timeout_secs)).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn probe(base_url: &str, timeout: Duration) -> anyhow::Result<bool> {
    let prober = HealthProber::new(timeout)?;
    let report = prober.probe(base_url).await?;
    println!("{}", report);
    Ok(report.healthy())
}
