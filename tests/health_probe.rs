//! Health prober against mock backends.

mod common;

use std::process::Command;
use std::time::Duration;

use mcp_bootstrap::health::{HealthProber, ProbeOutcome, CANDIDATE_PATHS};

fn prober() -> HealthProber {
    HealthProber::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn one_healthy_endpoint_is_enough() {
    let (addr, seen) = common::start_mock_backend(|path| match path {
        "/health" => (200, "application/json", r#"{"status":"healthy"}"#.to_string()),
        _ => (503, "text/plain", "unavailable".to_string()),
    })
    .await;
    let base = format!("http://{}", addr);

    let report = prober().probe(&base).await.unwrap();
    assert!(report.healthy());
    assert_eq!(report.entries().len(), CANDIDATE_PATHS.len());

    let health = report.record(&format!("{}/health", base)).unwrap();
    assert_eq!(health.http_status, Some(200));
    assert!(health.error_detail.is_none());
    assert!(matches!(
        report.entries()[1].outcome,
        ProbeOutcome::Responded { status: 200, .. }
    ));

    let seen = seen.lock().unwrap().clone();
    let paths: Vec<&str> = seen.iter().map(|request| request.path.as_str()).collect();
    assert_eq!(paths, CANDIDATE_PATHS.to_vec());
    assert!(seen
        .iter()
        .all(|request| request.user_agent.as_deref() == Some("MCP-Health-Check/1.0")));
}

#[tokio::test]
async fn not_found_counts_as_responding() {
    let (addr, _) = common::start_mock_backend(|_| {
        (404, "application/json", r#"{"detail":"Not Found"}"#.to_string())
    })
    .await;
    let base = format!("http://{}", addr);

    let report = prober().probe(&base).await.unwrap();
    assert!(report.healthy());
    for (_, record) in report.records() {
        assert_eq!(record.http_status, Some(404));
        assert!(record.succeeded);
    }
}

#[tokio::test]
async fn nothing_listening_is_unhealthy() {
    let base = format!("http://127.0.0.1:{}", common::free_port());

    let report = prober().probe(&base).await.unwrap();
    assert!(!report.healthy());
    assert_eq!(report.summary(), "Results: 0/3 endpoints responding");
    assert!(report
        .entries()
        .iter()
        .all(|entry| matches!(entry.outcome, ProbeOutcome::Connection(_))));
    assert!(!prober().check(&base).await.unwrap());
}

#[tokio::test]
async fn invalid_base_url_is_an_error() {
    assert!(prober().probe("not a url").await.is_err());
}

#[test]
fn binary_exit_code_follows_verdict() {
    let port = common::free_port();
    let output = Command::new(env!("CARGO_BIN_EXE_health-check"))
        .arg(format!("http://127.0.0.1:{}", port))
        .args(["--timeout-secs", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Results: 0/3 endpoints responding"));
}
