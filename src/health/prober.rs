//! External health probe.
//!
//! # Responsibilities
//! - GET each candidate path with a bounded timeout
//! - Classify every outcome and keep going after failures
//! - Render the per-candidate report and the summary line
//!
//! Any HTTP response counts as responding, whatever its status: the probe
//! checks that something is listening, not that the service is correct.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Paths probed, in order.
pub const CANDIDATE_PATHS: [&str; 3] = ["/mcp", "/health", "/"];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = "MCP-Health-Check/1.0";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "10000";

const JSON_PREVIEW_CHARS: usize = 200;
const TEXT_PREVIEW_CHARS: usize = 100;
const RULE: &str = "==================================================";

/// Error type for setting up a probe. Per-candidate failures are not errors.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// What happened to one candidate. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Responded {
        status: u16,
        content_type: String,
        body: String,
    },
    HttpError {
        status: u16,
        reason: String,
    },
    Connection(String),
    Other(String),
}

impl ProbeOutcome {
    /// The lenient verdict: any HTTP response counts.
    pub fn responded(&self) -> bool {
        matches!(
            self,
            ProbeOutcome::Responded { .. } | ProbeOutcome::HttpError { .. }
        )
    }

    pub fn record(&self) -> ProbeRecord {
        match self {
            ProbeOutcome::Responded { status, .. } => ProbeRecord {
                http_status: Some(*status),
                succeeded: true,
                error_detail: None,
            },
            ProbeOutcome::HttpError { status, reason } => ProbeRecord {
                http_status: Some(*status),
                succeeded: true,
                error_detail: Some(format!("HTTP {} - {}", status, reason)),
            },
            ProbeOutcome::Connection(detail) | ProbeOutcome::Other(detail) => ProbeRecord {
                http_status: None,
                succeeded: false,
                error_detail: Some(detail.clone()),
            },
        }
    }
}

/// Recorded result for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub http_status: Option<u16>,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProbeEntry {
    pub url: String,
    pub outcome: ProbeOutcome,
}

/// Results for every candidate, in probe order.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    base_url: String,
    entries: Vec<ProbeEntry>,
}

impl ProbeReport {
    pub fn entries(&self) -> &[ProbeEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, ProbeRecord)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.url.as_str(), entry.outcome.record()))
    }

    pub fn record(&self, url: &str) -> Option<ProbeRecord> {
        self.entries
            .iter()
            .find(|entry| entry.url == url)
            .map(|entry| entry.outcome.record())
    }

    pub fn responding(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.responded())
            .count()
    }

    pub fn healthy(&self) -> bool {
        self.responding() > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Results: {}/{} endpoints responding",
            self.responding(),
            self.entries.len()
        )
    }
}

impl std::fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Health check for Atlassian MCP server")?;
        writeln!(f, "Base URL: {}", self.base_url)?;
        writeln!(f, "{}", RULE)?;
        for entry in &self.entries {
            writeln!(f, "Testing {}...", entry.url)?;
            match &entry.outcome {
                ProbeOutcome::Responded {
                    status,
                    content_type,
                    body,
                } => {
                    writeln!(f, "   OK {} - {}", status, content_type)?;
                    writeln!(f, "   Response: {}", preview(content_type, body))?;
                }
                ProbeOutcome::HttpError { status, reason } => {
                    writeln!(f, "   FAIL HTTP {} - {}", status, reason)?;
                }
                ProbeOutcome::Connection(detail) => {
                    writeln!(f, "   FAIL Connection error: {}", detail)?;
                }
                ProbeOutcome::Other(detail) => {
                    writeln!(f, "   FAIL Unexpected error: {}", detail)?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}", self.summary())?;
        if self.healthy() {
            write!(f, "Server appears to be running!")
        } else {
            write!(f, "Server appears to be down or not accessible")
        }
    }
}

/// Short body preview: pretty JSON when the content type says JSON, else text.
pub fn preview(content_type: &str, body: &str) -> String {
    if content_type.to_ascii_lowercase().contains("json") {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return truncate_chars(&pretty, JSON_PREVIEW_CHARS);
            }
        }
    }
    format!("{}...", truncate_chars(body, TEXT_PREVIEW_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `http://{HOST}:{PORT}` from a variable lookup, with empty values treated as unset.
pub fn default_base_url(lookup: impl Fn(&str) -> Option<String>) -> String {
    let var = |name: &str, default: &str| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    format!("http://{}:{}", var("HOST", DEFAULT_HOST), var("PORT", DEFAULT_PORT))
}

/// Issues the candidate requests.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: reqwest::Client,
}

impl HealthProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// Probe every candidate under `base_url`. Never stops early.
    pub async fn probe(&self, base_url: &str) -> Result<ProbeReport, ProbeError> {
        let base = normalize_base_url(base_url)?;

        let mut entries = Vec::with_capacity(CANDIDATE_PATHS.len());
        for path in CANDIDATE_PATHS {
            let url = format!("{}{}", base, path);
            let outcome = self.probe_one(&url).await;
            match &outcome {
                ProbeOutcome::Responded { status, .. } => {
                    tracing::debug!(url = %url, status, "Endpoint responded");
                }
                other => {
                    tracing::debug!(url = %url, outcome = ?other, "Endpoint did not respond cleanly");
                }
            }
            entries.push(ProbeEntry { url, outcome });
        }

        Ok(ProbeReport {
            base_url: base,
            entries,
        })
    }

    /// Overall verdict for `base_url`.
    pub async fn check(&self, base_url: &str) -> Result<bool, ProbeError> {
        Ok(self.probe(base_url).await?.healthy())
    }

    async fn probe_one(&self, url: &str) -> ProbeOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::HttpError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        match response.text().await {
            Ok(body) => ProbeOutcome::Responded {
                status: status.as_u16(),
                content_type,
                body,
            },
            Err(e) => classify_error(&e),
        }
    }
}

fn classify_error(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        ProbeOutcome::Connection(format!("timed out: {}", err))
    } else if err.is_connect() {
        ProbeOutcome::Connection(err.to_string())
    } else {
        ProbeOutcome::Other(err.to_string())
    }
}

/// Validate `base_url` and strip any trailing slash.
fn normalize_base_url(base_url: &str) -> Result<String, ProbeError> {
    let invalid = |reason: String| ProbeError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };
    let parsed = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(base_url.trim().trim_end_matches('/').to_string())
}
