//! Route tables each tier exposes.
//!
//! Full tiers mount the wrapped service at the primary path next to `/health`
//! and `/`. Degraded tiers answer only `/health` and `/`, with synchronous
//! handlers so any transport can serve them.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use crate::bootstrap::StrategyDescriptor;
use crate::config::RuntimeConfig;
use crate::http::{Handler, RouteTable, ServiceRequest, ServiceResponse};
use crate::service::ServiceEntryPoint;

pub const HEALTH_PATH: &str = "/health";
pub const ROOT_PATH: &str = "/";

const SERVICE_MESSAGE: &str = "Atlassian MCP server";
const DEGRADED_MESSAGE: &str = "Atlassian MCP server - import error occurred";
const DEGRADED_ERROR: &str = "MCP server import failed";

/// Routes for a tier that serves the wrapped service.
pub fn service_routes(
    descriptor: &StrategyDescriptor,
    config: &RuntimeConfig,
    service: Arc<dyn ServiceEntryPoint>,
) -> RouteTable {
    let health = json!({
        "status": "healthy",
        "tier": descriptor.name,
        "service": service.name(),
    });
    let root = json!({
        "message": SERVICE_MESSAGE,
        "tier": descriptor.name,
        "available_endpoints": [config.mcp_path, HEALTH_PATH],
    });

    let mut table = RouteTable::new();
    for method in service.methods() {
        let service = Arc::clone(&service);
        table = table.route(
            method,
            config.mcp_path.clone(),
            Handler::from_async(move |request: ServiceRequest| {
                let service = Arc::clone(&service);
                async move { service.call(request).await }
            }),
        );
    }
    table
        .route(Method::GET, HEALTH_PATH, static_json(health))
        .route(Method::GET, ROOT_PATH, static_json(root))
}

/// Diagnostic routes for a tier without the wrapped service.
pub fn degraded_routes(descriptor: &StrategyDescriptor, config: &RuntimeConfig) -> RouteTable {
    let oauth: serde_json::Map<String, Value> = config
        .oauth
        .iter()
        .map(|(name, present)| (name.to_string(), Value::Bool(present)))
        .collect();
    let health = json!({
        "status": "healthy",
        "error": DEGRADED_ERROR,
        "tier": descriptor.name,
        "diagnostics": {
            "working_dir": config
                .environment
                .working_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
            "environment_variables": config.environment.variables,
            "total_environment_variables": config.environment.total_variables,
            "oauth": oauth,
        },
    });
    let root = json!({
        "message": DEGRADED_MESSAGE,
        "tier": descriptor.name,
        "available_endpoints": [HEALTH_PATH],
    });

    RouteTable::new()
        .route(Method::GET, HEALTH_PATH, static_json(health))
        .route(Method::GET, ROOT_PATH, static_json(root))
}

fn static_json(body: Value) -> Handler {
    Handler::sync(move |_| ServiceResponse::json(StatusCode::OK, &body))
}
