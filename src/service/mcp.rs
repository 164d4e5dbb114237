//! Built-in MCP endpoint speaking JSON-RPC over streamable HTTP.
//!
//! Answers the lifecycle methods a client needs to connect and list tools.
//! Tool implementations live elsewhere; this server advertises none.

use std::sync::Arc;

use axum::http::{header, HeaderName, Method, StatusCode};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::schema::{DEFAULT_ENTRY_POINT, DEFAULT_FALLBACK_ENTRY_POINT};
use crate::config::RuntimeConfig;
use crate::http::{ServiceRequest, ServiceResponse};
use crate::service::{EntryPointLocator, ServiceEntryPoint, ServiceRegistry};

/// Protocol revision answered when the client does not name one.
pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SESSION_HEADER: &str = "mcp-session-id";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone)]
pub struct McpHttpService {
    server_name: String,
    version: String,
    oauth_enabled: bool,
}

impl McpHttpService {
    pub fn new(server_name: impl Into<String>, oauth_enabled: bool) -> Self {
        Self {
            server_name: server_name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            oauth_enabled,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.supervisor.proc_name.clone(), config.oauth.enabled())
    }

    fn handle(&self, request: ServiceRequest) -> ServiceResponse {
        if request.method != Method::POST {
            return ServiceResponse::method_not_allowed().with_header(header::ALLOW, "POST");
        }

        let payload: Value = match serde_json::from_slice(&request.body) {
            Ok(payload) => payload,
            Err(e) => {
                return ServiceResponse::json(
                    StatusCode::BAD_REQUEST,
                    &error_reply(Value::Null, PARSE_ERROR, &format!("Parse error: {}", e)),
                )
            }
        };

        let mut session = None;
        let body = match payload {
            Value::Array(messages) if messages.is_empty() => Some(error_reply(
                Value::Null,
                INVALID_REQUEST,
                "Invalid Request: empty batch",
            )),
            Value::Array(messages) => {
                let replies: Vec<Value> = messages
                    .iter()
                    .filter_map(|message| self.handle_message(message, &mut session))
                    .collect();
                (!replies.is_empty()).then(|| Value::Array(replies))
            }
            message => self.handle_message(&message, &mut session),
        };

        let response = match body {
            Some(body) => ServiceResponse::json(StatusCode::OK, &body),
            None => ServiceResponse::empty(StatusCode::ACCEPTED),
        };
        match session {
            Some(id) => response.with_header(HeaderName::from_static(SESSION_HEADER), &id),
            None => response,
        }
    }

    /// Answer one JSON-RPC message. Notifications get no reply.
    fn handle_message(&self, message: &Value, session: &mut Option<String>) -> Option<Value> {
        let Some(object) = message.as_object() else {
            return Some(error_reply(Value::Null, INVALID_REQUEST, "Invalid Request"));
        };
        let id = object.get("id").cloned();
        let Some(method) = object.get("method").and_then(Value::as_str) else {
            // A response from the client; nothing to answer.
            return None;
        };
        let id = id?;

        let result = match method {
            "initialize" => {
                let requested = message
                    .pointer("/params/protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(PROTOCOL_VERSION);
                *session = Some(Uuid::new_v4().to_string());
                let instructions = if self.oauth_enabled {
                    "OAuth is configured for Atlassian access."
                } else {
                    "OAuth is not configured; Atlassian tools are unavailable."
                };
                json!({
                    "protocolVersion": requested,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": { "name": self.server_name, "version": self.version },
                    "instructions": instructions,
                })
            }
            "ping" => json!({}),
            "tools/list" => json!({ "tools": [] }),
            other => {
                return Some(error_reply(
                    id,
                    METHOD_NOT_FOUND,
                    &format!("Method not found: {}", other),
                ))
            }
        };
        Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
    }
}

impl ServiceEntryPoint for McpHttpService {
    fn name(&self) -> &str {
        &self.server_name
    }

    fn call(&self, request: ServiceRequest) -> BoxFuture<'_, ServiceResponse> {
        Box::pin(async move { self.handle(request) })
    }
}

fn error_reply(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Registry with the built-in service under both default locators.
pub fn builtin_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    for locator in [DEFAULT_ENTRY_POINT, DEFAULT_FALLBACK_ENTRY_POINT] {
        if let Ok(locator) = locator.parse::<EntryPointLocator>() {
            registry.register(locator, |config| {
                Ok(Arc::new(McpHttpService::from_config(config)) as Arc<dyn ServiceEntryPoint>)
            });
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> McpHttpService {
        McpHttpService::new("xerus-atlassian-mcp", false)
    }

    fn post(body: &str) -> ServiceRequest {
        ServiceRequest::new(Method::POST, "/mcp/").with_body(body.to_string())
    }

    fn body(response: &ServiceResponse) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[tokio::test]
    async fn initialize_opens_a_session() {
        let response = service()
            .call(post(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
            ))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.headers.contains_key(SESSION_HEADER));
        let reply = body(&response);
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(reply["result"]["serverInfo"]["name"], "xerus-atlassian-mcp");
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = service()
            .call(post(r#"{"jsonrpc":"2.0","id":"a","method":"tools/call"}"#))
            .await;
        assert_eq!(body(&response)["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn notification_is_accepted_without_body() {
        let response = service()
            .call(post(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn batch_answers_each_request() {
        let response = service()
            .call(post(
                r#"[{"jsonrpc":"2.0","id":1,"method":"ping"},
                    {"jsonrpc":"2.0","method":"notifications/initialized"},
                    {"jsonrpc":"2.0","id":2,"method":"tools/list"}]"#,
            ))
            .await;
        let replies = body(&response);
        assert_eq!(replies.as_array().unwrap().len(), 2);
        assert_eq!(replies[1]["result"]["tools"], json!([]));
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = service().call(post("{not json")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(body(&response)["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn get_is_405_with_allow() {
        let response = service()
            .call(ServiceRequest::new(Method::GET, "/mcp/"))
            .await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers.get(header::ALLOW).unwrap(), "POST");
    }

    #[test]
    fn builtin_registry_serves_both_defaults() {
        let registry = builtin_registry();
        assert!(registry.contains(&EntryPointLocator::new("atlassian_mcp.server", "mcp")));
        assert!(registry.contains(&EntryPointLocator::new("atlassian_mcp", "server.mcp")));
    }
}
