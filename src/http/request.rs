//! Request representation shared by all transports.

use axum::http::{request::Parts, HeaderMap, Method};
use bytes::Bytes;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A fully buffered HTTP request, independent of the transport that read it.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ServiceRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build from the head of an `http::Request` and its collected body.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
            body,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Split a request target such as `/mcp/?x=1` into path and query.
    pub fn split_target(target: &str) -> (String, Option<String>) {
        match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        }
    }

    /// The request ID set by the transport, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_target_keeps_trailing_slash() {
        let (path, query) = ServiceRequest::split_target("/mcp/?session=1");
        assert_eq!(path, "/mcp/");
        assert_eq!(query.as_deref(), Some("session=1"));

        let (path, query) = ServiceRequest::split_target("/mcp");
        assert_eq!(path, "/mcp");
        assert!(query.is_none());
    }

    #[test]
    fn from_parts_copies_head() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("http://localhost/mcp/?a=b")
            .header(X_REQUEST_ID, "abc")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        let req = ServiceRequest::from_parts(&parts, Bytes::from_static(b"{}"));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/mcp/");
        assert_eq!(req.query.as_deref(), Some("a=b"));
        assert_eq!(req.request_id(), Some("abc"));
        assert_eq!(&req.body[..], b"{}");
    }
}
