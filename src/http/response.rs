//! Response representation shared by all transports.
//!
//! # Design Decisions
//! - Bodies are fully buffered; every surface served here is small JSON
//! - Conversion to the transport's response type never fails

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use http_body_util::Full;
use serde_json::{json, Value};

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ServiceResponse {
    /// Response with the given status and no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// JSON response. Serialization of a `Value` cannot fail.
    pub fn json(status: StatusCode, value: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Self {
            status,
            headers,
            body: Bytes::from(value.to_string()),
        }
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
        Self {
            status,
            headers,
            body: Bytes::from(body.into()),
        }
    }

    pub fn not_found() -> Self {
        Self::json(StatusCode::NOT_FOUND, &json!({ "detail": "Not Found" }))
    }

    pub fn method_not_allowed() -> Self {
        Self::json(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({ "detail": "Method Not Allowed" }),
        )
    }

    pub fn bad_request(detail: impl std::fmt::Display) -> Self {
        Self::json(
            StatusCode::BAD_REQUEST,
            &json!({ "detail": detail.to_string() }),
        )
    }

    pub fn payload_too_large() -> Self {
        Self::json(
            StatusCode::PAYLOAD_TOO_LARGE,
            &json!({ "detail": "Request body too large" }),
        )
    }

    pub fn internal_error(detail: impl std::fmt::Display) -> Self {
        Self::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "detail": detail.to_string() }),
        )
    }

    /// Add or replace a header. Invalid values are dropped.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Convert into the body type used by the bare hyper tier.
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}
