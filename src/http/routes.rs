//! Route table: exact `(method, path)` dispatch.
//!
//! # Responsibilities
//! - Hold the routes a tier exposes, in registration order
//! - Resolve a request to a handler, a 405 or a 404
//! - Run synchronous handlers without an async runtime
//!
//! # Design Decisions
//! - Exact string match on the path, no normalization of trailing slashes
//! - Linear scan; tables hold a handful of routes

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::http::{ServiceRequest, ServiceResponse};

type SyncHandlerFn = dyn Fn(&ServiceRequest) -> ServiceResponse + Send + Sync;
type AsyncHandlerFn = dyn Fn(ServiceRequest) -> BoxFuture<'static, ServiceResponse> + Send + Sync;

/// A request handler.
///
/// `Sync` handlers complete without suspending and can run on any transport.
/// `Async` handlers need a runtime and are refused by the raw socket tier.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ServiceRequest) -> ServiceResponse + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ServiceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResponse> + Send + 'static,
    {
        Handler::Async(Arc::new(
            move |request: ServiceRequest| -> BoxFuture<'static, ServiceResponse> {
                Box::pin(f(request))
            },
        ))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }

    pub async fn call(&self, request: ServiceRequest) -> ServiceResponse {
        match self {
            Handler::Sync(f) => f(&request),
            Handler::Async(f) => f(request).await,
        }
    }

    /// Run a synchronous handler in place. Returns `None` for async handlers.
    pub fn call_blocking(&self, request: &ServiceRequest) -> Option<ServiceResponse> {
        match self {
            Handler::Sync(f) => Some(f(request)),
            Handler::Async(_) => None,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// A single `(method, path) → handler` entry.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub handler: Handler,
}

/// Outcome of looking up a request in a [`RouteTable`].
#[derive(Debug)]
pub enum Resolution<'a> {
    Found(&'a Handler),
    MethodNotAllowed,
    NotFound,
}

/// The routing surface a tier exposes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. A later registration for the same method and path
    /// replaces the earlier one.
    pub fn route(mut self, method: Method, path: impl Into<String>, handler: Handler) -> Self {
        let path = path.into();
        self.routes
            .retain(|route| !(route.method == method && route.path == path));
        self.routes.push(Route {
            method,
            path,
            handler,
        });
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Distinct paths in registration order.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for route in &self.routes {
            if !paths.contains(&route.path) {
                paths.push(route.path.clone());
            }
        }
        paths
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.routes.iter().any(|route| route.path == path)
    }

    /// First path whose handler needs an async runtime, if any.
    pub fn first_async_path(&self) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| route.handler.is_async())
            .map(|route| route.path.as_str())
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut path_known = false;
        for route in &self.routes {
            if route.path != path {
                continue;
            }
            if route.method == *method {
                return Resolution::Found(&route.handler);
            }
            path_known = true;
        }
        if path_known {
            Resolution::MethodNotAllowed
        } else {
            Resolution::NotFound
        }
    }

    pub async fn dispatch(&self, request: ServiceRequest) -> ServiceResponse {
        match self.resolve(&request.method, &request.path) {
            Resolution::Found(handler) => handler.call(request).await,
            Resolution::MethodNotAllowed => ServiceResponse::method_not_allowed(),
            Resolution::NotFound => ServiceResponse::not_found(),
        }
    }

    /// Dispatch without a runtime. An async handler answers 500.
    pub fn dispatch_blocking(&self, request: &ServiceRequest) -> ServiceResponse {
        match self.resolve(&request.method, &request.path) {
            Resolution::Found(handler) => handler.call_blocking(request).unwrap_or_else(|| {
                ServiceResponse::internal_error("handler requires an async transport")
            }),
            Resolution::MethodNotAllowed => ServiceResponse::method_not_allowed(),
            Resolution::NotFound => ServiceResponse::not_found(),
        }
    }
}
