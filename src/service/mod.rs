//! The wrapped service, seen only through its entry point.
//!
//! # Data Flow
//! ```text
//! EntryPointLocator ("atlassian_mcp.server:mcp")
//!     → registry.rs (resolve: does it exist? no construction)
//!     → registry.rs (construct: run the factory, panics contained)
//!     → Arc<dyn ServiceEntryPoint>
//!     → mounted by a full tier at the primary path
//! ```
//!
//! # Design Decisions
//! - Resolution and construction are separate so probing has no side effects
//! - A panicking factory is an unavailable service, not a crashed process

pub mod locator;
pub mod mcp;
pub mod registry;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::http::{ServiceRequest, ServiceResponse};

pub use locator::{EntryPointLocator, LocatorParseError};
pub use mcp::{builtin_registry, McpHttpService};
pub use registry::{EntryPointError, ServiceRegistry};

/// The opaque protocol implementation a full tier exposes.
pub trait ServiceEntryPoint: Send + Sync {
    /// Name used in logs and the `/health` payload.
    fn name(&self) -> &str;

    /// Methods routed to the service at the primary path.
    fn methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST, Method::DELETE]
    }

    /// Handle one request at the primary path.
    fn call(&self, request: ServiceRequest) -> BoxFuture<'_, ServiceResponse>;
}
