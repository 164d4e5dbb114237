//! Transport-neutral HTTP surface.
//!
//! # Data Flow
//! ```text
//! Transport (axum / hyper / raw socket)
//!     → request.rs (ServiceRequest: method, path, headers, body)
//!     → routes.rs (RouteTable: exact (method, path) dispatch)
//!     → Handler (sync or async)
//!     → response.rs (ServiceResponse)
//!     → Transport writes it back
//! ```
//!
//! # Design Decisions
//! - Paths are matched exactly; `/mcp` and `/mcp/` are different routes
//! - Unknown paths and wrong methods answer with JSON bodies on every tier
//! - Synchronous handlers exist so the raw socket tier never needs a runtime

pub mod request;
pub mod response;
pub mod routes;

pub use request::ServiceRequest;
pub use response::ServiceResponse;
pub use routes::{Handler, Resolution, Route, RouteTable};
