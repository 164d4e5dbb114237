//! Transport adapters.
//!
//! # Data Flow
//! ```text
//! Strategy
//!     → adapter.bind(target, routes)      binds the port or fails fast
//!     → BoundServer                       the only port-holding handle
//!     → BoundServer::serve()              blocks for the process lifetime
//!
//! Kinds:
//!     full_async     axum + tower-http stack, current-thread runtime
//!     minimal_async  bare hyper http1 connections, current-thread runtime
//!     raw_socket     std::net listener, one connection at a time
//! ```
//!
//! # Design Decisions
//! - Binding and serving are separate steps so a bind failure is reported
//!   before any serving loop starts
//! - Each async adapter owns its runtime; the sequencer stays synchronous
//! - Async runtimes are single-threaded: many in-flight requests, one OS thread

pub mod full_async;
pub mod minimal_async;
pub mod raw_socket;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::http::RouteTable;
use crate::lifecycle::Shutdown;

pub use full_async::FullAsyncTransport;
pub use minimal_async::MinimalAsyncTransport;
pub use raw_socket::RawSocketTransport;

/// The three ways of serving HTTP, from richest to most degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    FullAsync,
    MinimalAsync,
    RawSocket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::FullAsync => "full_async",
            TransportKind::MinimalAsync => "minimal_async",
            TransportKind::RawSocket => "raw_socket",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "full_async" => Ok(TransportKind::FullAsync),
            "minimal_async" => Ok(TransportKind::MinimalAsync),
            "raw_socket" => Ok(TransportKind::RawSocket),
            other => Err(format!("unknown transport kind '{}'", other)),
        }
    }
}

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to build the adapter's runtime.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// An async adapter was asked to bind from inside another runtime.
    #[error("cannot start a {0} server from inside an async runtime")]
    NestedRuntime(TransportKind),
    /// The route table needs a capability this transport lacks.
    #[error("route {path} needs an async handler, unsupported by {kind}")]
    UnsupportedHandler { kind: TransportKind, path: String },
    /// The serving loop stopped with an error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Pause after a failed accept, so a persistent error such as EMFILE cannot spin the loop.
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Limits applied by the serving loops.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Total time allowed per request on the async tiers.
    pub request_timeout: Duration,
    /// Per-connection read/write timeout on the raw socket tier.
    pub io_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Concurrent connections on the minimal tier.
    pub max_connections: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(10),
            max_body_bytes: 1024 * 1024,
            max_connections: 1000,
        }
    }
}

/// Where and how to bind.
#[derive(Debug, Clone)]
pub struct BindTarget {
    pub host: String,
    pub port: u16,
    /// Primary protocol path, when the tier serves the wrapped service.
    pub path_prefix: Option<String>,
    pub limits: ServerLimits,
    /// In-process stop trigger for the async tiers, alongside OS signals.
    pub shutdown: Option<Shutdown>,
}

impl BindTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path_prefix: None,
            limits: ServerLimits::default(),
            shutdown: None,
        }
    }

    pub fn from_config(config: &RuntimeConfig, path_prefix: Option<String>) -> Self {
        Self {
            host: config.bind_host.clone(),
            port: config.bind_port,
            path_prefix,
            limits: config.limits.clone(),
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_limits(mut self, limits: ServerLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn bind_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Bind {
            address: self.address(),
            source,
        }
    }
}

/// The serving half of a bound transport.
pub trait Serve: Send {
    /// Serve until shutdown. Only returns on a shutdown signal or a fatal error.
    fn serve(self: Box<Self>) -> Result<(), TransportError>;
}

/// The single transport instance holding the listening socket.
pub struct BoundServer {
    kind: TransportKind,
    local_addr: SocketAddr,
    server: Box<dyn Serve>,
}

impl BoundServer {
    pub fn new(kind: TransportKind, local_addr: SocketAddr, server: Box<dyn Serve>) -> Self {
        Self {
            kind,
            local_addr,
            server,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn serve(self) -> Result<(), TransportError> {
        self.server.serve()
    }
}

impl std::fmt::Debug for BoundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundServer")
            .field("kind", &self.kind)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// One concrete way of serving HTTP behind a uniform bind/serve contract.
pub trait TransportAdapter: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Bind the listening socket. Must fail before serving anything.
    fn bind(&self, target: &BindTarget, routes: RouteTable) -> Result<BoundServer, TransportError>;

    /// Bind, then serve for the remaining process lifetime.
    fn bind_and_serve(&self, target: &BindTarget, routes: RouteTable) -> Result<(), TransportError> {
        self.bind(target, routes)?.serve()
    }
}

/// The production adapter for a transport kind.
pub fn adapter_for(kind: TransportKind) -> Arc<dyn TransportAdapter> {
    match kind {
        TransportKind::FullAsync => Arc::new(FullAsyncTransport),
        TransportKind::MinimalAsync => Arc::new(MinimalAsyncTransport),
        TransportKind::RawSocket => Arc::new(RawSocketTransport),
    }
}

/// Current-thread runtime for the async tiers.
pub(crate) fn single_threaded_runtime(
    kind: TransportKind,
) -> Result<tokio::runtime::Runtime, TransportError> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(TransportError::NestedRuntime(kind));
    }
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(TransportError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_kind_parses_loosely() {
        assert_eq!("full_async".parse::<TransportKind>(), Ok(TransportKind::FullAsync));
        assert_eq!("Minimal-Async".parse::<TransportKind>(), Ok(TransportKind::MinimalAsync));
        assert_eq!(" raw_socket ".parse::<TransportKind>(), Ok(TransportKind::RawSocket));
        assert!("uvicorn".parse::<TransportKind>().is_err());
    }

    #[test]
    fn kinds_order_from_richest() {
        assert!(TransportKind::FullAsync < TransportKind::MinimalAsync);
        assert!(TransportKind::MinimalAsync < TransportKind::RawSocket);
    }

    #[tokio::test]
    async fn async_runtime_refuses_nesting() {
        let err = single_threaded_runtime(TransportKind::FullAsync).unwrap_err();
        assert!(matches!(err, TransportError::NestedRuntime(TransportKind::FullAsync)));
    }
}
