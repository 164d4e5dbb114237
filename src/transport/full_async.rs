//! Full-featured async tier: axum router behind the tower-http stack.
//!
//! # Responsibilities
//! - Turn a [`RouteTable`] into an axum `Router`, one route per exact path
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Serve on a current-thread runtime with graceful shutdown

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::{RouteTable, ServiceRequest, ServiceResponse};
use crate::lifecycle::signals::shutdown_or_trigger;
use crate::transport::{
    single_threaded_runtime, BindTarget, BoundServer, Serve, TransportAdapter, TransportError,
    TransportKind,
};

/// Adapter for the axum-based tier.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullAsyncTransport;

impl TransportAdapter for FullAsyncTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::FullAsync
    }

    fn bind(&self, target: &BindTarget, routes: RouteTable) -> Result<BoundServer, TransportError> {
        let runtime = single_threaded_runtime(TransportKind::FullAsync)?;

        let listener = runtime
            .block_on(TcpListener::bind((target.host.as_str(), target.port)))
            .map_err(|e| target.bind_error(e))?;
        let local_addr = listener.local_addr().map_err(|e| target.bind_error(e))?;

        let router = build_router(
            Arc::new(routes),
            target.limits.request_timeout,
            target.limits.max_body_bytes,
        );

        tracing::debug!(
            address = %local_addr,
            path_prefix = target.path_prefix.as_deref().unwrap_or("-"),
            "Full async listener bound"
        );

        let server = FullAsyncServer {
            runtime,
            listener,
            router,
            shutdown: Box::pin(shutdown_or_trigger(target.shutdown.as_ref())),
        };
        Ok(BoundServer::new(
            TransportKind::FullAsync,
            local_addr,
            Box::new(server),
        ))
    }
}

struct FullAsyncServer {
    runtime: Runtime,
    listener: TcpListener,
    router: Router,
    shutdown: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Serve for FullAsyncServer {
    fn serve(self: Box<Self>) -> Result<(), TransportError> {
        let FullAsyncServer {
            runtime,
            listener,
            router,
            shutdown,
        } = *self;

        runtime
            .block_on(async move {
                axum::serve(listener, router.into_make_service())
                    .with_graceful_shutdown(shutdown)
                    .await
            })
            .map_err(TransportError::Serve)?;

        tracing::info!("Full async server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
fn build_router(routes: Arc<RouteTable>, request_timeout: Duration, max_body_bytes: usize) -> Router {
    let mut router = Router::new();
    for path in routes.paths() {
        let table = Arc::clone(&routes);
        router = router.route(
            &path,
            any(move |request: Request<Body>| dispatch(table, request, max_body_bytes)),
        );
    }

    router
        .fallback(|| async { ServiceResponse::not_found() })
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn dispatch(table: Arc<RouteTable>, request: Request<Body>, max_body_bytes: usize) -> ServiceResponse {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Rejected request body");
            return ServiceResponse::payload_too_large();
        }
    };
    table.dispatch(ServiceRequest::from_parts(&parts, body)).await
}
