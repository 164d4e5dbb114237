//! Minimal async tier: bare hyper HTTP/1.1 connections, no middleware stack.
//!
//! # Responsibilities
//! - Accept connections through the bounded [`Listener`]
//! - Spawn one task per connection on a current-thread runtime
//! - Collect bodies under a size limit and dispatch to the [`RouteTable`]

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::runtime::Runtime;
use tracing::Instrument;

use crate::http::{RouteTable, ServiceRequest, ServiceResponse};
use crate::lifecycle::signals::shutdown_or_trigger;
use crate::net::{ConnectionId, Listener, ListenerError};
use crate::transport::{
    single_threaded_runtime, BindTarget, BoundServer, Serve, TransportAdapter, TransportError,
    TransportKind, ACCEPT_BACKOFF,
};

/// Adapter for the bare hyper tier.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalAsyncTransport;

impl TransportAdapter for MinimalAsyncTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::MinimalAsync
    }

    fn bind(&self, target: &BindTarget, routes: RouteTable) -> Result<BoundServer, TransportError> {
        let runtime = single_threaded_runtime(TransportKind::MinimalAsync)?;

        let listener = runtime
            .block_on(Listener::bind(
                &target.host,
                target.port,
                target.limits.max_connections,
            ))
            .map_err(|e| match e {
                ListenerError::Bind(source) | ListenerError::Accept(source) => target.bind_error(source),
                ListenerError::Closed => {
                    target.bind_error(std::io::Error::other("connection limit closed"))
                }
            })?;
        let local_addr = listener.local_addr().map_err(|e| target.bind_error(e))?;

        let server = MinimalAsyncServer {
            runtime,
            listener,
            routes: Arc::new(routes),
            max_body_bytes: target.limits.max_body_bytes,
            shutdown: Box::pin(shutdown_or_trigger(target.shutdown.as_ref())),
        };
        Ok(BoundServer::new(
            TransportKind::MinimalAsync,
            local_addr,
            Box::new(server),
        ))
    }
}

struct MinimalAsyncServer {
    runtime: Runtime,
    listener: Listener,
    routes: Arc<RouteTable>,
    max_body_bytes: usize,
    shutdown: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Serve for MinimalAsyncServer {
    fn serve(self: Box<Self>) -> Result<(), TransportError> {
        let MinimalAsyncServer {
            runtime,
            listener,
            routes,
            max_body_bytes,
            mut shutdown,
        } = *self;

        runtime.block_on(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let (stream, peer_addr, permit) = match accepted {
                            Ok(conn) => conn,
                            Err(ListenerError::Closed) => return Ok(()),
                            Err(e) => {
                                back_off_after(&e, ACCEPT_BACKOFF).await;
                                continue;
                            }
                        };

                        let routes = Arc::clone(&routes);
                        let connection_id = ConnectionId::new();
                        let span = tracing::debug_span!(
                            "connection",
                            connection_id = %connection_id,
                            peer = %peer_addr,
                        );

                        tokio::spawn(
                            async move {
                                let _permit = permit;
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |request| {
                                    handle_request(request, Arc::clone(&routes), max_body_bytes)
                                });

                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    tracing::debug!(error = %e, "Connection error");
                                }
                            }
                            .instrument(span),
                        );
                    }
                    _ = &mut shutdown => {
                        tracing::info!("Minimal async server stopped");
                        return Ok(());
                    }
                }
            }
        })
    }
}

/// Log a failed accept and pause before the next one.
async fn back_off_after(error: &ListenerError, backoff: Duration) {
    tracing::warn!(error = %error, "Failed to accept connection");
    tokio::time::sleep(backoff).await;
}

async fn handle_request(
    request: Request<Incoming>,
    routes: Arc<RouteTable>,
    max_body_bytes: usize,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = request.into_parts();

    let body = match Limited::new(body, max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Ok(ServiceResponse::payload_too_large().into_hyper());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return Ok(ServiceResponse::bad_request("failed to read request body").into_hyper());
        }
    };

    let request = ServiceRequest::from_parts(&parts, body);
    let request_id = request
        .request_id()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method,
        path = %request.path,
    );

    let response = async {
        let response = routes.dispatch(request).await;
        tracing::info!(status = %response.status, "Request completed");
        response
    }
    .instrument(span)
    .await;

    Ok(response.into_hyper())
}
