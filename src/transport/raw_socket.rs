//! Raw socket tier: blocking `std::net` listener, one connection at a time.
//!
//! # Responsibilities
//! - Parse a minimal subset of HTTP/1.1 (request line, headers, Content-Length body)
//! - Run synchronous handlers in place
//! - Close every connection after one response
//!
//! # Design Decisions
//! - No runtime, no threads: a connection is fully handled before the next accept
//! - Read/write timeouts bound how long one client can hold the tier
//! - Chunked request bodies are refused with 400

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use bytes::Bytes;
use thiserror::Error;

use crate::http::{RouteTable, ServiceRequest, ServiceResponse};
use crate::net::ConnectionId;
use crate::transport::{
    BindTarget, BoundServer, Serve, ServerLimits, TransportAdapter, TransportError, TransportKind,
    ACCEPT_BACKOFF,
};

const MAX_LINE_BYTES: u64 = 8 * 1024;
const MAX_HEADERS: usize = 100;
const LINGER_DRAIN_BYTES: usize = 64 * 1024;

/// Adapter for the blocking socket tier.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketTransport;

impl TransportAdapter for RawSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::RawSocket
    }

    fn bind(&self, target: &BindTarget, routes: RouteTable) -> Result<BoundServer, TransportError> {
        if let Some(path) = routes.first_async_path() {
            return Err(TransportError::UnsupportedHandler {
                kind: TransportKind::RawSocket,
                path: path.to_string(),
            });
        }

        let listener = TcpListener::bind((target.host.as_str(), target.port))
            .map_err(|e| target.bind_error(e))?;
        let local_addr = listener.local_addr().map_err(|e| target.bind_error(e))?;

        let server = RawSocketServer {
            listener,
            routes,
            limits: target.limits.clone(),
        };
        Ok(BoundServer::new(
            TransportKind::RawSocket,
            local_addr,
            Box::new(server),
        ))
    }
}

/// Error type for a single raw connection.
#[derive(Debug, Error)]
enum RequestError {
    #[error("connection closed before a request line")]
    Empty,
    #[error("malformed request: {0}")]
    Malformed(&'static str),
    #[error("request body too large")]
    TooLarge,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

struct RawSocketServer {
    listener: TcpListener,
    routes: RouteTable,
    limits: ServerLimits,
}

impl Serve for RawSocketServer {
    fn serve(self: Box<Self>) -> Result<(), TransportError> {
        accept_loop(
            self.listener.incoming(),
            |stream| self.handle_connection(stream),
            ACCEPT_BACKOFF,
        );
        Ok(())
    }
}

/// Handle each accepted stream to completion before taking the next one.
fn accept_loop(
    incoming: impl Iterator<Item = std::io::Result<TcpStream>>,
    mut handle: impl FnMut(TcpStream),
    backoff: Duration,
) {
    for stream in incoming {
        match stream {
            Ok(stream) => handle(stream),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                std::thread::sleep(backoff);
            }
        }
    }
}

impl RawSocketServer {
    fn handle_connection(&self, stream: TcpStream) {
        let connection_id = ConnectionId::new();
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        if let Err(e) = stream
            .set_read_timeout(Some(self.limits.io_timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.limits.io_timeout)))
        {
            tracing::debug!(connection_id = %connection_id, error = %e, "Failed to set socket timeouts");
        }

        let response = match read_request(&stream, self.limits.max_body_bytes) {
            Ok(request) => {
                let response = self.routes.dispatch_blocking(&request);
                tracing::info!(
                    connection_id = %connection_id,
                    peer = %peer,
                    method = %request.method,
                    path = %request.path,
                    status = %response.status,
                    "Request completed"
                );
                response
            }
            Err(RequestError::Empty) => return,
            Err(RequestError::TooLarge) => ServiceResponse::payload_too_large(),
            Err(RequestError::Malformed(reason)) => ServiceResponse::bad_request(reason),
            Err(RequestError::Io(e)) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "Failed to read request");
                return;
            }
        };

        if let Err(e) = write_response(&stream, &response) {
            tracing::debug!(connection_id = %connection_id, error = %e, "Failed to write response");
        }
        linger_close(&stream);
    }
}

/// Half-close and drain unread input so the peer sees the response instead of a reset.
fn linger_close(mut stream: &TcpStream) {
    if stream.shutdown(std::net::Shutdown::Write).is_err() {
        return;
    }
    let mut sink = [0u8; 4096];
    let mut drained = 0usize;
    while drained < LINGER_DRAIN_BYTES {
        match stream.read(&mut sink) {
            Ok(0) | Err(_) => break,
            Ok(n) => drained += n,
        }
    }
}

fn read_line(reader: &mut impl BufRead) -> Result<String, RequestError> {
    let mut line = String::new();
    let read = reader.by_ref().take(MAX_LINE_BYTES).read_line(&mut line)?;
    if read > 0 && !line.ends_with('\n') {
        return Err(RequestError::Malformed("line too long"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_request(stream: &TcpStream, max_body_bytes: usize) -> Result<ServiceRequest, RequestError> {
    let mut reader = BufReader::new(stream);

    let request_line = read_line(&mut reader)?;
    if request_line.is_empty() {
        return Err(RequestError::Empty);
    }

    let mut parts = request_line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None) => (method, target, version),
        _ => return Err(RequestError::Malformed("bad request line")),
    };
    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::Malformed("unsupported HTTP version"));
    }
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| RequestError::Malformed("bad method"))?;
    if !target.starts_with('/') {
        return Err(RequestError::Malformed("bad request target"));
    }

    let mut headers = HeaderMap::new();
    loop {
        let line = read_line(&mut reader)?;
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(RequestError::Malformed("too many headers"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or(RequestError::Malformed("bad header line"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| RequestError::Malformed("bad header name"))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| RequestError::Malformed("bad header value"))?;
        headers.append(name, value);
    }

    if headers.contains_key("transfer-encoding") {
        return Err(RequestError::Malformed("chunked bodies are not supported"));
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or(RequestError::Malformed("bad content-length"))?,
        None => 0,
    };
    if content_length > max_body_bytes {
        return Err(RequestError::TooLarge);
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let (path, query) = ServiceRequest::split_target(target);
    Ok(ServiceRequest {
        method,
        path,
        query,
        headers,
        body: Bytes::from(body),
    })
}

fn write_response(mut stream: &TcpStream, response: &ServiceResponse) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or("")
    );
    for (name, value) in &response.headers {
        if let Ok(value) = value.to_str() {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
    }
    head.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n",
        response.body.len()
    ));

    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}
