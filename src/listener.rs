//! Listener — accepts connections and bridges each request to its backend
//!
//! Every connection is served on its own task; the only shared state is the
//! immutable configuration, the split policy, and a pair of counters, so no
//! locking happens on the request path. The local liveness path is answered
//! here without contacting any backend.

use crate::error::{ProxyError, Result};
use crate::forward::{Forwarder, UpstreamResponse};
use crate::observability::AccessLog;
use crate::router::Router;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Local liveness path, answered without contacting any backend.
pub const HEALTH_PATH: &str = "/health";

const HEALTH_BODY: &str = "Strangler Fig Proxy is healthy";

/// Shared state for request handling
pub struct ListenerState {
    pub router: Router,
    pub forwarder: Forwarder,
    pub access_log: AccessLog,
    /// Requests currently being handled (drained on shutdown)
    pub active_requests: AtomicUsize,
    /// Requests handled since start
    pub total_requests: AtomicU64,
}

/// Bind `addr` and run the accept loop until the shutdown signal flips.
///
/// Stopping the loop only stops accepting; in-flight connections keep their
/// own tasks and are drained by the server's shutdown.
pub async fn start_listener(
    addr: SocketAddr,
    state: Arc<ListenerState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<tokio::task::JoinHandle<()>> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ProxyError::Other(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(address = %addr, "Proxy listening");

    let handle = tokio::spawn(async move {
        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                _ = shutdown.changed() => {
                    tracing::info!("Listener stopped accepting connections");
                    break;
                }
            };

            let state = state.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let served = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(|req| handle_request(req, remote_addr, state.clone())),
                    )
                    .await;
                if let Err(e) = served {
                    tracing::debug!(error = %e, remote = %remote_addr, "Connection ended");
                }
            });
        }
    });

    Ok(handle)
}

/// Handle one request: liveness fast path, or Router → Forwarder → Responder.
async fn handle_request(
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    state: Arc<ListenerState>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    state.total_requests.fetch_add(1, Ordering::Relaxed);
    state.active_requests.fetch_add(1, Ordering::Relaxed);
    let _in_flight = InFlightGuard(&state.active_requests);

    let (parts, body) = req.into_parts();

    // Liveness must stay healthy even when every backend is down.
    if parts.uri.path() == HEALTH_PATH {
        return Ok(hyper::Response::builder()
            .status(200)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from(HEALTH_BODY)))
            .unwrap());
    }

    let body_bytes = match http_body_util::BodyExt::collect(body).await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let tracker = state.access_log.start_request();

    // Routing decision: computed once per request, never revisited.
    let decision = state.router.determine(&method, &path);

    match state
        .forwarder
        .forward(
            &decision.base_url,
            &method,
            &path_and_query,
            &parts.headers,
            body_bytes,
        )
        .await
    {
        Ok(upstream) => {
            state.access_log.record(&tracker.build_entry(
                remote_addr.ip().to_string(),
                method.to_string(),
                path,
                upstream.status.as_u16(),
                upstream.body.len() as u64,
                Some(decision.base_url.clone()),
                decision.draw,
                None,
            ));
            Ok(relay_response(upstream))
        }
        Err(e) => {
            let status = e.status_code();
            tracing::error!(
                error = %e,
                destination = %decision.upstream,
                method = %method,
                path,
                "Proxy error"
            );
            state.access_log.record(&tracker.build_entry(
                remote_addr.ip().to_string(),
                method.to_string(),
                path,
                status,
                0,
                Some(decision.base_url.clone()),
                decision.draw,
                Some(e.to_string()),
            ));
            Ok(error_response(status, &e))
        }
    }
}

/// Relay the backend response, recomputing transport-level headers.
///
/// The body is handed to hyper as an exact-size buffer, so Content-Length is
/// recomputed from the bytes actually relayed.
fn relay_response(upstream: UpstreamResponse) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(upstream.status);
    for (key, value) in upstream.headers.iter() {
        if !is_dropped_response_header(key.as_str()) {
            builder = builder.header(key, value);
        }
    }
    builder.body(Full::new(upstream.body)).unwrap()
}

/// Build the proxy's own structured error response.
///
/// 502 carries the failure reason; everything else stays generic.
fn error_response(status: u16, error: &ProxyError) -> hyper::Response<Full<Bytes>> {
    let message = if status == 502 {
        error.to_string()
    } else {
        "Internal Server Error".to_string()
    };
    let body = serde_json::json!({ "error": message }).to_string();
    hyper::Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Headers recomputed for the client connection rather than copied.
fn is_dropped_response_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "content-length" | "transfer-encoding" | "connection" | "keep-alive"
    )
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
