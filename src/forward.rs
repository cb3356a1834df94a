//! Forwarder — the outbound half of the pass-through bridge
//!
//! Relays one buffered inbound request to the decided backend, preserving
//! method, filtered headers, and raw body bytes. Single attempt, bounded by
//! a per-call timeout; no retry on failure.

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use std::time::Duration;

/// Forwards requests to the chosen backend over a shared HTTP client.
pub struct Forwarder {
    client: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder with the default 30 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a forwarder with a custom per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(100)
            .build()
            .unwrap_or_default();

        Self { client, timeout }
    }

    /// Relay one request to `base_url`, returning the backend's response.
    pub async fn forward(
        &self,
        base_url: &str,
        method: &http::Method,
        path_and_query: &str,
        headers: &http::HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse> {
        let upstream_url = rebase_url(base_url, path_and_query);

        let mut req_builder = self.client.request(method.clone(), &upstream_url);

        // Copy headers, dropping the connection-scoped set; the client
        // recomputes Host and Content-Length for the new connection.
        for (key, value) in headers.iter() {
            if !is_dropped_request_header(key.as_str()) {
                req_builder = req_builder.header(key.clone(), value.clone());
            }
        }

        let response = req_builder.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProxyError::UpstreamTimeout(self.timeout.as_millis() as u64)
            } else if e.is_connect() {
                ProxyError::UpstreamUnreachable(format!(
                    "cannot connect to {}: {}",
                    upstream_url, e
                ))
            } else {
                ProxyError::Http(e)
            }
        })?;

        let status = response.status();
        let resp_headers = response.headers().clone();
        let resp_body = response.bytes().await.map_err(ProxyError::Http)?;

        Ok(UpstreamResponse {
            status,
            headers: resp_headers,
            body: resp_body,
        })
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from the chosen backend
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response headers as returned by the backend
    pub headers: http::HeaderMap,
    /// Fully buffered response body
    pub body: Bytes,
}

/// Join a base authority and the original path-and-query.
fn rebase_url(base_url: &str, path_and_query: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path_and_query)
}

/// Headers never copied onto the outbound request: the RFC 7230 hop-by-hop
/// set plus Host and Content-Length, which belong to the new connection.
fn is_dropped_request_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "host"
            | "content-length"
            | "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
