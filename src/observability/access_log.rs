//! Structured access log — JSON-formatted request/response logging
//!
//! Produces one structured entry per proxied request, suitable for
//! ingestion by log aggregation systems.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A single access log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Client IP address
    pub client_ip: String,
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// HTTP status code returned to the client
    pub status: u16,
    /// Response size in bytes
    pub response_bytes: u64,
    /// Request duration in milliseconds
    pub duration_ms: u64,
    /// Base URL of the backend the request was routed to
    pub destination: Option<String>,
    /// Gradual-migration draw, when the split policy was consulted
    pub draw: Option<u8>,
    /// Failure detail, when the proxy answered with an error
    pub error: Option<String>,
}

/// Access log manager — tracks and emits structured log entries
pub struct AccessLog {
    total_entries: AtomicU64,
}

impl AccessLog {
    /// Create a new access log manager
    pub fn new() -> Self {
        Self {
            total_entries: AtomicU64::new(0),
        }
    }

    /// Start tracking a request. Returns a RequestTracker to measure duration.
    pub fn start_request(&self) -> RequestTracker {
        RequestTracker {
            start: Instant::now(),
        }
    }

    /// Record and emit a log entry
    pub fn record(&self, entry: &AccessLogEntry) {
        self.total_entries.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: "access_log",
            client_ip = entry.client_ip,
            method = entry.method,
            path = entry.path,
            status = entry.status,
            duration_ms = entry.duration_ms,
            destination = entry.destination.as_deref().unwrap_or("-"),
            "{}",
            serde_json::to_string(entry).unwrap_or_default()
        );
    }

    /// Get total number of logged entries
    #[allow(dead_code)]
    pub fn total_entries(&self) -> u64 {
        self.total_entries.load(Ordering::Relaxed)
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks request duration
pub struct RequestTracker {
    start: Instant,
}

impl RequestTracker {
    /// Get elapsed time in milliseconds since the request started
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Build an access log entry from the tracked request
    #[allow(clippy::too_many_arguments)]
    pub fn build_entry(
        &self,
        client_ip: String,
        method: String,
        path: String,
        status: u16,
        response_bytes: u64,
        destination: Option<String>,
        draw: Option<u8>,
        error: Option<String>,
    ) -> AccessLogEntry {
        AccessLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            client_ip,
            method,
            path,
            status,
            response_bytes,
            duration_ms: self.elapsed_ms(),
            destination,
            draw,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> AccessLogEntry {
        AccessLogEntry {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            client_ip: "10.0.0.1".to_string(),
            method: "GET".to_string(),
            path: "/api/movies/42".to_string(),
            status: 200,
            response_bytes: 1024,
            duration_ms: 42,
            destination: Some("http://movies-service:8081".to_string()),
            draw: Some(17),
            error: None,
        }
    }

    #[test]
    fn test_entry_serialization() {
        let entry = sample_entry();
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"method\":\"GET\""));
        assert!(json.contains("\"draw\":17"));

        let parsed: AccessLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.path, "/api/movies/42");
        assert_eq!(parsed.draw, Some(17));
    }

    #[test]
    fn test_entry_with_error_detail() {
        let entry = AccessLogEntry {
            status: 502,
            draw: None,
            error: Some("Upstream unreachable: cannot connect".to_string()),
            ..sample_entry()
        };
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: AccessLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, 502);
        assert!(parsed.draw.is_none());
        assert!(parsed.error.unwrap().contains("unreachable"));
    }

    #[test]
    fn test_access_log_total_entries() {
        let log = AccessLog::new();
        assert_eq!(log.total_entries(), 0);
        log.record(&sample_entry());
        log.record(&sample_entry());
        assert_eq!(log.total_entries(), 2);
    }

    #[test]
    fn test_request_tracker_build_entry() {
        let log = AccessLog::new();
        let tracker = log.start_request();
        let entry = tracker.build_entry(
            "10.0.0.1".to_string(),
            "POST".to_string(),
            "/api/events/movie".to_string(),
            201,
            256,
            Some("http://events-service:8082".to_string()),
            None,
            None,
        );
        assert_eq!(entry.method, "POST");
        assert_eq!(entry.status, 201);
        assert_eq!(entry.response_bytes, 256);
        assert!(!entry.timestamp.is_empty());
    }
}
