//! Observability — structured access logging
//!
//! One JSON access-log entry per proxied request, carrying the routing
//! decision and any failure detail.

pub mod access_log;

pub use access_log::{AccessLog, AccessLogEntry};
