//! # Strangler Fig Proxy
//!
//! A single stable ingress point for migrating functionality off a legacy
//! monolith incrementally. The proxy intercepts all inbound traffic and,
//! per request, decides whether to serve it from the monolith or from a
//! newly extracted service — invisibly to clients.
//!
//! ## Architecture
//!
//! ```text
//! Client → Listener → Router (+ split policy) → Forwarder → Responder → Client
//! ```
//!
//! ## Routing rules
//!
//! - `/api/movies/health` → movies service, always (bypasses the split)
//! - `/api/movies/*` → split between monolith and movies service when
//!   gradual migration is enabled, monolith otherwise
//! - `/api/events/*` → events service, always
//! - anything else → monolith (the strangler-fig default)
//!
//! A local `/health` path answers directly, without contacting any backend.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strangler_proxy::{config::ProxyConfig, ProxyServer};
//!
//! #[tokio::main]
//! async fn main() -> strangler_proxy::Result<()> {
//!     let proxy = ProxyServer::new(ProxyConfig::from_env()?)?;
//!     proxy.start().await?;
//!     proxy.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub(crate) mod forward;
pub(crate) mod listener;
pub(crate) mod observability;
pub mod policy;
pub mod router;
pub mod server;

// Re-export main types
pub use error::{ProxyError, Result};
pub use server::ProxyServer;

use serde::{Deserialize, Serialize};

/// Proxy runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProxyState {
    /// Proxy has been created but not yet started
    #[default]
    Created,
    /// Proxy is binding its listener
    Starting,
    /// Proxy is accepting and bridging requests
    Running,
    /// Proxy is draining in-flight requests
    Stopping,
    /// Proxy has fully stopped
    Stopped,
}

impl std::fmt::Display for ProxyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Proxy health status snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Current proxy state
    pub state: ProxyState,
    /// Uptime in seconds since the proxy started
    pub uptime_secs: u64,
    /// Requests currently in flight
    pub active_requests: usize,
    /// Total requests handled since start
    pub total_requests: u64,
}
