//! Process lifecycle — ties configuration, router, and bridge together
//!
//! The server owns the listener task: `start` binds the configured port,
//! `shutdown` stops accepting and drains in-flight requests before the
//! process terminates.

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::forward::Forwarder;
use crate::listener::{self, ListenerState};
use crate::observability::AccessLog;
use crate::policy::{RandomPolicy, SplitPolicy};
use crate::router::Router;
use crate::{HealthStatus, ProxyState};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// The proxy process — coordinates listener, router, and pass-through bridge
pub struct ProxyServer {
    /// Immutable configuration, shared with every request handler
    config: Arc<ProxyConfig>,
    /// Proxy runtime state
    state: RwLock<ProxyState>,
    /// Start time
    start_time: Instant,
    /// Shutdown signal for the accept loop
    shutdown_tx: watch::Sender<bool>,
    /// State shared with the listener
    listener_state: Arc<ListenerState>,
    /// Accept-loop task handle
    handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl ProxyServer {
    /// Create a proxy with the production randomness source.
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Self::with_policy(config, Arc::new(RandomPolicy))
    }

    /// Create a proxy with an injected traffic-split policy.
    pub fn with_policy(config: ProxyConfig, policy: Arc<dyn SplitPolicy>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let (shutdown_tx, _) = watch::channel(false);

        let listener_state = Arc::new(ListenerState {
            router: Router::new(config.clone(), policy),
            forwarder: Forwarder::with_timeout(Duration::from_secs(config.upstream_timeout_secs)),
            access_log: AccessLog::new(),
            active_requests: AtomicUsize::new(0),
            total_requests: AtomicU64::new(0),
        });

        Ok(Self {
            config,
            state: RwLock::new(ProxyState::Created),
            start_time: Instant::now(),
            shutdown_tx,
            listener_state,
            handle: RwLock::new(None),
        })
    }

    /// Bind the configured port and start accepting connections.
    pub async fn start(&self) -> Result<()> {
        self.set_state(ProxyState::Starting);

        let addr: SocketAddr = ([0, 0, 0, 0], self.config.listen_port).into();
        let handle = listener::start_listener(
            addr,
            self.listener_state.clone(),
            self.shutdown_tx.subscribe(),
        )
        .await?;

        *self.handle.write().unwrap() = Some(handle);
        self.set_state(ProxyState::Running);
        tracing::info!(port = self.config.listen_port, "Strangler Fig Proxy is running");

        Ok(())
    }

    /// Stop accepting connections, then wait for in-flight handling to finish.
    ///
    /// The drain is bounded by `shutdown_timeout_secs`.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return; // Already shutting down
        }

        self.set_state(ProxyState::Stopping);
        tracing::info!("Proxy shutting down");

        let deadline = Instant::now() + Duration::from_secs(self.config.shutdown_timeout_secs);
        loop {
            let active = self.listener_state.active_requests.load(Ordering::Relaxed);
            if active == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(active, "Drain timeout reached, stopping with requests in flight");
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if let Some(handle) = self.handle.write().unwrap().take() {
            handle.abort();
        }

        self.set_state(ProxyState::Stopped);
        tracing::info!("Proxy stopped");
    }

    /// Wait for a shutdown signal (Ctrl+C), then shut down gracefully.
    pub async fn wait_for_shutdown(&self) {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        self.shutdown().await;
    }

    /// Get the current proxy state
    pub fn state(&self) -> ProxyState {
        self.state.read().unwrap().clone()
    }

    /// Check if the proxy is running
    pub fn is_running(&self) -> bool {
        self.state() == ProxyState::Running
    }

    /// Get a health status snapshot
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            state: self.state(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            active_requests: self.listener_state.active_requests.load(Ordering::Relaxed),
            total_requests: self.listener_state.total_requests.load(Ordering::Relaxed),
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn set_state(&self, new_state: ProxyState) {
        let mut state = self.state.write().unwrap();
        tracing::debug!(from = %*state, to = %new_state, "State transition");
        *state = new_state;
    }
}
