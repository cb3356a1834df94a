//! Boot-time configuration for the strangler-fig proxy
//!
//! All values are sourced from the environment once at startup, validated,
//! and shared by reference across request handlers. Nothing mutates the
//! configuration after the process starts.

use crate::error::{ProxyError, Result};

/// Proxy configuration — immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port the proxy listens on (`PORT`, default 8000)
    pub listen_port: u16,

    /// Base URL of the legacy monolith (`MONOLITH_URL`)
    pub monolith_url: String,

    /// Base URL of the extracted movies service (`MOVIES_SERVICE_URL`)
    pub movies_service_url: String,

    /// Base URL of the extracted events service (`EVENTS_SERVICE_URL`)
    pub events_service_url: String,

    /// Whether gradual migration of movies traffic is enabled
    /// (`GRADUAL_MIGRATION`, default false)
    pub gradual_migration: bool,

    /// Share of movies traffic routed to the movies service when gradual
    /// migration is enabled (`MOVIES_MIGRATION_PERCENT`, 0–100, default 0)
    pub movies_migration_percent: u8,

    /// Per-call timeout for upstream requests in seconds
    /// (`UPSTREAM_TIMEOUT_SECS`, default 30)
    pub upstream_timeout_secs: u64,

    /// Graceful shutdown drain timeout in seconds
    /// (`SHUTDOWN_TIMEOUT_SECS`, default 30)
    pub shutdown_timeout_secs: u64,
}

impl ProxyConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value lookup.
    ///
    /// `from_env` delegates here; tests supply a map instead of mutating
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            listen_port: parse_number(&lookup, "PORT", 8000)?,
            monolith_url: lookup("MONOLITH_URL")
                .unwrap_or_else(|| "http://monolith:8080".to_string()),
            movies_service_url: lookup("MOVIES_SERVICE_URL")
                .unwrap_or_else(|| "http://movies-service:8081".to_string()),
            events_service_url: lookup("EVENTS_SERVICE_URL")
                .unwrap_or_else(|| "http://events-service:8082".to_string()),
            gradual_migration: parse_flag(&lookup, "GRADUAL_MIGRATION"),
            movies_migration_percent: parse_number(&lookup, "MOVIES_MIGRATION_PERCENT", 0)?,
            upstream_timeout_secs: parse_number(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_number(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.movies_migration_percent > 100 {
            return Err(ProxyError::Config(format!(
                "MOVIES_MIGRATION_PERCENT must be within 0-100, got {}",
                self.movies_migration_percent
            )));
        }

        for (name, url) in [
            ("MONOLITH_URL", &self.monolith_url),
            ("MOVIES_SERVICE_URL", &self.movies_service_url),
            ("EVENTS_SERVICE_URL", &self.events_service_url),
        ] {
            reqwest::Url::parse(url).map_err(|e| {
                ProxyError::Config(format!("{} is not a valid base URL ({}): {}", name, url, e))
            })?;
        }

        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: 8000,
            monolith_url: "http://monolith:8080".to_string(),
            movies_service_url: "http://movies-service:8081".to_string(),
            events_service_url: "http://events-service:8082".to_string(),
            gradual_migration: false,
            movies_migration_percent: 0,
            upstream_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ProxyError::Config(format!("{} must be a number, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

/// Boolean flags are enabled only by a case-insensitive `true`; any other
/// value (or absence) disables them.
fn parse_flag(lookup: impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|raw| raw.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
