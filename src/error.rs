//! Centralized error types for the strangler-fig proxy

use thiserror::Error;

/// Proxy error types
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream call exceeded the forwarding timeout
    #[error("Upstream timed out after {0}ms")]
    UpstreamTimeout(u64),

    /// Upstream connection could not be established
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    /// Status the proxy answers with when this error surfaces at the bridge boundary.
    ///
    /// Failures while contacting the chosen backend (timeout, refused
    /// connection, broken transport) map to 502; anything unexpected is 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UpstreamTimeout(_) | Self::UpstreamUnreachable(_) | Self::Http(_) => 502,
            _ => 500,
        }
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_failures_map_to_502() {
        assert_eq!(ProxyError::UpstreamTimeout(30_000).status_code(), 502);
        assert_eq!(
            ProxyError::UpstreamUnreachable("refused".into()).status_code(),
            502
        );
    }

    #[test]
    fn test_unexpected_failures_map_to_500() {
        assert_eq!(ProxyError::Config("bad".into()).status_code(), 500);
        assert_eq!(ProxyError::Other("boom".into()).status_code(), 500);
        let io = ProxyError::Io(std::io::Error::new(std::io::ErrorKind::Other, "io"));
        assert_eq!(io.status_code(), 500);
    }

    #[test]
    fn test_timeout_message_carries_duration() {
        let err = ProxyError::UpstreamTimeout(30_000);
        assert!(err.to_string().contains("30000ms"));
    }
}
