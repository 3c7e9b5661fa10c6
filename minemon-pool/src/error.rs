use thiserror::Error;

/// Errors surfaced by pool adapters and the shared HTTP access layer.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid or incomplete adapter configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream answered with a non-2xx status other than 401.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Upstream answered 401. The API key is wrong or the request rate
    /// was exceeded.
    #[error("HTTP 401 Unauthorized from {url}")]
    Unauthorized { url: String },

    /// TLS certificate verification failed.
    #[error("TLS error for {url}: {reason}")]
    Tls { url: String, reason: String },

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The response body did not have the expected shape.
    #[error("Unexpected response from {url}: {reason}")]
    ResponseFormat { url: String, reason: String },
}

/// Result type alias using PoolError.
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::Http {
            status: 503,
            url: "https://hiveon.net/api".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503 from https://hiveon.net/api");

        let err = PoolError::Unauthorized {
            url: "https://btg.suprnova.cc/index.php".to_string(),
        };
        assert!(err.to_string().starts_with("HTTP 401 Unauthorized"));

        let err = PoolError::Config("missing wallet".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing wallet");
    }
}
