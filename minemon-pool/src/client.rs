//! HTTP access layer shared by all pool adapters.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::cache::ResponseCache;
use crate::error::{PoolError, Result};

/// Settings for the underlying HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification. Some pools serve chronically
    /// broken certificates; off unless an instance opts in.
    pub accept_invalid_certs: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
        }
    }
}

/// JSON-over-HTTP client with a shared response cache.
///
/// Every upstream call goes through [`ApiClient::call`], which gives all
/// adapters the same error taxonomy and the same caching behaviour.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    cache: Arc<ResponseCache>,
}

impl ApiClient {
    /// Build a client over the given shared cache.
    pub fn new(cache: Arc<ResponseCache>, settings: &HttpSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| PoolError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, cache })
    }

    /// GET a JSON document, consulting the shared cache first.
    ///
    /// Non-2xx statuses always map to errors: 401 to
    /// [`PoolError::Unauthorized`] (logged here, since it usually means a
    /// bad API key or an exceeded request rate), everything else to
    /// [`PoolError::Http`]. Certificate verification failures surface as
    /// [`PoolError::Tls`]. Only successful responses are cached.
    pub async fn call(&self, url: &str) -> Result<Value> {
        if let Some(body) = self.cache.get(url) {
            trace!(url, "Response cache hit");
            return Ok(body);
        }

        debug!(url, "Requesting upstream API");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify_send_error(url, &e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            error!(
                url,
                "Received HTTP 401 unauthorized: the API key is wrong or too many requests have occurred"
            );
            return Err(PoolError::Unauthorized {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PoolError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = response.json().await.map_err(|e| PoolError::ResponseFormat {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.cache.insert(url, body.clone());
        Ok(body)
    }
}

/// Decode a JSON value into a typed structure.
pub fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| PoolError::ResponseFormat {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Map a reqwest send error onto the pool error taxonomy.
///
/// reqwest has no dedicated certificate-failure variant, so the error
/// source chain is scanned for TLS vocabulary.
fn classify_send_error(url: &str, err: &reqwest::Error) -> PoolError {
    let reason = error_chain(err);
    let lowered = reason.to_lowercase();

    if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("handshake")
    {
        PoolError::Tls {
            url: url.to_string(),
            reason,
        }
    } else {
        PoolError::Transport {
            url: url.to_string(),
            reason,
        }
    }
}

/// Collect an error and its sources into one readable string.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}
