//! Archive object transport backed by `reqwest`.
//!
//! Plain GETs only. Retry, concurrency limits and caching live in
//! `ledgerlake-core`; this layer maps HTTP outcomes onto `TransportError`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use ledgerlake_core::{ArchiveConfig, ArchiveTransport, LakeError, TransportError};

/// Configuration for `HttpArchiveTransport`.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 16,
            user_agent: concat!("ledgerlake/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpTransportConfig {
    /// Defaults with timeout and pool size taken from an archive config.
    pub fn for_archive(config: &ArchiveConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            pool_max_idle_per_host: config.max_concurrent_downloads(),
            ..Self::default()
        }
    }
}

/// HTTP(S) object reader for a data-lake archive.
pub struct HttpArchiveTransport {
    http: reqwest::Client,
    request_timeout: Duration,
    closed: AtomicBool,
}

impl HttpArchiveTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, LakeError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| LakeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            request_timeout: config.request_timeout,
            closed: AtomicBool::new(false),
        })
    }

    pub fn for_archive(config: &ArchiveConfig) -> Result<Self, LakeError> {
        Self::new(HttpTransportConfig::for_archive(config))
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ArchiveTransport for HttpArchiveTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "archive request failed");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.bytes().await.map_err(|e| self.request_error(url, e))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
