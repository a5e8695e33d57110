//! Client configuration.
//!
//! # Example
//!
//! ```rust
//! use ledgerlake_core::ArchiveConfig;
//!
//! let config = ArchiveConfig::builder("https://archive.example.com/ledgers/pubnet/")
//!     .max_retries(5)
//!     .max_concurrent_downloads(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_retries(), 5);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LakeError;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 32;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;

/// Immutable, validated archive client configuration.
///
/// Deserializing runs the same validation as [`ArchiveConfigBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawArchiveConfig", into = "RawArchiveConfig")]
pub struct ArchiveConfig {
    base_url: String,
    request_timeout: Duration,
    max_retries: u32,
    max_concurrent_downloads: usize,
    cache_capacity: usize,
    retry_backoff: Duration,
}

impl ArchiveConfig {
    /// Start building a config for the archive rooted at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::new(base_url)
    }

    /// Config with every default for the archive rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, LakeError> {
        Self::builder(base_url).build()
    }

    /// Archive root. Always ends with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Additional attempts after the first failed download.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_concurrent_downloads
    }

    /// Number of decompressed batches kept in the default in-memory cache.
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Linear backoff step: retry `k` waits `k * retry_backoff`.
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Location of the archive's layout descriptor.
    pub fn schema_url(&self) -> String {
        format!("{}.config.json", self.base_url)
    }

    fn validate(self) -> Result<Self, LakeError> {
        if self.base_url.is_empty() {
            return Err(LakeError::Config("base_url must not be empty".into()));
        }
        if !self.base_url.ends_with('/') {
            return Err(LakeError::Config(format!(
                "base_url must end with '/': {}",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(LakeError::Config("request_timeout must be > 0".into()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(LakeError::Config(
                "max_concurrent_downloads must be > 0".into(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(LakeError::Config("cache_capacity must be > 0".into()));
        }
        Ok(self)
    }
}

/// Fluent builder for [`ArchiveConfig`].
#[derive(Debug, Clone)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ArchiveConfig {
                base_url: base_url.into(),
                request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
                max_retries: DEFAULT_MAX_RETRIES,
                max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
                cache_capacity: DEFAULT_CACHE_CAPACITY,
                retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            },
        }
    }

    /// Per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn request_timeout_ms(self, ms: u64) -> Self {
        self.request_timeout(Duration::from_millis(ms))
    }

    /// Retries after the first failed attempt (0 = no retry).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Client-wide bound on simultaneous downloads.
    pub fn max_concurrent_downloads(mut self, n: usize) -> Self {
        self.config.max_concurrent_downloads = n;
        self
    }

    /// Capacity (in batches) of the default in-memory cache.
    pub fn cache_capacity(mut self, n: usize) -> Self {
        self.config.cache_capacity = n;
        self
    }

    /// Linear backoff step between download attempts.
    pub fn retry_backoff(mut self, step: Duration) -> Self {
        self.config.retry_backoff = step;
        self
    }

    /// Validate and build the config.
    pub fn build(self) -> Result<ArchiveConfig, LakeError> {
        self.config.validate()
    }
}

/// Wire form of [`ArchiveConfig`], durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArchiveConfig {
    base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_max_concurrent_downloads")]
    max_concurrent_downloads: usize,
    #[serde(default = "default_cache_capacity")]
    cache_capacity: usize,
    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,
}

fn default_request_timeout_ms() -> u64 { DEFAULT_REQUEST_TIMEOUT_MS }
fn default_max_retries() -> u32 { DEFAULT_MAX_RETRIES }
fn default_max_concurrent_downloads() -> usize { DEFAULT_MAX_CONCURRENT_DOWNLOADS }
fn default_cache_capacity() -> usize { DEFAULT_CACHE_CAPACITY }
fn default_retry_backoff_ms() -> u64 { DEFAULT_RETRY_BACKOFF_MS }

impl TryFrom<RawArchiveConfig> for ArchiveConfig {
    type Error = LakeError;

    fn try_from(raw: RawArchiveConfig) -> Result<Self, Self::Error> {
        ArchiveConfig::builder(raw.base_url)
            .request_timeout_ms(raw.request_timeout_ms)
            .max_retries(raw.max_retries)
            .max_concurrent_downloads(raw.max_concurrent_downloads)
            .cache_capacity(raw.cache_capacity)
            .retry_backoff(Duration::from_millis(raw.retry_backoff_ms))
            .build()
    }
}

impl From<ArchiveConfig> for RawArchiveConfig {
    fn from(c: ArchiveConfig) -> Self {
        Self {
            base_url: c.base_url,
            request_timeout_ms: c.request_timeout.as_millis() as u64,
            max_retries: c.max_retries,
            max_concurrent_downloads: c.max_concurrent_downloads,
            cache_capacity: c.cache_capacity,
            retry_backoff_ms: c.retry_backoff.as_millis() as u64,
        }
    }
}
