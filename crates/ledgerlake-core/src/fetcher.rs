//! Batch fetcher: cache lookup, bounded-concurrency download with retry,
//! decode, validation and cache population.
//!
//! ```text
//! fetch(ledger)
//!   ├── schema → batch start (cache key) + url
//!   ├── cache hit  → decode ──ok──▶ return
//!   │                  └─corrupt─▶ evict, fall through
//!   └── download + decompress (permit, timeout, linear retry)
//!         → decode → validate → cache.put(batch start) → return
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::address;
use crate::cache::BatchCache;
use crate::config::ArchiveConfig;
use crate::decoder::BatchDecoder;
use crate::error::{LakeError, TransportError};
use crate::meta::LedgerCloseMetaBatch;
use crate::policy::{RetryConfig, RetryPolicy};
use crate::schema::{ArchiveSchema, SchemaResolver};
use crate::transport::ArchiveTransport;

/// Counters snapshot for a fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchMetrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Successful downloads.
    pub downloads: u64,
    /// Download attempts that were retried.
    pub retries: u64,
    /// Cached entries dropped because they failed to decode.
    pub corrupt_evictions: u64,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    downloads: AtomicU64,
    retries: AtomicU64,
    corrupt_evictions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FetchMetrics {
        FetchMetrics {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            corrupt_evictions: self.corrupt_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Fetches decoded batches for ledger sequences.
///
/// One fetcher (and so one download semaphore) is shared by every query and
/// point lookup of a client.
pub struct BatchFetcher {
    base_url: String,
    transport: Arc<dyn ArchiveTransport>,
    resolver: Arc<SchemaResolver>,
    cache: Arc<dyn BatchCache>,
    decoder: Arc<BatchDecoder>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
    request_timeout: Duration,
    counters: Counters,
}

impl BatchFetcher {
    pub fn new(
        config: &ArchiveConfig,
        transport: Arc<dyn ArchiveTransport>,
        resolver: Arc<SchemaResolver>,
        cache: Arc<dyn BatchCache>,
        decoder: Arc<BatchDecoder>,
    ) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            transport,
            resolver,
            cache,
            decoder,
            retry: RetryPolicy::new(RetryConfig {
                max_retries: config.max_retries(),
                backoff_step: config.retry_backoff(),
            }),
            permits: Arc::new(Semaphore::new(config.max_concurrent_downloads())),
            request_timeout: config.request_timeout(),
            counters: Counters::default(),
        }
    }

    pub async fn schema(&self) -> Result<&ArchiveSchema, LakeError> {
        self.resolver.schema().await
    }

    pub fn decoder(&self) -> &BatchDecoder {
        &self.decoder
    }

    /// Cache key and url of the batch covering `ledger`.
    pub async fn locate(&self, ledger: u32) -> Result<(u32, String), LakeError> {
        let schema = self.schema().await?;
        if !self.decoder.accepts(&schema.compression) {
            return Err(LakeError::Config(format!(
                "archive compression '{}' does not match decompressor '{}'",
                schema.compression,
                self.decoder.decompressor().algorithm()
            )));
        }
        Ok((
            address::batch_start(ledger, schema.ledgers_per_batch),
            address::locate(&self.base_url, schema, ledger),
        ))
    }

    /// Decoded batch covering `ledger`.
    pub async fn fetch(&self, ledger: u32) -> Result<LedgerCloseMetaBatch, LakeError> {
        let (key, url) = self.locate(ledger).await?;

        match self.cache.get(key).await {
            Some(cached) => match self.decoder.decode(ledger, &url, &cached) {
                Ok(batch) => {
                    Counters::bump(&self.counters.cache_hits);
                    debug!(ledger, batch_start = key, "batch cache hit");
                    return Ok(batch);
                }
                Err(e) => {
                    Counters::bump(&self.counters.corrupt_evictions);
                    warn!(ledger, batch_start = key, error = %e, "evicting corrupt cache entry");
                    self.cache.remove(key).await;
                }
            },
            None => {
                Counters::bump(&self.counters.cache_misses);
                debug!(ledger, batch_start = key, "batch cache miss");
            }
        }

        let decompressed = self.download(ledger, &url).await?;
        let batch = self.decoder.decode(ledger, &url, &decompressed)?;
        self.cache.put(key, &decompressed).await;
        Ok(batch)
    }

    /// Stop accepting downloads. In-flight downloads run to completion.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn metrics(&self) -> FetchMetrics {
        self.counters.snapshot()
    }

    /// Download and decompress, retrying transient transport failures and
    /// bodies that fail to decompress.
    async fn download(&self, ledger: u32, url: &str) -> Result<Vec<u8>, LakeError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let failure = match self.get_once(url).await {
                Ok(body) => {
                    Counters::bump(&self.counters.downloads);
                    debug!(ledger, url, attempt, bytes = body.len(), "batch downloaded");
                    match self.decoder.decompress(ledger, url, &body) {
                        Ok(decompressed) => return Ok(decompressed),
                        Err(e) => AttemptError::Corrupt(e),
                    }
                }
                Err(e) if e.is_not_found() => {
                    debug!(ledger, url, "batch not found");
                    return Err(LakeError::LedgerNotFound {
                        ledger,
                        url: url.to_string(),
                    });
                }
                Err(TransportError::Closed) => return Err(LakeError::Closed),
                Err(e) if e.is_retryable() => AttemptError::Transport(e),
                Err(e) => {
                    return Err(LakeError::DownloadFailed {
                        ledger,
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    })
                }
            };

            match self.retry.next_delay(attempt) {
                Some(delay) => {
                    Counters::bump(&self.counters.retries);
                    warn!(
                        ledger,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        url,
                        "retrying batch download"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(ledger, attempt, error = %failure, url, "max retries exceeded");
                    return Err(failure.into_error(ledger, url, attempt));
                }
            }
        }
    }

    /// One attempt, holding a download permit only while the request runs.
    async fn get_once(&self, url: &str) -> Result<Bytes, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::Closed)?;
        tokio::time::timeout(self.request_timeout, self.transport.get(url))
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
                ms: self.request_timeout.as_millis() as u64,
            })?
    }
}

/// Why a single download attempt is worth repeating.
enum AttemptError {
    Transport(TransportError),
    /// The body arrived but did not decompress.
    Corrupt(LakeError),
}

impl AttemptError {
    fn into_error(self, ledger: u32, url: &str, attempts: u32) -> LakeError {
        match self {
            Self::Transport(source) => LakeError::DownloadFailed {
                ledger,
                url: url.to_string(),
                attempts,
                source,
            },
            Self::Corrupt(e) => e,
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Corrupt(e) => write!(f, "{e}"),
        }
    }
}
