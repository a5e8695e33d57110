//! `LedgerLake`: the client facade tying every component together.
//!
//! # Example
//!
//! ```rust,ignore
//! use ledgerlake_core::{ArchiveConfig, LedgerLake, TransactionFilter};
//! use futures::StreamExt;
//!
//! let config = ArchiveConfig::builder("https://lake.example.org/ledgers/pubnet/")
//!     .max_concurrent_downloads(8)
//!     .build()?;
//! let lake = LedgerLake::builder(config, transport).build()?;
//!
//! let mut txs = lake
//!     .transactions(59_906_272..=59_906_300, TransactionFilter::new().source_account("GA…"))
//!     .await?;
//! while let Some(tx) = txs.next().await {
//!     println!("{}", tx?.hash);
//! }
//! lake.close();
//! ```

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{BatchCache, LruBatchCache};
use crate::config::ArchiveConfig;
use crate::decoder::BatchDecoder;
use crate::error::LakeError;
use crate::fetcher::{BatchFetcher, FetchMetrics};
use crate::meta::{
    BatchCodec, BorshBatchCodec, Decompressor, LedgerCloseMeta, LedgerCloseMetaBatch,
    ZstdDecompressor,
};
use crate::query::{EventFilter, QueryEngine, RecordStream, TransactionFilter};
use crate::records::{EventRecord, TransactionRecord};
use crate::schema::{ArchiveSchema, SchemaResolver};
use crate::transport::ArchiveTransport;

/// Builder for [`LedgerLake`]. Every collaborator except the transport has a
/// default: an LRU cache sized by the config, zstd and the borsh codec.
pub struct LedgerLakeBuilder {
    config: ArchiveConfig,
    transport: Arc<dyn ArchiveTransport>,
    cache: Option<Arc<dyn BatchCache>>,
    decompressor: Option<Arc<dyn Decompressor>>,
    codec: Option<Arc<dyn BatchCodec>>,
}

impl LedgerLakeBuilder {
    /// Replace the default in-memory LRU cache.
    pub fn cache(mut self, cache: Arc<dyn BatchCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the default zstd decompressor.
    pub fn decompressor(mut self, decompressor: Arc<dyn Decompressor>) -> Self {
        self.decompressor = Some(decompressor);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn BatchCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Result<LedgerLake, LakeError> {
        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(LruBatchCache::new(self.config.cache_capacity())?),
        };
        let decompressor = self
            .decompressor
            .unwrap_or_else(|| Arc::new(ZstdDecompressor::new()));
        let codec = self.codec.unwrap_or_else(|| Arc::new(BorshBatchCodec));

        let resolver = Arc::new(SchemaResolver::new(
            Arc::clone(&self.transport),
            self.config.schema_url(),
            self.config.request_timeout(),
        ));
        let decoder = Arc::new(BatchDecoder::new(Arc::clone(&decompressor), codec));
        let fetcher = Arc::new(BatchFetcher::new(
            &self.config,
            Arc::clone(&self.transport),
            resolver,
            cache,
            decoder,
        ));
        let engine = QueryEngine::new(
            Arc::clone(&fetcher),
            self.config.max_concurrent_downloads(),
        );

        info!(
            base_url = self.config.base_url(),
            max_concurrent_downloads = self.config.max_concurrent_downloads(),
            cache_capacity = self.config.cache_capacity(),
            "ledger lake client created"
        );

        Ok(LedgerLake {
            config: self.config,
            transport: self.transport,
            decompressor,
            fetcher,
            engine,
            closed: AtomicBool::new(false),
        })
    }
}

/// Read-only client for one archive.
///
/// Cheap to share behind an `Arc`; every call draws downloads from the same
/// concurrency budget and cache.
pub struct LedgerLake {
    config: ArchiveConfig,
    transport: Arc<dyn ArchiveTransport>,
    decompressor: Arc<dyn Decompressor>,
    fetcher: Arc<BatchFetcher>,
    engine: QueryEngine,
    closed: AtomicBool,
}

impl LedgerLake {
    pub fn builder(config: ArchiveConfig, transport: Arc<dyn ArchiveTransport>) -> LedgerLakeBuilder {
        LedgerLakeBuilder {
            config,
            transport,
            cache: None,
            decompressor: None,
            codec: None,
        }
    }

    /// Client with default collaborators.
    pub fn new(config: ArchiveConfig, transport: Arc<dyn ArchiveTransport>) -> Result<Self, LakeError> {
        Self::builder(config, transport).build()
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archive layout, fetched on first use.
    pub async fn schema(&self) -> Result<&ArchiveSchema, LakeError> {
        self.ensure_open()?;
        self.fetcher.schema().await
    }

    /// URL of the batch object covering `ledger`.
    pub async fn batch_url(&self, ledger: u32) -> Result<String, LakeError> {
        self.ensure_open()?;
        Ok(self.fetcher.locate(ledger).await?.1)
    }

    /// Decoded batch covering `ledger`.
    pub async fn get_batch(&self, ledger: u32) -> Result<LedgerCloseMetaBatch, LakeError> {
        self.ensure_open()?;
        self.fetcher.fetch(ledger).await
    }

    /// Metadata of a single ledger.
    pub async fn get_ledger(&self, ledger: u32) -> Result<LedgerCloseMeta, LakeError> {
        let batch = self.get_batch(ledger).await?;
        match batch.ledger(ledger) {
            Some(meta) => Ok(meta.clone()),
            None => Err(LakeError::MissingLedger {
                ledger,
                start: batch.start_sequence,
                end: batch.end_sequence,
            }),
        }
    }

    pub async fn ledgers(
        &self,
        range: RangeInclusive<u32>,
    ) -> Result<RecordStream<LedgerCloseMeta>, LakeError> {
        self.ensure_open()?;
        self.engine.ledgers(range).await
    }

    pub async fn transactions(
        &self,
        range: RangeInclusive<u32>,
        filter: TransactionFilter,
    ) -> Result<RecordStream<TransactionRecord>, LakeError> {
        self.ensure_open()?;
        self.engine.transactions(range, filter).await
    }

    pub async fn events(
        &self,
        range: RangeInclusive<u32>,
        filter: EventFilter,
    ) -> Result<RecordStream<EventRecord>, LakeError> {
        self.ensure_open()?;
        self.engine.events(range, filter).await
    }

    pub fn metrics(&self) -> FetchMetrics {
        self.fetcher.metrics()
    }

    /// Release the decompressor and transport. Idempotent; later calls on
    /// this client fail with [`LakeError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.fetcher.close();
        self.decompressor.close();
        self.transport.close();
        debug!(base_url = self.config.base_url(), "ledger lake client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), LakeError> {
        if self.is_closed() {
            Err(LakeError::Closed)
        } else {
            Ok(())
        }
    }
}
