//! ledgerlake-core: batch acquisition, caching and query engine for
//! ledger data-lake archives.
//!
//! # Overview
//!
//! An archive stores ledger-close metadata as compressed, binary-encoded
//! batches under a deterministic, partitioned path layout. This crate
//! locates, downloads, decompresses, decodes, caches and filters them:
//!
//! ```text
//! LedgerLake ─▶ QueryEngine ─▶ BatchFetcher ─┬─ BatchCache hit ─▶ BatchDecoder
//!                                            └─ ArchiveTransport ─▶ BatchDecoder ─▶ BatchCache
//!                    ▲                  │
//!             RecordStream ◀── extract/filter
//! ```
//!
//! - [`LedgerLake`]: client facade
//! - [`SchemaResolver`]: fetch-once archive layout
//! - [`address`]: batch start and object path calculation
//! - [`BatchCache`] / [`LruBatchCache`]: decompressed batch cache
//! - [`BatchFetcher`]: bounded-concurrency download with linear retry
//! - [`BatchDecoder`]: decompression, decoding and range validation
//! - [`QueryEngine`]: streaming transaction, event and ledger queries
//! - [`ArchiveTransport`]: the object-fetch seam (see `ledgerlake-http`)

pub mod address;
pub mod cache;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetcher;
pub mod meta;
pub mod policy;
pub mod query;
pub mod records;
pub mod schema;
pub mod transport;

pub use cache::{BatchCache, LruBatchCache, NoCache};
pub use client::{LedgerLake, LedgerLakeBuilder};
pub use config::{ArchiveConfig, ArchiveConfigBuilder};
pub use decoder::BatchDecoder;
pub use error::{CodecError, ErrorKind, LakeError, Result, TransportError};
pub use fetcher::{BatchFetcher, FetchMetrics};
pub use query::{EventFilter, QueryEngine, RecordStream, TransactionFilter};
pub use records::{EventRecord, TransactionRecord};
pub use schema::{ArchiveSchema, SchemaResolver};
pub use transport::ArchiveTransport;
