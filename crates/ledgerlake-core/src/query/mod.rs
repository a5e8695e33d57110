//! Streaming range queries.
//!
//! # Pipeline
//!
//! ```text
//! batch_heads(start..=end) ──▶ spawn(fetch) ×N, ordered (buffered N)
//!                                    │
//!                                    ▼
//!                    batch covers its slot? → ledgers in range → extract → filter
//!                                    │
//!                          mpsc::channel(N) ──▶ RecordStream
//! ```
//!
//! `N` is `max_concurrent_downloads`. The producer never runs more than `N`
//! batches ahead of the consumer. Dropping the stream stops new fetches;
//! fetches already spawned complete and their results are discarded.

pub mod extract;
pub mod filter;

use std::ops::RangeInclusive;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::address;
use crate::error::LakeError;
use crate::fetcher::BatchFetcher;
use crate::meta::LedgerCloseMeta;
use crate::records::{EventRecord, TransactionRecord};

pub use filter::{EventFilter, TransactionFilter};

/// Runs range queries against a shared [`BatchFetcher`].
#[derive(Clone)]
pub struct QueryEngine {
    fetcher: Arc<BatchFetcher>,
    prefetch: usize,
}

impl QueryEngine {
    /// `prefetch` bounds both in-flight batch fetches and buffered records.
    pub fn new(fetcher: Arc<BatchFetcher>, prefetch: usize) -> Self {
        Self {
            fetcher,
            prefetch: prefetch.max(1),
        }
    }

    /// Transactions in `range` passing `filter`, in ledger then apply order.
    pub async fn transactions(
        &self,
        range: RangeInclusive<u32>,
        filter: TransactionFilter,
    ) -> Result<RecordStream<TransactionRecord>, LakeError> {
        let codec = Arc::clone(self.fetcher.decoder().codec());
        self.run(range, move |meta| {
            extract::transactions(meta, &filter, codec.as_ref())
        })
        .await
    }

    /// Events in `range` passing `filter`.
    pub async fn events(
        &self,
        range: RangeInclusive<u32>,
        filter: EventFilter,
    ) -> Result<RecordStream<EventRecord>, LakeError> {
        self.run(range, move |meta| Ok(extract::events(meta, &filter)))
            .await
    }

    /// Raw metadata of every ledger in `range`.
    pub async fn ledgers(
        &self,
        range: RangeInclusive<u32>,
    ) -> Result<RecordStream<LedgerCloseMeta>, LakeError> {
        self.run(range, |meta| Ok(vec![meta.clone()])).await
    }

    async fn run<T, F>(
        &self,
        range: RangeInclusive<u32>,
        extract: F,
    ) -> Result<RecordStream<T>, LakeError>
    where
        T: Send + 'static,
        F: Fn(&LedgerCloseMeta) -> Result<Vec<T>, LakeError> + Send + 'static,
    {
        let (start, end) = (*range.start(), *range.end());
        if start > end {
            return Err(LakeError::InvalidRange { start, end });
        }
        if self.fetcher.is_closed() {
            return Err(LakeError::Closed);
        }
        let ledgers_per_batch = self.fetcher.schema().await?.ledgers_per_batch;

        let (tx, rx) = mpsc::channel(self.prefetch);
        let fetcher = Arc::clone(&self.fetcher);
        let prefetch = self.prefetch;
        debug!(start, end, prefetch, "range query started");

        tokio::spawn(async move {
            let mut batches = stream::iter(address::batch_heads(start, end, ledgers_per_batch))
                .map(move |ledger| {
                    let fetcher = Arc::clone(&fetcher);
                    let handle = tokio::spawn(async move { fetcher.fetch(ledger).await });
                    async move { (ledger, handle.await) }
                })
                .buffered(prefetch);

            loop {
                let (head, joined) = tokio::select! {
                    _ = tx.closed() => {
                        debug!(start, end, "range query abandoned by consumer");
                        return;
                    }
                    next = batches.next() => match next {
                        Some(joined) => joined,
                        None => break,
                    },
                };
                let batch = match joined {
                    Ok(Ok(batch)) => batch,
                    Ok(Err(e)) => {
                        warn!(start, end, error = %e, "range query failed");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                    Err(join) => {
                        let _ = tx.send(Err(LakeError::Internal(join.to_string()))).await;
                        return;
                    }
                };

                // the fetch only validated `head`; the batch must also reach
                // every later in-range ledger of its slot
                let upto = end.min(address::batch_end(head, ledgers_per_batch));
                if batch.end_sequence < upto {
                    let e = LakeError::RangeMismatch {
                        ledger: batch.end_sequence + 1,
                        start: batch.start_sequence,
                        end: batch.end_sequence,
                    };
                    warn!(start, end, error = %e, "range query failed");
                    let _ = tx.send(Err(e)).await;
                    return;
                }

                for meta in &batch.ledger_close_metas {
                    let seq = meta.ledger_sequence();
                    if seq < start || seq > end {
                        continue;
                    }
                    let records = match extract(meta) {
                        Ok(records) => records,
                        Err(e) => {
                            warn!(ledger = seq, error = %e, "extraction failed");
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    };
                    for record in records {
                        if tx.send(Ok(record)).await.is_err() {
                            debug!(ledger = seq, "range query abandoned by consumer");
                            return;
                        }
                    }
                }
            }
            debug!(start, end, "range query complete");
        });

        Ok(RecordStream { rx })
    }
}

/// Forward-only, single-pass result sequence of a range query.
///
/// Yields `Err` at most once, as its final item. Records yielded before an
/// error remain valid.
pub struct RecordStream<T> {
    rx: mpsc::Receiver<Result<T, LakeError>>,
}

impl<T> RecordStream<T> {
    pub async fn next_record(&mut self) -> Option<Result<T, LakeError>> {
        self.rx.recv().await
    }

    /// Drain the stream, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, LakeError> {
        let mut out = Vec::new();
        while let Some(item) = self.rx.recv().await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl<T> Stream for RecordStream<T> {
    type Item = Result<T, LakeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
