//! Shared fixtures: an instrumented in-memory archive and batch builders.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use ledgerlake_core::address;
use ledgerlake_core::meta::{
    Asset, BatchCodec, BorshBatchCodec, ContractEvent, ContractEventType, GeneralizedTransactionSet,
    HostFunction, LedgerCloseMeta, LedgerCloseMetaBatch, LedgerCloseMetaV1, LedgerHeader,
    Operation, OperationBody, ScVal, SorobanTransactionMeta, Transaction, TransactionEnvelope,
    TransactionMeta, TransactionMetaV2, TransactionMetaV3, TransactionPhase, TransactionResult,
    TransactionResultCode, TransactionResultMeta, TransactionResultPair, TxSetComponent,
    WireValue,
};
use ledgerlake_core::{ArchiveConfig, ArchiveSchema, ArchiveTransport, TransportError};

pub const BASE: &str = "https://lake.test/ledgers/";

pub fn schema_url() -> String {
    format!("{BASE}.config.json")
}

// ─── MockTransport ────────────────────────────────────────────────────────────

/// In-memory archive with scripted failures and request instrumentation.
#[derive(Default)]
pub struct MockTransport {
    objects: Mutex<HashMap<String, Bytes>>,
    scripted: Mutex<HashMap<String, VecDeque<Result<Bytes, TransportError>>>>,
    requests: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `get` sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(url.into(), body.into());
    }

    /// Queue a failure returned (once) by the next `get` of `url`.
    pub fn fail_next(&self, url: &str, err: TransportError) {
        self.script(url, Err(err));
    }

    /// Queue a body returned (once) by the next `get` of `url`, ahead of
    /// the stored object.
    pub fn respond_next(&self, url: &str, body: impl Into<Bytes>) {
        self.script(url, Ok(body.into()));
    }

    fn script(&self, url: &str, outcome: Result<Bytes, TransportError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn requests(&self, url: &str) -> usize {
        self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Requests for batch objects (everything but the schema resource).
    pub fn batch_requests(&self) -> usize {
        let schema = schema_url();
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| **url != schema)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArchiveTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        *self
            .requests
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = scripted {
            return outcome;
        }
        self.objects
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                url: url.to_string(),
            })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn unavailable(url: &str) -> TransportError {
    TransportError::Status {
        url: url.to_string(),
        status: 503,
    }
}

// ─── Archive setup ────────────────────────────────────────────────────────────

pub fn schema(ledgers_per_batch: u32, batches_per_partition: u32) -> ArchiveSchema {
    ArchiveSchema {
        network_passphrase: "Test SDF Network ; September 2015".into(),
        version: "1.0".into(),
        compression: "zstd".into(),
        ledgers_per_batch,
        batches_per_partition,
    }
}

/// Transport serving only the schema resource.
pub fn archive(schema: &ArchiveSchema) -> Arc<MockTransport> {
    archive_with(MockTransport::new(), schema)
}

pub fn archive_with(transport: MockTransport, schema: &ArchiveSchema) -> Arc<MockTransport> {
    transport.insert(schema_url(), serde_json::to_vec(schema).unwrap());
    Arc::new(transport)
}

pub fn config(max_concurrent_downloads: usize) -> ArchiveConfig {
    ArchiveConfig::builder(BASE)
        .max_retries(2)
        .max_concurrent_downloads(max_concurrent_downloads)
        .retry_backoff(Duration::from_millis(1))
        .build()
        .unwrap()
}

/// Compress and store decompressed batch bytes at the object covering `ledger`.
pub fn put_raw(transport: &MockTransport, schema: &ArchiveSchema, ledger: u32, raw: &[u8]) {
    let packed = zstd::encode_all(raw, 3).unwrap();
    transport.insert(address::locate(BASE, schema, ledger), packed);
}

pub fn encode_batch(batch: &LedgerCloseMetaBatch) -> Vec<u8> {
    BorshBatchCodec.encode(WireValue::Batch(batch)).unwrap()
}

/// Group ledgers into their batches and publish every batch.
pub fn publish(transport: &MockTransport, schema: &ArchiveSchema, ledgers: Vec<LedgerCloseMeta>) {
    let lpb = schema.ledgers_per_batch;
    let mut batches: BTreeMap<u32, Vec<LedgerCloseMeta>> = BTreeMap::new();
    for meta in ledgers {
        batches
            .entry(address::batch_start(meta.ledger_sequence(), lpb))
            .or_default()
            .push(meta);
    }
    for (start, metas) in batches {
        let batch = LedgerCloseMetaBatch {
            start_sequence: start,
            end_sequence: address::batch_end(start, lpb),
            ledger_close_metas: metas,
        };
        put_raw(transport, schema, start, &encode_batch(&batch));
    }
}

// ─── Ledger builders ──────────────────────────────────────────────────────────

pub fn header(seq: u32) -> LedgerHeader {
    LedgerHeader {
        ledger_seq: seq,
        close_time: 1_700_000_000 + seq as u64 * 5,
        protocol_version: 21,
        previous_ledger_hash: [0; 32],
        hash: [seq as u8; 32],
    }
}

/// A generalized-set ledger with the given (envelope, result) pairs.
pub fn ledger(seq: u32, txs: Vec<(TransactionEnvelope, TransactionResultMeta)>) -> LedgerCloseMeta {
    let (envelopes, results): (Vec<_>, Vec<_>) = txs.into_iter().unzip();
    LedgerCloseMeta::V1(LedgerCloseMetaV1 {
        header: header(seq),
        tx_set: GeneralizedTransactionSet {
            previous_ledger_hash: [0; 32],
            phases: vec![TransactionPhase::V0(vec![TxSetComponent {
                base_fee: None,
                txs: envelopes,
            }])],
        },
        tx_processing: results,
        total_byte_size_of_bucket_list: 0,
        evicted_temporary_ledger_keys: vec![],
    })
}

pub fn envelope(source: &str, body: OperationBody) -> TransactionEnvelope {
    TransactionEnvelope::Tx(Transaction {
        source_account: source.into(),
        fee: 100,
        seq_num: 1,
        memo: None,
        operations: vec![Operation {
            source_account: None,
            body,
        }],
        signatures: vec![vec![0xAB; 64]],
    })
}

pub fn invoke(contract: &str) -> OperationBody {
    OperationBody::InvokeHostFunction(HostFunction::InvokeContract {
        contract_id: contract.into(),
        function_name: "transfer".into(),
        args: vec![],
    })
}

pub fn result(hash_tag: u8, successful: bool, meta: TransactionMeta) -> TransactionResultMeta {
    TransactionResultMeta {
        result: TransactionResultPair {
            transaction_hash: [hash_tag; 32],
            result: TransactionResult {
                fee_charged: 100,
                code: if successful {
                    TransactionResultCode::Success
                } else {
                    TransactionResultCode::Failed
                },
            },
        },
        fee_processing: vec![],
        tx_apply_processing: meta,
    }
}

pub fn classic_meta() -> TransactionMeta {
    TransactionMeta::V2(TransactionMetaV2::default())
}

pub fn soroban_meta(events: Vec<ContractEvent>) -> TransactionMeta {
    TransactionMeta::V3(TransactionMetaV3 {
        soroban_meta: Some(SorobanTransactionMeta {
            events,
            return_value: ScVal::Void,
            diagnostic_events: vec![],
        }),
        ..Default::default()
    })
}

pub fn contract_event(contract: &str, topic: &str) -> ContractEvent {
    ContractEvent {
        contract_id: Some(contract.into()),
        kind: ContractEventType::Contract,
        topics: vec![ScVal::Symbol(topic.into())],
        data: ScVal::I128(1_000),
    }
}

/// A ledger holding one successful classic payment from `source`.
pub fn payment_ledger(seq: u32, source: &str) -> LedgerCloseMeta {
    ledger(
        seq,
        vec![(
            envelope(
                source,
                OperationBody::Payment {
                    destination: "GDEST".into(),
                    asset: Asset::Native,
                    amount: 10_000_000,
                },
            ),
            result(seq as u8, true, classic_meta()),
        )],
    )
}
