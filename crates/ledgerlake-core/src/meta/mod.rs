//! Typed ledger-close metadata as stored in archive batches.
//!
//! # Layout
//!
//! ```text
//! LedgerCloseMetaBatch [start, end]
//!   └── LedgerCloseMeta (one per ledger)
//!         ├── V0: TransactionSet (flat)              + tx_processing
//!         ├── V1: GeneralizedTransactionSet (phases) + tx_processing
//!         └── V2: GeneralizedTransactionSet (phases) + tx_processing
//! ```
//!
//! Versioned unions (`LedgerCloseMeta`, `TransactionPhase`,
//! `TransactionMeta`) reject unknown tags with a dedicated error so the
//! codec can report "reader too old" distinctly from corruption.

pub mod codec;
pub mod compression;
pub mod event;
pub mod transaction;

use std::io::{self, Read};

use borsh::{BorshDeserialize, BorshSerialize};

pub use codec::{BatchCodec, BorshBatchCodec, WireValue};
pub use compression::{Decompressor, Uncompressed, ZstdDecompressor};
pub use event::{
    ContractEvent, ContractEventType, DiagnosticEvent, ScVal, TransactionEvent,
    TransactionEventStage,
};
pub use transaction::{
    Asset, FeeBumpTransaction, HostFunction, Operation, OperationBody, OperationMeta,
    OperationMetaV2, OperationType, SorobanTransactionMeta, Transaction, TransactionEnvelope,
    TransactionMeta, TransactionMetaV2, TransactionMetaV3, TransactionMetaV4, TransactionResult,
    TransactionResultCode, TransactionResultMeta, TransactionResultPair,
};

/// 32-byte hash.
pub type Hash = [u8; 32];

// ─── Unknown discriminants ────────────────────────────────────────────────────

/// Carried inside the `io::Error` of a failed decode so the codec can tell
/// an unknown version tag apart from corrupt bytes.
#[derive(Debug)]
pub(crate) struct UnknownDiscriminant {
    pub type_name: &'static str,
    pub discriminant: u8,
}

impl std::fmt::Display for UnknownDiscriminant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} discriminant {}", self.type_name, self.discriminant)
    }
}

impl std::error::Error for UnknownDiscriminant {}

pub(crate) fn unknown_discriminant(type_name: &'static str, discriminant: u8) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        UnknownDiscriminant {
            type_name,
            discriminant,
        },
    )
}

// ─── Batch ────────────────────────────────────────────────────────────────────

/// One archive object: metadata for the inclusive range `[start_sequence, end_sequence]`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerCloseMetaBatch {
    pub start_sequence: u32,
    pub end_sequence: u32,
    pub ledger_close_metas: Vec<LedgerCloseMeta>,
}

impl LedgerCloseMetaBatch {
    /// Returns `true` if `ledger` lies within this batch's declared range.
    pub fn covers(&self, ledger: u32) -> bool {
        self.start_sequence <= ledger && ledger <= self.end_sequence
    }

    /// Metadata for `ledger`, if present.
    pub fn ledger(&self, ledger: u32) -> Option<&LedgerCloseMeta> {
        self.ledger_close_metas
            .iter()
            .find(|m| m.ledger_sequence() == ledger)
    }
}

// ─── Ledger close meta ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerHeader {
    pub ledger_seq: u32,
    /// Unix seconds.
    pub close_time: u64,
    pub protocol_version: u32,
    pub previous_ledger_hash: Hash,
    pub hash: Hash,
}

/// Per-ledger metadata. The wire tag is the declaration index.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub enum LedgerCloseMeta {
    V0(LedgerCloseMetaV0),
    V1(LedgerCloseMetaV1),
    V2(LedgerCloseMetaV2),
}

impl BorshDeserialize for LedgerCloseMeta {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(Self::V0(LedgerCloseMetaV0::deserialize_reader(reader)?)),
            1 => Ok(Self::V1(LedgerCloseMetaV1::deserialize_reader(reader)?)),
            2 => Ok(Self::V2(LedgerCloseMetaV2::deserialize_reader(reader)?)),
            tag => Err(unknown_discriminant("LedgerCloseMeta", tag)),
        }
    }
}

impl LedgerCloseMeta {
    pub fn header(&self) -> &LedgerHeader {
        match self {
            Self::V0(m) => &m.header,
            Self::V1(m) => &m.header,
            Self::V2(m) => &m.header,
        }
    }

    pub fn ledger_sequence(&self) -> u32 {
        self.header().ledger_seq
    }

    pub fn close_time(&self) -> u64 {
        self.header().close_time
    }

    /// Wire version (0, 1 or 2).
    pub fn version(&self) -> u8 {
        match self {
            Self::V0(_) => 0,
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }

    /// Results and apply metadata, in application order.
    pub fn tx_processing(&self) -> &[TransactionResultMeta] {
        match self {
            Self::V0(m) => &m.tx_processing,
            Self::V1(m) => &m.tx_processing,
            Self::V2(m) => &m.tx_processing,
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.tx_processing().len()
    }
}

/// Legacy encoding: flat transaction set.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerCloseMetaV0 {
    pub header: LedgerHeader,
    pub tx_set: TransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerCloseMetaV1 {
    pub header: LedgerHeader,
    pub tx_set: GeneralizedTransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
    pub total_byte_size_of_bucket_list: u64,
    pub evicted_temporary_ledger_keys: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LedgerCloseMetaV2 {
    pub header: LedgerHeader,
    pub tx_set: GeneralizedTransactionSet,
    pub tx_processing: Vec<TransactionResultMeta>,
    pub total_byte_size_of_live_soroban_state: u64,
    pub evicted_keys: Vec<Vec<u8>>,
}

// ─── Transaction sets ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionSet {
    pub previous_ledger_hash: Hash,
    pub txs: Vec<TransactionEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GeneralizedTransactionSet {
    pub previous_ledger_hash: Hash,
    pub phases: Vec<TransactionPhase>,
}

/// A phase of a generalized set. The wire tag is the declaration index.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub enum TransactionPhase {
    /// Flat list of components.
    V0(Vec<TxSetComponent>),
    /// Parallel execution stages.
    V1(ParallelTxsComponent),
}

impl BorshDeserialize for TransactionPhase {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(Self::V0(Vec::<TxSetComponent>::deserialize_reader(reader)?)),
            1 => Ok(Self::V1(ParallelTxsComponent::deserialize_reader(reader)?)),
            tag => Err(unknown_discriminant("TransactionPhase", tag)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxSetComponent {
    /// Discounted base fee, if any.
    pub base_fee: Option<i64>,
    pub txs: Vec<TransactionEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ParallelTxsComponent {
    pub base_fee: Option<i64>,
    pub execution_stages: Vec<ParallelTxExecutionStage>,
}

/// Clusters inside a stage may run in parallel; each cluster is sequential.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ParallelTxExecutionStage {
    pub clusters: Vec<DependentTxCluster>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DependentTxCluster {
    pub txs: Vec<TransactionEnvelope>,
}
