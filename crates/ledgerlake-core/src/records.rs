//! Records produced by queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::{ContractEventType, ScVal};

// ─── TransactionRecord ────────────────────────────────────────────────────────

/// One applied transaction. Identity is by `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash, lowercase hex.
    pub hash: String,
    pub ledger_sequence: u32,
    /// Ledger close time, unix seconds.
    pub ledger_close_time: u64,
    /// Source of the applied transaction (the inner one for fee bumps).
    pub source_account: String,
    pub fee_charged: i64,
    pub max_fee: i64,
    pub operation_count: u32,
    pub successful: bool,
    /// 1-based position within the ledger's apply order.
    pub application_order: u32,
    pub fee_bump: bool,
    #[serde(with = "hex::serde")]
    pub envelope: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub result: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub result_meta: Vec<u8>,
}

impl TransactionRecord {
    /// Ledger close time as a UTC timestamp.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.ledger_close_time)
    }
}

// ─── EventRecord ──────────────────────────────────────────────────────────────

/// One contract, system or diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub ledger_sequence: u32,
    pub ledger_close_time: u64,
    pub transaction_hash: String,
    /// Empty for system events with no associated contract.
    pub contract_id: String,
    pub kind: ContractEventType,
    pub topics: Vec<ScVal>,
    pub value: ScVal,
    /// Emitting operation, when the metadata attributes events per operation.
    pub operation_index: Option<u32>,
    pub in_successful_contract_call: bool,
    pub transaction_successful: bool,
}

impl EventRecord {
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.ledger_close_time)
    }

    /// Returns `true` for system events not tied to a contract.
    pub fn is_system(&self) -> bool {
        self.contract_id.is_empty()
    }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
}
