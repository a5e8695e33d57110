//! Caller-supplied query filters.

use serde::{Deserialize, Serialize};

use crate::meta::{ContractEvent, ContractEventType, OperationType, ScVal, TransactionEnvelope};

// ─── TransactionFilter ────────────────────────────────────────────────────────

/// Which transactions a query returns. The default matches every successful
/// transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub source_account: Option<String>,
    /// Match transactions with at least one invocation of this contract.
    pub contract_id: Option<String>,
    /// Match transactions containing any of these operation types (empty = all).
    pub operation_types: Vec<OperationType>,
    pub include_failed: bool,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_account(mut self, account: impl Into<String>) -> Self {
        self.source_account = Some(account.into());
        self
    }

    pub fn contract_id(mut self, id: impl Into<String>) -> Self {
        self.contract_id = Some(id.into());
        self
    }

    pub fn operation_type(mut self, t: OperationType) -> Self {
        self.operation_types.push(t);
        self
    }

    pub fn include_failed(mut self, include: bool) -> Self {
        self.include_failed = include;
        self
    }

    /// Returns `true` if the transaction passes every configured predicate.
    pub fn matches(&self, envelope: &TransactionEnvelope, successful: bool) -> bool {
        if !successful && !self.include_failed {
            return false;
        }
        if let Some(source) = &self.source_account {
            if envelope.source_account() != source {
                return false;
            }
        }
        let ops = envelope.operations();
        if let Some(contract) = &self.contract_id {
            if !ops.iter().any(|op| op.invoked_contract() == Some(contract.as_str())) {
                return false;
            }
        }
        self.operation_types.is_empty()
            || ops.iter().any(|op| self.operation_types.contains(&op.op_type()))
    }
}

// ─── EventFilter ──────────────────────────────────────────────────────────────

/// Which events a query returns. The default matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Exact contract ids (empty = all).
    pub contract_ids: Vec<String>,
    /// Event kinds (empty = all).
    pub kinds: Vec<ContractEventType>,
    /// Match if any of these equals any event topic (empty = all).
    pub topics: Vec<ScVal>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract_id(mut self, id: impl Into<String>) -> Self {
        self.contract_ids.push(id.into());
        self
    }

    pub fn kind(mut self, kind: ContractEventType) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn topic(mut self, topic: ScVal) -> Self {
        self.topics.push(topic);
        self
    }

    /// Whether the diagnostic collection needs scanning at all.
    pub fn scans_diagnostics(&self) -> bool {
        self.wants_kind(ContractEventType::Diagnostic)
    }

    pub fn wants_kind(&self, kind: ContractEventType) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn matches(&self, event: &ContractEvent) -> bool {
        if !self.wants_kind(event.kind) {
            return false;
        }
        if !self.contract_ids.is_empty() {
            let id = event.contract_id.as_deref().unwrap_or("");
            if !self.contract_ids.iter().any(|c| c == id) {
                return false;
            }
        }
        self.topics.is_empty() || event.topics.iter().any(|t| self.topics.contains(t))
    }
}
