//! Transaction envelopes, operations, results and per-transaction metadata.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::event::{ContractEvent, DiagnosticEvent, ScVal, TransactionEvent};
use super::{unknown_discriminant, Hash};

// ─── Envelopes ────────────────────────────────────────────────────────────────

/// A signed transaction as submitted to the network.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TransactionEnvelope {
    Tx(Transaction),
    FeeBump(FeeBumpTransaction),
}

impl TransactionEnvelope {
    /// The transaction whose operations are applied.
    pub fn inner(&self) -> &Transaction {
        match self {
            Self::Tx(tx) => tx,
            Self::FeeBump(fb) => &fb.inner_tx,
        }
    }

    /// Source account of the applied transaction (the inner one for fee bumps).
    pub fn source_account(&self) -> &str {
        &self.inner().source_account
    }

    /// Maximum fee the submitter agreed to pay.
    pub fn max_fee(&self) -> i64 {
        match self {
            Self::Tx(tx) => tx.fee as i64,
            Self::FeeBump(fb) => fb.fee,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.inner().operations
    }

    pub fn is_fee_bump(&self) -> bool {
        matches!(self, Self::FeeBump(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub source_account: String,
    pub fee: u32,
    pub seq_num: i64,
    pub memo: Option<String>,
    pub operations: Vec<Operation>,
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FeeBumpTransaction {
    pub fee_source: String,
    pub fee: i64,
    pub inner_tx: Transaction,
    pub signatures: Vec<Vec<u8>>,
}

// ─── Operations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Operation {
    /// Overrides the transaction source for this operation.
    pub source_account: Option<String>,
    pub body: OperationBody,
}

impl Operation {
    pub fn op_type(&self) -> OperationType {
        self.body.op_type()
    }

    /// Contract targeted by an `InvokeHostFunction` contract call.
    pub fn invoked_contract(&self) -> Option<&str> {
        match &self.body {
            OperationBody::InvokeHostFunction(HostFunction::InvokeContract { contract_id, .. }) => {
                Some(contract_id)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum HostFunction {
    InvokeContract {
        contract_id: String,
        function_name: String,
        args: Vec<ScVal>,
    },
    CreateContract {
        wasm_hash: Hash,
        salt: Hash,
    },
    UploadWasm {
        wasm: Vec<u8>,
    },
}

/// Operation payloads. Classic operations not modelled field-by-field are
/// carried as [`OperationBody::Other`] with their type.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum OperationBody {
    CreateAccount {
        destination: String,
        starting_balance: i64,
    },
    Payment {
        destination: String,
        asset: Asset,
        amount: i64,
    },
    ManageData {
        name: String,
        value: Option<Vec<u8>>,
    },
    InvokeHostFunction(HostFunction),
    ExtendFootprintTtl {
        extend_to: u32,
    },
    RestoreFootprint,
    Other(OperationType),
}

impl OperationBody {
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::CreateAccount { .. } => OperationType::CreateAccount,
            Self::Payment { .. } => OperationType::Payment,
            Self::ManageData { .. } => OperationType::ManageData,
            Self::InvokeHostFunction(_) => OperationType::InvokeHostFunction,
            Self::ExtendFootprintTtl { .. } => OperationType::ExtendFootprintTtl,
            Self::RestoreFootprint => OperationType::RestoreFootprint,
            Self::Other(t) => *t,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateAccount,
    Payment,
    PathPaymentStrictReceive,
    ManageSellOffer,
    CreatePassiveSellOffer,
    SetOptions,
    ChangeTrust,
    AllowTrust,
    AccountMerge,
    Inflation,
    ManageData,
    BumpSequence,
    ManageBuyOffer,
    PathPaymentStrictSend,
    CreateClaimableBalance,
    ClaimClaimableBalance,
    BeginSponsoringFutureReserves,
    EndSponsoringFutureReserves,
    RevokeSponsorship,
    Clawback,
    ClawbackClaimableBalance,
    SetTrustLineFlags,
    LiquidityPoolDeposit,
    LiquidityPoolWithdraw,
    InvokeHostFunction,
    ExtendFootprintTtl,
    RestoreFootprint,
}

impl OperationType {
    pub const ALL: [OperationType; 27] = [
        Self::CreateAccount,
        Self::Payment,
        Self::PathPaymentStrictReceive,
        Self::ManageSellOffer,
        Self::CreatePassiveSellOffer,
        Self::SetOptions,
        Self::ChangeTrust,
        Self::AllowTrust,
        Self::AccountMerge,
        Self::Inflation,
        Self::ManageData,
        Self::BumpSequence,
        Self::ManageBuyOffer,
        Self::PathPaymentStrictSend,
        Self::CreateClaimableBalance,
        Self::ClaimClaimableBalance,
        Self::BeginSponsoringFutureReserves,
        Self::EndSponsoringFutureReserves,
        Self::RevokeSponsorship,
        Self::Clawback,
        Self::ClawbackClaimableBalance,
        Self::SetTrustLineFlags,
        Self::LiquidityPoolDeposit,
        Self::LiquidityPoolWithdraw,
        Self::InvokeHostFunction,
        Self::ExtendFootprintTtl,
        Self::RestoreFootprint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateAccount => "create_account",
            Self::Payment => "payment",
            Self::PathPaymentStrictReceive => "path_payment_strict_receive",
            Self::ManageSellOffer => "manage_sell_offer",
            Self::CreatePassiveSellOffer => "create_passive_sell_offer",
            Self::SetOptions => "set_options",
            Self::ChangeTrust => "change_trust",
            Self::AllowTrust => "allow_trust",
            Self::AccountMerge => "account_merge",
            Self::Inflation => "inflation",
            Self::ManageData => "manage_data",
            Self::BumpSequence => "bump_sequence",
            Self::ManageBuyOffer => "manage_buy_offer",
            Self::PathPaymentStrictSend => "path_payment_strict_send",
            Self::CreateClaimableBalance => "create_claimable_balance",
            Self::ClaimClaimableBalance => "claim_claimable_balance",
            Self::BeginSponsoringFutureReserves => "begin_sponsoring_future_reserves",
            Self::EndSponsoringFutureReserves => "end_sponsoring_future_reserves",
            Self::RevokeSponsorship => "revoke_sponsorship",
            Self::Clawback => "clawback",
            Self::ClawbackClaimableBalance => "clawback_claimable_balance",
            Self::SetTrustLineFlags => "set_trust_line_flags",
            Self::LiquidityPoolDeposit => "liquidity_pool_deposit",
            Self::LiquidityPoolWithdraw => "liquidity_pool_withdraw",
            Self::InvokeHostFunction => "invoke_host_function",
            Self::ExtendFootprintTtl => "extend_footprint_ttl",
            Self::RestoreFootprint => "restore_footprint",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| format!("unknown operation type '{s}'"))
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TransactionResultCode {
    FeeBumpInnerSuccess,
    Success,
    Failed,
    TooEarly,
    TooLate,
    MissingOperation,
    BadSeq,
    BadAuth,
    InsufficientBalance,
    NoAccount,
    InsufficientFee,
    BadAuthExtra,
    InternalError,
    NotSupported,
    FeeBumpInnerFailed,
    BadSponsorship,
    BadMinSeqAgeOrGap,
    Malformed,
    SorobanInvalid,
}

impl TransactionResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::FeeBumpInnerSuccess)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionResult {
    pub fee_charged: i64,
    pub code: TransactionResultCode,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionResultPair {
    pub transaction_hash: Hash,
    pub result: TransactionResult,
}

/// Result plus application metadata of one transaction, in apply order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionResultMeta {
    pub result: TransactionResultPair,
    /// Opaque ledger-entry changes from fee processing.
    pub fee_processing: Vec<Vec<u8>>,
    pub tx_apply_processing: TransactionMeta,
}

// ─── Transaction meta ─────────────────────────────────────────────────────────

/// Per-transaction application metadata. The wire tag is the declaration
/// index (`V2` = 0, `V3` = 1, `V4` = 2).
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub enum TransactionMeta {
    /// Classic transactions; no events.
    V2(TransactionMetaV2),
    /// Soroban meta with one flat event list plus diagnostics.
    V3(TransactionMetaV3),
    /// Events split into transaction-level and per-operation lists.
    V4(TransactionMetaV4),
}

impl BorshDeserialize for TransactionMeta {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(Self::V2(TransactionMetaV2::deserialize_reader(reader)?)),
            1 => Ok(Self::V3(TransactionMetaV3::deserialize_reader(reader)?)),
            2 => Ok(Self::V4(TransactionMetaV4::deserialize_reader(reader)?)),
            tag => Err(unknown_discriminant("TransactionMeta", tag)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OperationMeta {
    pub changes: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionMetaV2 {
    pub tx_changes_before: Vec<Vec<u8>>,
    pub operations: Vec<OperationMeta>,
    pub tx_changes_after: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SorobanTransactionMeta {
    pub events: Vec<ContractEvent>,
    pub return_value: ScVal,
    pub diagnostic_events: Vec<DiagnosticEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionMetaV3 {
    pub tx_changes_before: Vec<Vec<u8>>,
    pub operations: Vec<OperationMeta>,
    pub tx_changes_after: Vec<Vec<u8>>,
    pub soroban_meta: Option<SorobanTransactionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OperationMetaV2 {
    pub changes: Vec<Vec<u8>>,
    pub events: Vec<ContractEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionMetaV4 {
    pub tx_changes_before: Vec<Vec<u8>>,
    pub operations: Vec<OperationMetaV2>,
    pub tx_changes_after: Vec<Vec<u8>>,
    pub return_value: Option<ScVal>,
    pub events: Vec<TransactionEvent>,
    pub diagnostic_events: Vec<DiagnosticEvent>,
}
