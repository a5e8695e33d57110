//! Contract events and the scalar values they carry.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// A scalar contract value, as used in event topics and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScVal {
    Void,
    Bool(bool),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    Symbol(String),
    String(String),
    Bytes(#[serde(with = "hex::serde")] Vec<u8>),
    Address(String),
}

impl fmt::Display for ScVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool(v) => write!(f, "bool:{v}"),
            Self::U32(v) => write!(f, "u32:{v}"),
            Self::I32(v) => write!(f, "i32:{v}"),
            Self::U64(v) => write!(f, "u64:{v}"),
            Self::I64(v) => write!(f, "i64:{v}"),
            Self::U128(v) => write!(f, "u128:{v}"),
            Self::I128(v) => write!(f, "i128:{v}"),
            Self::Symbol(v) => write!(f, "sym:{v}"),
            Self::String(v) => write!(f, "str:{v}"),
            Self::Bytes(v) => write!(f, "bytes:{}", hex::encode(v)),
            Self::Address(v) => write!(f, "addr:{v}"),
        }
    }
}

/// Parses the `prefix:value` form produced by `Display`.
impl FromStr for ScVal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "void" {
            return Ok(Self::Void);
        }
        let (prefix, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <type>:<value>, got '{s}'"))?;
        let bad = |e: &dyn fmt::Display| format!("invalid {prefix} value '{value}': {e}");
        Ok(match prefix {
            "bool" => Self::Bool(value.parse().map_err(|e| bad(&e))?),
            "u32" => Self::U32(value.parse().map_err(|e| bad(&e))?),
            "i32" => Self::I32(value.parse().map_err(|e| bad(&e))?),
            "u64" => Self::U64(value.parse().map_err(|e| bad(&e))?),
            "i64" => Self::I64(value.parse().map_err(|e| bad(&e))?),
            "u128" => Self::U128(value.parse().map_err(|e| bad(&e))?),
            "i128" => Self::I128(value.parse().map_err(|e| bad(&e))?),
            "sym" | "symbol" => Self::Symbol(value.to_string()),
            "str" | "string" => Self::String(value.to_string()),
            "addr" | "address" => Self::Address(value.to_string()),
            "bytes" => Self::Bytes(hex::decode(value).map_err(|e| bad(&e))?),
            other => return Err(format!("unknown value type '{other}'")),
        })
    }
}

/// Kind of a contract event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractEventType {
    System,
    Contract,
    Diagnostic,
}

impl fmt::Display for ContractEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Contract => write!(f, "contract"),
            Self::Diagnostic => write!(f, "diagnostic"),
        }
    }
}

impl FromStr for ContractEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "contract" => Ok(Self::Contract),
            "diagnostic" => Ok(Self::Diagnostic),
            other => Err(format!("unknown event kind '{other}'")),
        }
    }
}

/// An event emitted during contract execution.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ContractEvent {
    /// `None` for system events not tied to a contract.
    pub contract_id: Option<String>,
    pub kind: ContractEventType,
    pub topics: Vec<ScVal>,
    pub data: ScVal,
}

/// An event from the diagnostic collection.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DiagnosticEvent {
    pub in_successful_contract_call: bool,
    pub event: ContractEvent,
}

/// When a transaction-level event was emitted relative to transaction application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TransactionEventStage {
    BeforeAllTxs,
    AfterTx,
    AfterAllTxs,
}

/// A transaction-level (not operation-level) event, e.g. fee charges.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionEvent {
    pub stage: TransactionEventStage,
    pub event: ContractEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scval_parse_display() {
        let cases = [
            ("sym:transfer", ScVal::Symbol("transfer".into())),
            ("u32:7", ScVal::U32(7)),
            ("i128:-5", ScVal::I128(-5)),
            ("bytes:deadbeef", ScVal::Bytes(vec![0xde, 0xad, 0xbe, 0xef])),
            ("void", ScVal::Void),
        ];
        for (s, v) in cases {
            assert_eq!(s.parse::<ScVal>().unwrap(), v);
            assert_eq!(v.to_string(), s);
        }
        assert_eq!(
            "addr:GABC".parse::<ScVal>().unwrap(),
            ScVal::Address("GABC".into())
        );
    }

    #[test]
    fn scval_parse_errors() {
        assert!("transfer".parse::<ScVal>().is_err());
        assert!("u32:-1".parse::<ScVal>().is_err());
        assert!("map:x".parse::<ScVal>().is_err());
    }

    #[test]
    fn event_kind_parse() {
        assert_eq!("Contract".parse::<ContractEventType>().unwrap(), ContractEventType::Contract);
        assert!("other".parse::<ContractEventType>().is_err());
    }
}
