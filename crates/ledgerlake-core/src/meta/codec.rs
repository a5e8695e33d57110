//! Binary codec for batch payloads.

use std::io;

use super::{
    LedgerCloseMetaBatch, TransactionEnvelope, TransactionMeta, TransactionResultPair,
    UnknownDiscriminant,
};
use crate::error::CodecError;

/// A value that can be re-encoded to wire bytes.
#[derive(Debug, Clone, Copy)]
pub enum WireValue<'a> {
    Batch(&'a LedgerCloseMetaBatch),
    Envelope(&'a TransactionEnvelope),
    Result(&'a TransactionResultPair),
    Meta(&'a TransactionMeta),
}

impl WireValue<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Batch(_) => "batch",
            Self::Envelope(_) => "transaction envelope",
            Self::Result(_) => "transaction result",
            Self::Meta(_) => "transaction meta",
        }
    }
}

/// Decodes decompressed batch bytes and encodes values back to wire form.
pub trait BatchCodec: Send + Sync {
    fn decode_batch(&self, bytes: &[u8]) -> Result<LedgerCloseMetaBatch, CodecError>;

    fn encode(&self, value: WireValue<'_>) -> Result<Vec<u8>, CodecError>;
}

/// Borsh encoding of the typed metadata model.
#[derive(Debug, Default, Clone, Copy)]
pub struct BorshBatchCodec;

impl BatchCodec for BorshBatchCodec {
    fn decode_batch(&self, bytes: &[u8]) -> Result<LedgerCloseMetaBatch, CodecError> {
        borsh::from_slice(bytes).map_err(classify)
    }

    fn encode(&self, value: WireValue<'_>) -> Result<Vec<u8>, CodecError> {
        let out = match value {
            WireValue::Batch(v) => borsh::to_vec(v),
            WireValue::Envelope(v) => borsh::to_vec(v),
            WireValue::Result(v) => borsh::to_vec(v),
            WireValue::Meta(v) => borsh::to_vec(v),
        };
        out.map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

fn classify(err: io::Error) -> CodecError {
    if let Some(unknown) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<UnknownDiscriminant>())
    {
        return CodecError::UnsupportedVersion {
            type_name: unknown.type_name,
            discriminant: unknown.discriminant as u32,
        };
    }
    CodecError::Malformed(err.to_string())
}
