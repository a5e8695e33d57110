//! Decompression, decoding and range validation of batch payloads.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CodecError, LakeError};
use crate::meta::compression;
use crate::meta::{BatchCodec, Decompressor, LedgerCloseMetaBatch};

/// Turns downloaded bytes into a validated [`LedgerCloseMetaBatch`].
pub struct BatchDecoder {
    decompressor: Arc<dyn Decompressor>,
    codec: Arc<dyn BatchCodec>,
}

impl BatchDecoder {
    pub fn new(decompressor: Arc<dyn Decompressor>, codec: Arc<dyn BatchCodec>) -> Self {
        Self {
            decompressor,
            codec,
        }
    }

    pub fn codec(&self) -> &Arc<dyn BatchCodec> {
        &self.codec
    }

    pub fn decompressor(&self) -> &Arc<dyn Decompressor> {
        &self.decompressor
    }

    /// Returns `true` if objects published with `compression` can be read.
    pub fn accepts(&self, compression: &str) -> bool {
        compression::canonical(compression) == compression::canonical(self.decompressor.algorithm())
    }

    /// Decompress a downloaded object.
    pub fn decompress(&self, ledger: u32, url: &str, compressed: &[u8]) -> Result<Vec<u8>, LakeError> {
        let out = self
            .decompressor
            .decompress(compressed)
            .map_err(|e| LakeError::Decompression {
                ledger,
                url: url.to_string(),
                compressed_size: compressed.len(),
                source: e,
            })?;
        debug!(
            ledger,
            compressed = compressed.len(),
            decompressed = out.len(),
            "batch decompressed"
        );
        Ok(out)
    }

    /// Decode decompressed bytes and check the batch covers `ledger`.
    pub fn decode(&self, ledger: u32, url: &str, decompressed: &[u8]) -> Result<LedgerCloseMetaBatch, LakeError> {
        let batch = self.codec.decode_batch(decompressed).map_err(|e| match e {
            e @ CodecError::UnsupportedVersion { .. } => LakeError::UnsupportedFormat {
                ledger,
                url: url.to_string(),
                decompressed_size: decompressed.len(),
                source: e,
            },
            e @ CodecError::Malformed(_) => LakeError::MalformedBatch {
                ledger,
                url: url.to_string(),
                decompressed_size: decompressed.len(),
                source: e,
            },
        })?;
        validate_range(&batch, ledger)?;
        Ok(batch)
    }
}

/// Fails unless `start_sequence <= ledger <= end_sequence`.
pub fn validate_range(batch: &LedgerCloseMetaBatch, ledger: u32) -> Result<(), LakeError> {
    if batch.covers(ledger) {
        Ok(())
    } else {
        Err(LakeError::RangeMismatch {
            ledger,
            start: batch.start_sequence,
            end: batch.end_sequence,
        })
    }
}
