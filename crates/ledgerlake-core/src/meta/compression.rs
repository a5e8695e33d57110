//! Batch decompression.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Turns a downloaded object into the codec's input bytes.
pub trait Decompressor: Send + Sync {
    /// Algorithm name as it appears in the archive schema.
    fn algorithm(&self) -> &str;

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Release any held resources. Later calls to `decompress` fail.
    fn close(&self) {}
}

/// Zstandard frames, the archive default.
#[derive(Debug, Default)]
pub struct ZstdDecompressor {
    closed: AtomicBool,
}

impl ZstdDecompressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decompressor for ZstdDecompressor {
    fn algorithm(&self) -> &str {
        "zstd"
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::other("decompressor closed"));
        }
        zstd::decode_all(data)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Pass-through for archives published with `"compression": "none"`.
#[derive(Debug, Default)]
pub struct Uncompressed;

impl Decompressor for Uncompressed {
    fn algorithm(&self) -> &str {
        "none"
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Canonical spelling of a schema compression name.
pub fn canonical(name: &str) -> &str {
    match name {
        "zst" => "zstd",
        "" => "none",
        other => other,
    }
}
