//! Batch addressing: ledger sequence → cache key and object location.
//!
//! Objects follow the archive's partition naming convention:
//!
//! ```text
//! {base_url}FC6DEFFF--59904000-59967999/FC6DE71F--59906272.xdr.zst
//!           └─ partition (u32::MAX - start, hex) ─┘└─ batch ───────────┘
//! ```
//!
//! Prefixes are `u32::MAX - start` so that a lexical listing returns the
//! newest data first. The partition directory is omitted when a partition
//! holds a single batch, and the batch end is omitted when a batch holds a
//! single ledger.

use crate::schema::ArchiveSchema;

/// First ledger of the batch containing `ledger`.
pub fn batch_start(ledger: u32, ledgers_per_batch: u32) -> u32 {
    let lpb = ledgers_per_batch.max(1);
    (ledger / lpb) * lpb
}

/// Last ledger of the batch containing `ledger`.
pub fn batch_end(ledger: u32, ledgers_per_batch: u32) -> u32 {
    let lpb = ledgers_per_batch.max(1);
    batch_start(ledger, lpb).saturating_add(lpb - 1)
}

/// Object suffix for a compression algorithm name.
pub fn object_suffix(compression: &str) -> String {
    match compression {
        "zstd" | "zst" => ".xdr.zst".to_string(),
        "" | "none" => ".xdr".to_string(),
        other => format!(".xdr.{other}"),
    }
}

/// Archive-relative key of the batch covering `ledger`.
pub fn object_key(schema: &ArchiveSchema, ledger: u32) -> String {
    let mut key = String::new();

    if schema.batches_per_partition > 1 {
        let size = schema.partition_size();
        let start = (ledger as u64 / size) * size;
        let end = (start + size - 1).min(u32::MAX as u64);
        key.push_str(&format!(
            "{:08X}--{}-{}/",
            u32::MAX as u64 - start,
            start,
            end
        ));
    }

    let start = batch_start(ledger, schema.ledgers_per_batch);
    let end = batch_end(ledger, schema.ledgers_per_batch);
    key.push_str(&format!("{:08X}--{}", u32::MAX - start, start));
    if start != end {
        key.push_str(&format!("-{end}"));
    }
    key.push_str(&object_suffix(&schema.compression));
    key
}

/// Full URL of the batch covering `ledger`. `base_url` ends with `/`.
pub fn locate(base_url: &str, schema: &ArchiveSchema, ledger: u32) -> String {
    format!("{base_url}{}", object_key(schema, ledger))
}

/// Ledgers to request so that every batch overlapping `[start, end]` is
/// visited exactly once: `start` itself, then each following batch start.
pub fn batch_heads(start: u32, end: u32, ledgers_per_batch: u32) -> impl Iterator<Item = u32> {
    let lpb = ledgers_per_batch.max(1) as u64;
    let first = (start <= end).then_some(start as u64);
    let rest = (batch_start(start, ledgers_per_batch) as u64 + lpb..=end as u64).step_by(lpb as usize);
    first.into_iter().chain(rest).map(|l| l as u32)
}
