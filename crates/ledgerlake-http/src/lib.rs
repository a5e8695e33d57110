//! ledgerlake-http: HTTP transport for ledger data-lake archives.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), ledgerlake_core::LakeError> {
//! use ledgerlake_core::ArchiveConfig;
//!
//! let config = ArchiveConfig::new("https://lake.example.org/ledgers/pubnet/")?;
//! let lake = ledgerlake_http::connect(config)?;
//! let meta = lake.get_ledger(59_906_272).await?;
//! println!("{} transactions", meta.transaction_count());
//! # Ok(())
//! # }
//! ```

pub mod client;

use std::sync::Arc;

use ledgerlake_core::{ArchiveConfig, LakeError, LedgerLake};

pub use client::{HttpArchiveTransport, HttpTransportConfig};

/// Client for the archive at `config.base_url()` over HTTP(S).
pub fn connect(config: ArchiveConfig) -> Result<LedgerLake, LakeError> {
    let transport = Arc::new(HttpArchiveTransport::for_archive(&config)?);
    LedgerLake::new(config, transport)
}
