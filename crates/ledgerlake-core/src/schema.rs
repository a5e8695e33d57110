//! Archive layout parameters and their fetch-once resolution.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{LakeError, TransportError};
use crate::transport::ArchiveTransport;

/// Layout parameters published by the archive in `.config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSchema {
    /// Network identifier, e.g. `"Public Global Stellar Network ; September 2015"`.
    pub network_passphrase: String,
    /// Layout format version, e.g. `"1.0"`.
    pub version: String,
    /// Compression algorithm applied to every batch object (`"zstd"`).
    pub compression: String,
    pub ledgers_per_batch: u32,
    pub batches_per_partition: u32,
}

impl ArchiveSchema {
    /// Ledgers covered by one partition directory.
    pub fn partition_size(&self) -> u64 {
        self.ledgers_per_batch as u64 * self.batches_per_partition as u64
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.ledgers_per_batch == 0 {
            return Err("ledgersPerBatch must be > 0".into());
        }
        if self.batches_per_partition == 0 {
            return Err("batchesPerPartition must be > 0".into());
        }
        Ok(())
    }
}

/// Resolves and memoizes the [`ArchiveSchema`] for one archive.
///
/// Concurrent first callers share a single request. A failed resolution
/// leaves the memo empty so a later call starts over.
pub struct SchemaResolver {
    transport: Arc<dyn ArchiveTransport>,
    url: String,
    timeout: Duration,
    schema: OnceCell<ArchiveSchema>,
}

impl SchemaResolver {
    pub fn new(transport: Arc<dyn ArchiveTransport>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout,
            schema: OnceCell::new(),
        }
    }

    /// URL of the schema resource.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Return the schema, fetching it on first use.
    pub async fn schema(&self) -> Result<&ArchiveSchema, LakeError> {
        self.schema.get_or_try_init(|| self.fetch()).await
    }

    /// The memoized schema, if already resolved.
    pub fn cached(&self) -> Option<&ArchiveSchema> {
        self.schema.get()
    }

    async fn fetch(&self) -> Result<ArchiveSchema, LakeError> {
        debug!(url = %self.url, "fetching archive schema");
        let body = tokio::time::timeout(self.timeout, self.transport.get(&self.url))
            .await
            .map_err(|_| TransportError::Timeout {
                url: self.url.clone(),
                ms: self.timeout.as_millis() as u64,
            })
            .and_then(|r| r)
            .map_err(|e| match e {
                TransportError::NotFound { .. } => LakeError::SchemaNotFound {
                    url: self.url.clone(),
                },
                other => LakeError::SchemaFetch {
                    url: self.url.clone(),
                    source: other,
                },
            })?;

        let schema: ArchiveSchema =
            serde_json::from_slice(&body).map_err(|e| LakeError::SchemaDecode {
                url: self.url.clone(),
                source: e,
            })?;
        schema.validate().map_err(|reason| LakeError::SchemaInvalid {
            url: self.url.clone(),
            reason,
        })?;

        info!(
            url = %self.url,
            network = %schema.network_passphrase,
            ledgers_per_batch = schema.ledgers_per_batch,
            batches_per_partition = schema.batches_per_partition,
            compression = %schema.compression,
            "archive schema resolved"
        );
        Ok(schema)
    }
}
