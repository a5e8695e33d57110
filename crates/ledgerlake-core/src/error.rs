//! Error types for archive access.
//!
//! Three layers, innermost first:
//! - [`TransportError`]: what a single GET against the archive can yield
//! - [`CodecError`]: what the binary codec reports for a payload
//! - [`LakeError`]: the one error type every public entry point returns,
//!   carrying ledger / url / size / attempt context

use thiserror::Error;

/// Errors from a single request made through an [`ArchiveTransport`].
///
/// [`ArchiveTransport`]: crate::transport::ArchiveTransport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The object does not exist in the archive (HTTP 404).
    #[error("object not found: {url}")]
    NotFound { url: String },

    /// Non-2xx response other than not-found.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {ms}ms")]
    Timeout { url: String, ms: u64 },

    /// Connection refused, reset, TLS failure, body read failure, etc.
    #[error("HTTP error for {url}: {reason}")]
    Http { url: String, reason: String },

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` if the object is absent. Never retried.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Timeout { .. } | Self::Http { .. }
        )
    }
}

/// Errors from the binary codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A tagged union carried a discriminant this reader does not know.
    #[error("unknown {type_name} discriminant {discriminant}")]
    UnsupportedVersion {
        type_name: &'static str,
        discriminant: u32,
    },

    /// The payload is not a valid encoding.
    #[error("malformed data: {0}")]
    Malformed(String),
}

/// Coarse classification of a [`LakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    NotFound,
    TransientIo,
    Decompression,
    UnsupportedFormat,
    MalformedData,
    RangeValidation,
    Closed,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::NotFound => write!(f, "not-found"),
            Self::TransientIo => write!(f, "transient-io"),
            Self::Decompression => write!(f, "decompression"),
            Self::UnsupportedFormat => write!(f, "unsupported-format"),
            Self::MalformedData => write!(f, "malformed-data"),
            Self::RangeValidation => write!(f, "range-validation"),
            Self::Closed => write!(f, "closed"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// The error type returned by every public archive operation.
#[derive(Debug, Error)]
pub enum LakeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    /// `{base_url}.config.json` does not exist.
    #[error("archive schema not found at {url}")]
    SchemaNotFound { url: String },

    #[error("failed to fetch archive schema from {url}: {source}")]
    SchemaFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to parse archive schema from {url}: {source}")]
    SchemaDecode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid archive schema from {url}: {reason}")]
    SchemaInvalid { url: String, reason: String },

    /// The archive holds no batch for this ledger.
    #[error("ledger {ledger} not found in archive ({url})")]
    LedgerNotFound { ledger: u32, url: String },

    /// Transient failures persisted through every retry.
    #[error("download of {url} for ledger {ledger} failed after {attempts} attempt(s): {source}")]
    DownloadFailed {
        ledger: u32,
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error(
        "failed to decompress batch for ledger {ledger} from {url} \
         ({compressed_size} compressed bytes): {source}"
    )]
    Decompression {
        ledger: u32,
        url: String,
        compressed_size: usize,
        #[source]
        source: std::io::Error,
    },

    /// The payload uses a format version newer than this reader.
    #[error(
        "unsupported ledger metadata format for ledger {ledger} from {url} \
         ({decompressed_size} bytes), the reader needs an update: {source}"
    )]
    UnsupportedFormat {
        ledger: u32,
        url: String,
        decompressed_size: usize,
        #[source]
        source: CodecError,
    },

    #[error("malformed batch for ledger {ledger} from {url} ({decompressed_size} bytes): {source}")]
    MalformedBatch {
        ledger: u32,
        url: String,
        decompressed_size: usize,
        #[source]
        source: CodecError,
    },

    /// A decoded batch does not cover the ledger it was fetched for.
    #[error("batch [{start}, {end}] does not contain requested ledger {ledger}")]
    RangeMismatch { ledger: u32, start: u32, end: u32 },

    /// The envelope and result lists of a ledger differ in length.
    #[error("ledger {ledger} has {envelopes} transaction envelopes but {results} results")]
    ResultCountMismatch {
        ledger: u32,
        envelopes: usize,
        results: usize,
    },

    /// The ledger is inside its batch range but has no metadata record.
    #[error("batch [{start}, {end}] has no metadata for ledger {ledger}")]
    MissingLedger { ledger: u32, start: u32, end: u32 },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("invalid ledger range {start}..={end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("client is closed")]
    Closed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl LakeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidRange { .. } => ErrorKind::Config,
            Self::SchemaNotFound { .. } | Self::LedgerNotFound { .. } => ErrorKind::NotFound,
            Self::SchemaFetch { source, .. } | Self::DownloadFailed { source, .. } => {
                match source {
                    TransportError::Closed => ErrorKind::Closed,
                    _ => ErrorKind::TransientIo,
                }
            }
            Self::Decompression { .. } => ErrorKind::Decompression,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::SchemaDecode { .. }
            | Self::SchemaInvalid { .. }
            | Self::MalformedBatch { .. }
            | Self::ResultCountMismatch { .. }
            | Self::MissingLedger { .. }
            | Self::Encode { .. } => ErrorKind::MalformedData,
            Self::RangeMismatch { .. } => ErrorKind::RangeValidation,
            Self::Closed => ErrorKind::Closed,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the archive has no data for the request.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T, E = LakeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_terminal() {
        let e = TransportError::NotFound {
            url: "https://a/b".into(),
        };
        assert!(e.is_not_found());
        assert!(!e.is_retryable());
        assert!(!TransportError::Closed.is_retryable());
    }

    #[test]
    fn status_and_timeouts_are_retryable() {
        assert!(TransportError::Status {
            url: "u".into(),
            status: 503
        }
        .is_retryable());
        assert!(TransportError::Timeout {
            url: "u".into(),
            ms: 10
        }
        .is_retryable());
    }

    #[test]
    fn error_kinds() {
        let e = LakeError::RangeMismatch {
            ledger: 600,
            start: 500,
            end: 563,
        };
        assert_eq!(e.kind(), ErrorKind::RangeValidation);
        assert!(e.to_string().contains("600"));

        let e = LakeError::UnsupportedFormat {
            ledger: 1,
            url: "u".into(),
            decompressed_size: 10,
            source: CodecError::UnsupportedVersion {
                type_name: "LedgerCloseMeta",
                discriminant: 9,
            },
        };
        assert_eq!(e.kind(), ErrorKind::UnsupportedFormat);

        let e = LakeError::DownloadFailed {
            ledger: 1,
            url: "u".into(),
            attempts: 3,
            source: TransportError::Status {
                url: "u".into(),
                status: 500,
            },
        };
        assert_eq!(e.kind(), ErrorKind::TransientIo);
        assert!(e.to_string().contains("3 attempt"));
    }
}
