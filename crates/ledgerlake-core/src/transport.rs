//! The `ArchiveTransport` trait: how raw objects are read from the archive.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Read-only object access to a data-lake archive.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance is shared by every
/// task of a client and may see many concurrent `get` calls.
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn ArchiveTransport>`.
#[async_trait]
pub trait ArchiveTransport: Send + Sync + 'static {
    /// Fetch the full body of the object at `url`.
    ///
    /// Absent objects must be reported as [`TransportError::NotFound`] so
    /// callers can tell a missing ledger apart from a transient fault.
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;

    /// Release connections. Further `get` calls may fail with
    /// [`TransportError::Closed`].
    fn close(&self) {}
}
