//! Document storage for homedash.
//!
//! This crate defines the [`DocumentStore`] trait: a byte-level home for the
//! single persisted dashboard configuration. It knows nothing about layouts,
//! items, or secrets. The persistence gateway in `homedash-core` parses and
//! serializes the document on top of it.
//!
//! Two implementations are provided:
//!
//! - [`FileStore`]: the production default, one JSON file at a canonical path
//! - [`MemoryStore`]: in-memory, for testing only

mod error;
mod file;
mod memory;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// A store holding exactly one document.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// No locking discipline is implied: callers that need read-modify-write
/// atomicity serialize access themselves.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Read the raw document bytes.
    ///
    /// Returns `Ok(None)` if no document has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying medium fails.
    async fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the stored document with `contents`.
    ///
    /// A failed write must leave the previously stored document intact.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] or [`StorageError::CreateDir`] if the
    /// underlying medium fails.
    async fn write(&self, contents: &[u8]) -> Result<(), StorageError>;

    /// Human-readable location of the document, for logs and errors.
    fn location(&self) -> String;
}
