//! Storage error types.
//!
//! Every error variant carries the store location and the underlying reason
//! so a failed save can be diagnosed from the log line alone.

/// Errors that can occur while reading or writing the persisted document.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to read the document from its canonical location.
    #[error("failed to read document at '{location}': {reason}")]
    Read { location: String, reason: String },

    /// Failed to write the document to its canonical location.
    #[error("failed to write document at '{location}': {reason}")]
    Write { location: String, reason: String },

    /// Failed to create the directory that holds the document.
    #[error("failed to create directory '{path}': {reason}")]
    CreateDir { path: String, reason: String },
}
