//! Error types for `homedash-core`.
//!
//! Variants carry item ids, field names, and reasons. They never carry secret
//! values or key material.

use homedash_storage::StorageError;

/// Errors from the secret cipher.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// HKDF key derivation failed.
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },

    /// The value is not an `ENC(...)` envelope or its payload is not valid base64.
    #[error("value is not a sealed secret: {reason}")]
    NotSealed { reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}

/// Errors from parsing or validating a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document (or one of its parts) does not have the expected shape.
    #[error("malformed document: {reason}")]
    Malformed { reason: String },

    /// An item id occurs more than once across the document.
    #[error("duplicate item id '{id}'")]
    DuplicateItemId { id: String },
}

/// Errors from [`ConfigEngine`](crate::engine::ConfigEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The incoming document was rejected before anything was written.
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    /// Sealing a newly supplied secret failed.
    #[error("secret sealing failed: {0}")]
    Crypto(#[from] CryptoError),

    /// The document could not be serialized for persistence.
    #[error("document serialization failed: {reason}")]
    Serialization { reason: String },

    /// The persisted document exists but is not a valid configuration.
    #[error("persisted config at '{location}' is not valid: {reason}")]
    Unreadable { location: String, reason: String },

    /// The storage backend failed; the previous document is left in place.
    #[error("config storage error: {0}")]
    Storage(#[from] StorageError),
}
