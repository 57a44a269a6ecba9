//! Secret sealing for persisted widget credentials.
//!
//! Newly supplied secrets can be stored as self-describing ciphertext instead
//! of plaintext. A sealed value looks like `ENC(<base64>)` where the payload is
//! `nonce (12 bytes) || ciphertext || tag (16 bytes)` under AES-256-GCM.
//!
//! # Security model
//!
//! - Every seal generates a fresh 96-bit nonce via `OsRng`.
//! - The key is derived from an operator passphrase with HKDF-SHA256.
//! - Key types derive `Zeroize` + `ZeroizeOnDrop` and redact themselves in `Debug`.
//! - Sealed values are copied verbatim between items; they are never opened
//!   and re-sealed by the config engine.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = 12 + 16;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

const ENVELOPE_PREFIX: &str = "ENC(";
const ENVELOPE_SUFFIX: &str = ")";

/// HKDF `info` for the config secret key.
const KEY_INFO: &[u8] = b"homedash-config-secrets-v1";

/// A 256-bit encryption key that is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Whether `value` is an `ENC(...)` envelope.
#[must_use]
pub fn is_sealed(value: &str) -> bool {
    value.len() > ENVELOPE_PREFIX.len() + ENVELOPE_SUFFIX.len()
        && value.starts_with(ENVELOPE_PREFIX)
        && value.ends_with(ENVELOPE_SUFFIX)
}

/// Seals and opens secret strings with one key.
#[derive(Clone)]
pub struct SecretCipher {
    key: EncryptionKey,
}

impl SecretCipher {
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Derive the cipher key from an operator passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivation`] if the passphrase is empty.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::KeyDerivation {
                reason: "passphrase must not be empty".to_owned(),
            });
        }
        let hk = Hkdf::<Sha256>::new(None, passphrase.as_bytes());
        let mut derived = [0u8; 32];
        hk.expand(KEY_INFO, &mut derived)
            .map_err(|e| CryptoError::KeyDerivation {
                reason: e.to_string(),
            })?;
        let key = EncryptionKey::from_bytes(derived);
        derived.zeroize();
        Ok(Self::new(key))
    }

    /// Encrypt `plaintext` into an `ENC(...)` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let combined = encrypt(&self.key, plaintext.as_bytes())?;
        Ok(format!(
            "{ENVELOPE_PREFIX}{}{ENVELOPE_SUFFIX}",
            BASE64.encode(combined)
        ))
    }

    /// Decrypt an envelope produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// - [`CryptoError::NotSealed`] if `sealed` is not a valid envelope.
    /// - [`CryptoError::CiphertextTooShort`] if the payload cannot hold a nonce and tag.
    /// - [`CryptoError::Decryption`] on a wrong key, tampering, or non-UTF-8 plaintext.
    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let payload = sealed
            .strip_prefix(ENVELOPE_PREFIX)
            .and_then(|rest| rest.strip_suffix(ENVELOPE_SUFFIX))
            .ok_or_else(|| CryptoError::NotSealed {
                reason: "missing ENC(...) envelope".to_owned(),
            })?;
        let combined = BASE64.decode(payload).map_err(|e| CryptoError::NotSealed {
            reason: e.to_string(),
        })?;
        let plaintext = decrypt(&self.key, &combined)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption {
            reason: "plaintext is not valid UTF-8".to_owned(),
        })
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

fn decrypt(key: &EncryptionKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if combined.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_CIPHERTEXT_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}
