//! Errors produced by the envelope-encryption layer.
//!
//! Messages carry the operation and key id involved, never key material,
//! plaintext, or nonces.

use thiserror::Error;

use backend::BackendError;

use crate::cipher::CipherError;

#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The configuration is unusable; fatal, never retried.
    #[error("invalid encryption configuration: {0}")]
    Config(String),

    /// [`crate::dek::DekService::init`] has not completed successfully.
    #[error("data encryption key not initialized")]
    NotInitialized,

    /// KMS returned key material of the wrong size.
    #[error("data encryption key has invalid length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// A remote KMS call failed; the caller may retry `init` from scratch.
    #[error("kms {op} failed: {message}")]
    Kms { op: &'static str, message: String },

    /// A KMS response was missing a required field.
    #[error("kms {op} response missing {field}")]
    KmsResponse { op: &'static str, field: &'static str },

    /// Sealing or opening failed; authentication failures are final for the
    /// given input.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// A value claimed to be an envelope but would not decode as one.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl EncryptionError {
    /// True for fatal misconfiguration, e.g. encrypted data found with no
    /// decryption capability.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
