//! Errors produced by the CA storage service.

use thiserror::Error;

use backend::BackendError;
use encryption::EncryptionError;

#[derive(Debug, Error)]
pub enum CaError {
    /// An active authority already holds this id; user-facing on create.
    #[error("cert authority {0} already exists")]
    AlreadyExists(String),

    /// No authority exists where one was required.
    #[error("cert authority {0} not found")]
    NotFound(String),

    /// The stored authority changed under the caller; retry with fresh state.
    #[error("cert authority {0} has been updated concurrently, try again")]
    CompareFailed(String),

    /// The authority fails structural checks.
    #[error("invalid cert authority: {0}")]
    Validation(String),

    /// A stored document would not deserialize; data corruption, not retried.
    #[error("malformed cert authority document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CaError {
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::AlreadyExists(_) => true,
            Self::Backend(err) => err.is_already_exists(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Backend(err) => err.is_not_found(),
            _ => false,
        }
    }

    pub fn is_compare_failed(&self) -> bool {
        match self {
            Self::CompareFailed(_) => true,
            Self::Backend(err) => err.is_compare_failed(),
            _ => false,
        }
    }
}
