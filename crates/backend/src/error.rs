//! Backend error taxonomy.
//!
//! `NotFound`, `AlreadyExists`, and `CompareFailed` are expected,
//! distinguishable conditions that callers branch on via the `is_*`
//! predicates; everything else is a genuine failure.

use thiserror::Error;

/// Errors produced by a [`crate::Backend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// No live record exists at the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A live record already holds the key.
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    /// The stored value no longer matches what the caller expected.
    #[error("compare failed: stored value does not match expected for {0}")]
    CompareFailed(String),

    /// The backend itself failed.
    #[error("backend failure: {0}")]
    Internal(String),
}

impl BackendError {
    pub fn not_found(key: &[u8]) -> Self {
        Self::NotFound(String::from_utf8_lossy(key).into_owned())
    }

    pub fn already_exists(key: &[u8]) -> Self {
        Self::AlreadyExists(String::from_utf8_lossy(key).into_owned())
    }

    pub fn compare_failed(key: &[u8]) -> Self {
        Self::CompareFailed(String::from_utf8_lossy(key).into_owned())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_compare_failed(&self) -> bool {
        matches!(self, Self::CompareFailed(_))
    }
}
