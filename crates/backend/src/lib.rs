//! Generic key-value backend consumed by the encryption and CA storage layers.
//!
//! Keys are hierarchical byte strings built by joining path segments with
//! [`SEPARATOR`] (e.g. `authorities/host/example.com`). The backend is the
//! sole arbiter of ordering between concurrent writers: [`Backend::create`]
//! expresses "only I may be first", [`Backend::compare_and_swap`] expresses
//! "I must not clobber a concurrent writer", and plain [`Backend::put`] /
//! [`Backend::delete`] are last-writer-wins. Layers above add no locking of
//! their own.

pub mod error;
pub mod memory;

pub use error::BackendError;
pub use memory::MemBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Separator joining the segments of a hierarchical key.
pub const SEPARATOR: u8 = b'/';

/// Passed as the `limit` of [`Backend::get_range`] to scan without bound.
pub const NO_LIMIT: usize = 0;

/// Build a hierarchical key from path segments.
pub fn key<'a, I>(parts: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.extend_from_slice(part.as_bytes());
    }
    out
}

/// Smallest key strictly greater than every key prefixed by `start`, suitable
/// as the exclusive upper bound of a prefix scan.
pub fn range_end(start: &[u8]) -> Vec<u8> {
    // Keys here are built from ASCII path segments, so the carry loop always
    // terminates on a byte below 0xff.
    let mut end = start.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return end;
        }
        end.pop();
    }
    end
}

/// A single stored record. The encryption layer transforms `value` only;
/// every other field passes through unmodified.
#[derive(Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// When the record expires and becomes invisible to reads, if ever.
    pub expires: Option<DateTime<Utc>>,
    /// Backend revision of the record, stamped on reads.
    pub resource_id: Option<u64>,
    /// Lease under which the record was written, if any.
    pub lease_id: Option<String>,
}

impl Item {
    /// A record with no expiry, revision, or lease.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            expires: None,
            resource_id: None,
            lease_id: None,
        }
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may hold plaintext secrets; show the length only.
        f.debug_struct("Item")
            .field("key", &String::from_utf8_lossy(&self.key))
            .field("value_len", &self.value.len())
            .field("expires", &self.expires)
            .field("resource_id", &self.resource_id)
            .field("lease_id", &self.lease_id)
            .finish()
    }
}

/// Key-value store with expiry and atomic write primitives.
///
/// Write operations return the backend's monotonically increasing version for
/// the mutation; callers that don't need it discard it.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch a single record.
    ///
    /// # Errors
    ///
    /// [`BackendError::NotFound`] if no live record exists at `key`.
    async fn get(&self, key: &[u8]) -> Result<Item, BackendError>;

    /// Insert a record only if its key is free.
    ///
    /// # Errors
    ///
    /// [`BackendError::AlreadyExists`] if a live record holds the key.
    async fn create(&self, item: Item) -> Result<u64, BackendError>;

    /// Insert or replace a record unconditionally.
    async fn put(&self, item: Item) -> Result<u64, BackendError>;

    /// Replace a record only if its stored value still equals
    /// `expected.value`. Both items must share a key.
    ///
    /// # Errors
    ///
    /// [`BackendError::CompareFailed`] if the stored value differs or the
    /// record is gone.
    async fn compare_and_swap(&self, expected: Item, replace_with: Item) -> Result<u64, BackendError>;

    /// Remove a record.
    ///
    /// # Errors
    ///
    /// [`BackendError::NotFound`] if no live record exists at `key`.
    async fn delete(&self, key: &[u8]) -> Result<(), BackendError>;

    /// Fetch records with keys in `[start, end)`, at most `limit` of them
    /// ([`NO_LIMIT`] for all).
    async fn get_range(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<Item>, BackendError>;

    /// Remove every record with a key in `[start, end)`.
    async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_segments() {
        assert_eq!(key(["authorities", "host", "example.com"]), b"authorities/host/example.com".to_vec());
        assert_eq!(key(["dataencryptionkey", "east"]), b"dataencryptionkey/east".to_vec());
        assert_eq!(key(["one"]), b"one".to_vec());
    }

    #[test]
    fn range_end_increments_last_byte() {
        assert_eq!(range_end(b"authorities/host"), b"authorities/hosu".to_vec());
        assert_eq!(range_end(b"a"), b"b".to_vec());
    }

    #[test]
    fn range_end_carries_past_0xff() {
        assert_eq!(range_end(&[b'a', 0xff]), vec![b'b']);
    }

    #[test]
    fn item_debug_hides_value_bytes() {
        let item = Item::new(b"authorities/host/x".to_vec(), b"super secret".to_vec());
        let rendered = format!("{item:?}");
        assert!(!rendered.contains("super secret"));
        assert!(rendered.contains("authorities/host/x"));
    }
}
