//! In-memory [`Backend`] over a `BTreeMap`, used by tests and lightweight
//! single-process deployments.
//!
//! Expired records are invisible: reads skip them, `create` treats them as
//! absent, and `delete` reports them as missing. Versions increase
//! monotonically across all mutations.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{Backend, BackendError, Item, NO_LIMIT};

struct Stored {
    item: Item,
    version: u64,
}

#[derive(Default)]
struct Inner {
    items: BTreeMap<Vec<u8>, Stored>,
    version: u64,
}

/// Sorted in-memory key-value store.
#[derive(Default)]
pub struct MemBackend {
    inner: Mutex<Inner>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn expired(item: &Item) -> bool {
    item.expires.is_some_and(|t| t <= Utc::now())
}

#[async_trait]
impl Backend for MemBackend {
    async fn get(&self, key: &[u8]) -> Result<Item, BackendError> {
        let inner = self.inner.lock().await;
        match inner.items.get(key) {
            Some(stored) if !expired(&stored.item) => {
                let mut item = stored.item.clone();
                item.resource_id = Some(stored.version);
                Ok(item)
            }
            _ => Err(BackendError::not_found(key)),
        }
    }

    async fn create(&self, item: Item) -> Result<u64, BackendError> {
        let mut inner = self.inner.lock().await;
        if let Some(stored) = inner.items.get(&item.key) {
            if !expired(&stored.item) {
                return Err(BackendError::already_exists(&item.key));
            }
        }
        inner.version += 1;
        let version = inner.version;
        inner.items.insert(item.key.clone(), Stored { item, version });
        Ok(version)
    }

    async fn put(&self, item: Item) -> Result<u64, BackendError> {
        let mut inner = self.inner.lock().await;
        inner.version += 1;
        let version = inner.version;
        inner.items.insert(item.key.clone(), Stored { item, version });
        Ok(version)
    }

    async fn compare_and_swap(&self, expected: Item, replace_with: Item) -> Result<u64, BackendError> {
        let mut inner = self.inner.lock().await;
        match inner.items.get(&expected.key) {
            Some(stored) if !expired(&stored.item) && stored.item.value == expected.value => {}
            _ => return Err(BackendError::compare_failed(&expected.key)),
        }
        inner.version += 1;
        let version = inner.version;
        inner.items.insert(replace_with.key.clone(), Stored { item: replace_with, version });
        Ok(version)
    }

    async fn delete(&self, key: &[u8]) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        match inner.items.remove(key) {
            Some(stored) if !expired(&stored.item) => Ok(()),
            _ => Err(BackendError::not_found(key)),
        }
    }

    async fn get_range(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<Item>, BackendError> {
        let inner = self.inner.lock().await;
        let mut out = Vec::new();
        for (_, stored) in inner
            .items
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
        {
            if expired(&stored.item) {
                continue;
            }
            let mut item = stored.item.clone();
            item.resource_id = Some(stored.version);
            out.push(item);
            if limit != NO_LIMIT && out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        let doomed: Vec<Vec<u8>> = inner
            .items
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            inner.items.remove(&key);
        }
        Ok(())
    }
}
