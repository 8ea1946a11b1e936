//! Data-encryption-key lifecycle: generate via KMS, persist the wrapped
//! blob, unwrap and cache the clear key for the life of the process.
//!
//! Exactly one wrapped key exists per cluster, created lazily on first
//! `init` and never rotated or deleted by this layer. Initialization is
//! single-flight: concurrent callers share one in-flight load, and a failed
//! load caches nothing so the next call retries from scratch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use backend::{Backend, Item};

use crate::cipher::KEY_LEN;
use crate::config::KmsEncryptionConfig;
use crate::error::EncryptionError;
use crate::kms::KeyManagement;

/// Backend key prefix under which the wrapped DEK is persisted.
const DATA_ENCRYPTION_KEY_PREFIX: &str = "dataencryptionkey";

/// Fixed-size buffer holding the clear data-encryption key.
///
/// Cloned into encrypt/decrypt call paths; the memory is overwritten with
/// zeroes on drop to shorten the window during which clear key material
/// lives in RAM.
#[derive(Clone)]
pub struct DekBytes(Box<[u8; KEY_LEN]>);

impl DekBytes {
    /// Copy `bytes` into a key buffer, rejecting anything but exactly
    /// [`KEY_LEN`] bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, EncryptionError> {
        if bytes.len() != KEY_LEN {
            return Err(EncryptionError::KeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// The raw key bytes. Use promptly and let the buffer drop.
    pub fn expose(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for DekBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for DekBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DekBytes([REDACTED])")
    }
}

/// Source of the cluster's data-encryption key.
///
/// Implementations: [`KmsDekService`] in production, [`TestDekService`] for
/// tests that need real key material without KMS or a backend. A disabled
/// configuration has no instance at all; absence is the signal that
/// encryption is off.
#[async_trait]
pub trait DekService: Send + Sync {
    /// Obtain and cache the clear key. Idempotent under concurrent callers.
    async fn init(&self) -> Result<(), EncryptionError>;

    /// The cached clear key, for the encryption service only.
    ///
    /// # Errors
    ///
    /// [`EncryptionError::NotInitialized`] if [`DekService::init`] has not
    /// completed successfully.
    fn key(&self) -> Result<DekBytes, EncryptionError>;
}

/// KMS-backed [`DekService`]: one wrapped key per cluster, persisted in the
/// backend, unwrapped into memory once per process.
pub struct KmsDekService {
    kms: Arc<dyn KeyManagement>,
    backend: Arc<dyn Backend>,
    cfg: KmsEncryptionConfig,
    key: OnceCell<DekBytes>,
}

impl KmsDekService {
    pub fn new(kms: Arc<dyn KeyManagement>, backend: Arc<dyn Backend>, cfg: KmsEncryptionConfig) -> Self {
        Self {
            kms,
            backend,
            cfg,
            key: OnceCell::new(),
        }
    }

    async fn load(&self) -> Result<DekBytes, EncryptionError> {
        let key_path = backend::key([DATA_ENCRYPTION_KEY_PREFIX, self.cfg.cluster_name.as_str()]);

        let wrapped = match self.backend.get(&key_path).await {
            Ok(item) => item.value,
            Err(err) if err.is_not_found() => {
                info!(cluster = %self.cfg.cluster_name, "no data encryption key present, generating one");
                self.generate(&key_path).await?
            }
            Err(err) => return Err(err.into()),
        };

        let context = encryption_context(&self.cfg.cluster_name);
        let plaintext = self.kms.decrypt(&self.cfg.kms_key_id, &wrapped, &context).await?;
        let dek = DekBytes::try_from_slice(&plaintext)?;
        info!(cluster = %self.cfg.cluster_name, "data encryption key initialized");
        Ok(dek)
    }

    /// Generate a fresh DEK via KMS and persist the wrapped blob. Losing the
    /// creation race to another writer is expected: the winner's blob is
    /// adopted instead.
    async fn generate(&self, key_path: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let context = encryption_context(&self.cfg.cluster_name);
        let generated = self.kms.generate_data_key(&self.cfg.kms_key_id, &context).await?;

        let item = Item::new(key_path.to_vec(), generated.ciphertext_blob.clone());
        match self.backend.create(item).await {
            Ok(_) => Ok(generated.ciphertext_blob),
            Err(err) if err.is_already_exists() => {
                debug!(cluster = %self.cfg.cluster_name, "lost data encryption key creation race, adopting existing key");
                let winner = self.backend.get(key_path).await?;
                Ok(winner.value)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl DekService for KmsDekService {
    async fn init(&self) -> Result<(), EncryptionError> {
        self.key.get_or_try_init(|| self.load()).await?;
        Ok(())
    }

    fn key(&self) -> Result<DekBytes, EncryptionError> {
        self.key.get().cloned().ok_or(EncryptionError::NotInitialized)
    }
}

/// [`DekService`] double: one random key, no KMS, no backend.
#[derive(Default)]
pub struct TestDekService {
    key: OnceCell<DekBytes>,
}

impl TestDekService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DekService for TestDekService {
    async fn init(&self) -> Result<(), EncryptionError> {
        self.key
            .get_or_try_init(|| async {
                use aes_gcm::aead::rand_core::RngCore;
                use aes_gcm::aead::OsRng;
                let mut buf = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut buf);
                DekBytes::try_from_slice(&buf)
            })
            .await?;
        Ok(())
    }

    fn key(&self) -> Result<DekBytes, EncryptionError> {
        self.key.get().cloned().ok_or(EncryptionError::NotInitialized)
    }
}

fn encryption_context(cluster_name: &str) -> HashMap<String, String> {
    HashMap::from([("clusterName".to_owned(), cluster_name.to_owned())])
}
