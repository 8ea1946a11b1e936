//! Authenticated encryption of byte payloads against the cached DEK.

use std::sync::Arc;

use tracing::{debug, info};

use backend::Backend;

use crate::cipher;
use crate::config::KmsEncryptionConfig;
use crate::dek::{DekService, KmsDekService};
use crate::envelope::Envelope;
use crate::error::EncryptionError;
use crate::kms::AwsKms;

/// Stateless transformer sealing and opening byte payloads with the key held
/// by a [`DekService`].
#[derive(Clone)]
pub struct EncryptionService {
    dek: Arc<dyn DekService>,
}

impl EncryptionService {
    pub fn new(dek: Arc<dyn DekService>) -> Self {
        Self { dek }
    }

    /// Initialize the underlying DEK service. Wiring calls this once during
    /// startup; it is idempotent and safe to retry after a failure.
    pub async fn init(&self) -> Result<(), EncryptionError> {
        self.dek.init().await
    }

    /// Seal `plaintext` and return the serialized envelope carrying the
    /// ciphertext and its nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let dek = self.dek.key()?;
        let (ciphertext, nonce) = cipher::seal(dek.expose(), plaintext)?;
        let envelope = Envelope {
            value: ciphertext,
            nonce: Some(nonce.to_vec()),
            encrypted: true,
        };
        debug!("sealed value");
        Ok(envelope.to_bytes()?)
    }

    /// Open a parsed envelope back into plaintext.
    ///
    /// An envelope without a nonce predates sealing and carries its value in
    /// the clear; that value is returned unchanged.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, EncryptionError> {
        let Some(nonce) = envelope.nonce.as_deref() else {
            return Ok(envelope.value.clone());
        };
        let dek = self.dek.key()?;
        Ok(cipher::open(dek.expose(), &envelope.value, nonce)?)
    }
}

/// Build the encryption service for `cfg`, or `None` when data encryption is
/// disabled; absence is the disabled signal at every layer above.
///
/// The returned service still needs [`EncryptionService::init`] before first
/// use, alongside the rest of the startup sequence.
pub async fn new_encryption_service(
    cfg: KmsEncryptionConfig,
    backend: Arc<dyn Backend>,
) -> Result<Option<EncryptionService>, EncryptionError> {
    if !cfg.enabled {
        info!("data encryption not enabled");
        return Ok(None);
    }
    cfg.validate()?;
    info!(cluster = %cfg.cluster_name, "data encryption enabled");

    let kms = AwsKms::connect(&cfg.region).await;
    let dek = KmsDekService::new(Arc::new(kms), backend, cfg);
    Ok(Some(EncryptionService::new(Arc::new(dek))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dek::TestDekService;
    use crate::envelope::ParsedValue;

    async fn ready_service() -> EncryptionService {
        let service = EncryptionService::new(Arc::new(TestDekService::new()));
        service.init().await.unwrap();
        service
    }

    #[tokio::test]
    async fn encrypt_decrypt_round_trip() {
        let service = ready_service().await;
        for plaintext in [&b""[..], &b"x"[..], &b"a longer plaintext payload"[..]] {
            let sealed = service.encrypt(plaintext).unwrap();
            let envelope = match Envelope::detect(&sealed) {
                ParsedValue::Envelope(env) => env,
                ParsedValue::Legacy(_) => panic!("expected envelope"),
            };
            assert_eq!(service.decrypt(&envelope).unwrap(), plaintext);
        }
    }

    #[tokio::test]
    async fn encrypt_before_init_fails() {
        let service = EncryptionService::new(Arc::new(TestDekService::new()));
        assert!(matches!(
            service.encrypt(b"p"),
            Err(EncryptionError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn nonce_less_envelope_passes_through() {
        let service = ready_service().await;
        let envelope = Envelope {
            value: b"already clear".to_vec(),
            nonce: None,
            encrypted: true,
        };
        assert_eq!(service.decrypt(&envelope).unwrap(), b"already clear");
    }

    #[tokio::test]
    async fn ciphertext_differs_from_plaintext() {
        let service = ready_service().await;
        let sealed = service.encrypt(b"plaintext").unwrap();
        let ParsedValue::Envelope(envelope) = Envelope::detect(&sealed) else {
            panic!("expected envelope");
        };
        assert_ne!(envelope.value, b"plaintext".to_vec());
        assert_eq!(envelope.nonce.as_ref().map(Vec::len), Some(12));
    }

    #[tokio::test]
    async fn tampered_envelope_fails_to_open() {
        let service = ready_service().await;
        let sealed = service.encrypt(b"plaintext").unwrap();
        let ParsedValue::Envelope(mut envelope) = Envelope::detect(&sealed) else {
            panic!("expected envelope");
        };
        envelope.value[0] ^= 0xFF;
        assert!(service.decrypt(&envelope).is_err());
    }
}
