//! Narrow seam over the remote key-management service.
//!
//! The DEK layer depends on this trait, not on the AWS SDK, so tests can
//! count and fake the remote calls. The encryption context must match exactly
//! between wrap and unwrap or the KMS rejects the call.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::DataKeySpec;
use tracing::info;

use crate::error::EncryptionError;

/// Result of a `GenerateDataKey` call: the clear key and its wrapped form.
pub struct GeneratedDataKey {
    /// Clear key material. The DEK service discards this and unwraps through
    /// [`KeyManagement::decrypt`] instead, so first-boot and every later boot
    /// exercise the same path.
    pub plaintext: Vec<u8>,

    /// KMS-wrapped key blob, safe to persist.
    pub ciphertext_blob: Vec<u8>,
}

impl fmt::Debug for GeneratedDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.debug_struct("GeneratedDataKey")
            .field("plaintext", &"[REDACTED]")
            .field("ciphertext_blob_len", &self.ciphertext_blob.len())
            .finish()
    }
}

/// Remote KMS operations the DEK service depends on.
#[async_trait]
pub trait KeyManagement: Send + Sync {
    /// Generate a fresh 256-bit data key bound to `context`.
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &HashMap<String, String>,
    ) -> Result<GeneratedDataKey, EncryptionError>;

    /// Unwrap a previously generated key blob bound to `context`.
    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext_blob: &[u8],
        context: &HashMap<String, String>,
    ) -> Result<Vec<u8>, EncryptionError>;
}

/// [`KeyManagement`] backed by AWS KMS.
pub struct AwsKms {
    client: aws_sdk_kms::Client,
}

impl AwsKms {
    /// Build a KMS client for `region`. Credentials are resolved via the
    /// standard AWS credential chain.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        info!(region, "kms client initialized");
        Self {
            client: aws_sdk_kms::Client::new(&config),
        }
    }

    /// Wrap an already-configured client, e.g. one pointed at a custom
    /// endpoint.
    pub fn from_client(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeyManagement for AwsKms {
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &HashMap<String, String>,
    ) -> Result<GeneratedDataKey, EncryptionError> {
        let resp = self
            .client
            .generate_data_key()
            .key_id(key_id)
            .key_spec(DataKeySpec::Aes256)
            .set_encryption_context(Some(context.clone()))
            .send()
            .await
            .map_err(|e| EncryptionError::Kms {
                op: "GenerateDataKey",
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let plaintext = resp
            .plaintext()
            .ok_or(EncryptionError::KmsResponse {
                op: "GenerateDataKey",
                field: "plaintext",
            })?
            .as_ref()
            .to_vec();
        let ciphertext_blob = resp
            .ciphertext_blob()
            .ok_or(EncryptionError::KmsResponse {
                op: "GenerateDataKey",
                field: "ciphertext_blob",
            })?
            .as_ref()
            .to_vec();

        Ok(GeneratedDataKey {
            plaintext,
            ciphertext_blob,
        })
    }

    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext_blob: &[u8],
        context: &HashMap<String, String>,
    ) -> Result<Vec<u8>, EncryptionError> {
        let resp = self
            .client
            .decrypt()
            .key_id(key_id)
            .ciphertext_blob(Blob::new(ciphertext_blob.to_vec()))
            .set_encryption_context(Some(context.clone()))
            .send()
            .await
            .map_err(|e| EncryptionError::Kms {
                op: "Decrypt",
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(resp
            .plaintext()
            .ok_or(EncryptionError::KmsResponse {
                op: "Decrypt",
                field: "plaintext",
            })?
            .as_ref()
            .to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_debug_is_redacted() {
        let generated = GeneratedDataKey {
            plaintext: vec![0xFF; 32],
            ciphertext_blob: vec![1, 2, 3],
        };
        let rendered = format!("{generated:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("255"));
    }
}
