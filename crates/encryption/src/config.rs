//! Configuration for the envelope-encryption layer.
//!
//! All values are read from environment variables. When `enabled` is false
//! the remaining fields may be empty and nothing is validated; the factory
//! then produces no encryption service at all.

use serde::Deserialize;

use crate::error::EncryptionError;

/// Validated envelope-encryption configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KmsEncryptionConfig {
    /// Cluster this key belongs to; bound into the KMS encryption context.
    #[serde(default)]
    pub cluster_name: String,

    /// AWS region of the KMS master key.
    #[serde(default)]
    pub region: String,

    /// KMS master key id used to wrap and unwrap the data encryption key.
    #[serde(default)]
    pub kms_key_id: String,

    /// Whether stored values are encrypted at all.
    #[serde(default)]
    pub enabled: bool,
}

impl KmsEncryptionConfig {
    /// Load and validate configuration from environment variables
    /// (`CLUSTER_NAME`, `REGION`, `KMS_KEY_ID`, `ENABLED`).
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be deserialized, or if
    /// encryption is enabled with a required field missing.
    pub fn from_env() -> Result<Self, EncryptionError> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| EncryptionError::Config(e.to_string()))?;

        let c: KmsEncryptionConfig = cfg
            .try_deserialize()
            .map_err(|e| EncryptionError::Config(e.to_string()))?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first
    /// failure. A disabled configuration is always valid.
    pub fn validate(&self) -> Result<(), EncryptionError> {
        if !self.enabled {
            return Ok(());
        }
        ensure_non_empty(&self.cluster_name, "CLUSTER_NAME")?;
        ensure_non_empty(&self.region, "REGION")?;
        ensure_non_empty(&self.kms_key_id, "KMS_KEY_ID")?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<(), EncryptionError> {
    if value.trim().is_empty() {
        return Err(EncryptionError::Config(format!(
            "{name} is required when data encryption is enabled"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_cfg() -> KmsEncryptionConfig {
        KmsEncryptionConfig {
            cluster_name: "east".into(),
            region: "us-east-1".into(),
            kms_key_id: "alias/cluster-dek".into(),
            enabled: true,
        }
    }

    #[test]
    fn enabled_with_all_fields_is_valid() {
        assert!(enabled_cfg().validate().is_ok());
    }

    #[test]
    fn enabled_rejects_missing_cluster_name() {
        let mut cfg = enabled_cfg();
        cfg.cluster_name = "".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn enabled_rejects_missing_region() {
        let mut cfg = enabled_cfg();
        cfg.region = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn enabled_rejects_missing_key_id() {
        let mut cfg = enabled_cfg();
        cfg.kms_key_id = "".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn disabled_accepts_empty_fields() {
        let cfg = KmsEncryptionConfig {
            cluster_name: "".into(),
            region: "".into(),
            kms_key_id: "".into(),
            enabled: false,
        };
        assert!(cfg.validate().is_ok());
    }
}
