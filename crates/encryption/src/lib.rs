//! Envelope encryption for backend records.
//!
//! A remote KMS wraps one 256-bit data-encryption key (DEK) per cluster; the
//! wrapped blob lives in the backend and the clear key lives only in process
//! memory. Stored values are sealed with AES-256-GCM under the cached DEK and
//! persisted as self-describing envelopes that coexist with unencrypted
//! legacy values.
//!
//! Layering, outermost first:
//!
//! 1. [`ItemEncrypter`] adapts whole backend records and detects legacy values.
//! 2. [`EncryptionService`] seals byte payloads into envelopes and back.
//! 3. [`DekService`] obtains, unwraps, and caches the cluster DEK.
//!
//! # Startup
//!
//! Build the stack with [`new_encryption_service`] (which returns `None` when
//! encryption is disabled) and call [`EncryptionService::init`] once before
//! serving: it generates the cluster DEK on first boot, adopts a concurrent
//! winner's key on a creation race, and is idempotent after success.

pub mod cipher;
pub mod config;
pub mod dek;
pub mod envelope;
pub mod error;
pub mod item;
pub mod kms;
pub mod service;

pub use config::KmsEncryptionConfig;
pub use dek::{DekBytes, DekService, KmsDekService, TestDekService};
pub use error::EncryptionError;
pub use item::ItemEncrypter;
pub use kms::{AwsKms, KeyManagement};
pub use service::{new_encryption_service, EncryptionService};
