//! Storage for cluster certificate authorities: lifecycle state machine
//! (create, idempotent upsert, compare-and-swap, activate/deactivate) layered
//! over a generic key-value backend, with values sealed through the envelope
//! encryption crate when it is configured.

pub mod authority;
pub mod error;
pub mod service;

pub use authority::{CertAuthID, CertAuthType, CertAuthority, SigningKeyPair};
pub use error::CaError;
pub use service::CaService;
