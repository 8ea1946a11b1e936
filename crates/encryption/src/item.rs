//! Record-level encryption adapter: transforms only an item's value and
//! carries every other field through verbatim.

use tracing::debug;

use backend::Item;

use crate::envelope::{Envelope, ParsedValue};
use crate::error::EncryptionError;
use crate::service::EncryptionService;

/// Adapts [`EncryptionService`] to whole backend records, detecting values
/// written before encryption was enabled on the way out. This is the single
/// point of backward compatibility for a mixed corpus.
#[derive(Clone)]
pub struct ItemEncrypter {
    service: Option<EncryptionService>,
}

impl ItemEncrypter {
    /// With `service = None` both directions are the identity function.
    pub fn new(service: Option<EncryptionService>) -> Self {
        Self { service }
    }

    /// True when records will actually be sealed.
    pub fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    /// Seal `item.value`; all other fields are copied verbatim.
    pub fn encrypt(&self, item: Item) -> Result<Item, EncryptionError> {
        let Some(service) = &self.service else {
            return Ok(item);
        };

        let sealed = service.encrypt(&item.value)?;
        let outer = Envelope {
            value: sealed,
            nonce: None,
            encrypted: true,
        };
        Ok(Item {
            value: outer.to_bytes()?,
            ..item
        })
    }

    /// Open `item.value` if it is an encrypted envelope; legacy plaintext and
    /// explicitly unencrypted values pass through unchanged.
    ///
    /// # Errors
    ///
    /// [`EncryptionError::Config`] if the value is encrypted but no
    /// decryption capability is configured: a fatal misconfiguration, not a
    /// transient failure.
    pub fn decrypt(&self, item: Item) -> Result<Item, EncryptionError> {
        let envelope = match Envelope::detect(&item.value) {
            ParsedValue::Legacy(_) => return Ok(item),
            ParsedValue::Envelope(envelope) => envelope,
        };

        if !envelope.encrypted {
            return Ok(item);
        }

        let Some(service) = &self.service else {
            return Err(EncryptionError::Config(
                "encrypted record present but no decryption capability is configured".into(),
            ));
        };

        let value = match Envelope::detect(&envelope.value) {
            ParsedValue::Envelope(inner) => service.decrypt(&inner)?,
            // Nonce-less generation: the wrapped value was stored in the clear.
            ParsedValue::Legacy(raw) => raw,
        };
        debug!(key = %String::from_utf8_lossy(&item.key), "opened sealed record");
        Ok(Item { value, ..item })
    }
}
