//! Self-describing encoding for encrypted values, backward compatible with
//! unencrypted legacy data.
//!
//! Two generations of the JSON encoding coexist in persisted data: the outer
//! record carries `value` + `encrypted`, the sealed inner record carries
//! `value` + `nonce`. Every field tolerates absence so one struct reads both.
//! Anything that does not decode as an envelope at all is legacy plaintext
//! written before encryption was enabled.

use serde::{Deserialize, Serialize};

/// On-disk encoding of an encrypted value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Ciphertext, or a nested serialized envelope, base64-encoded on the
    /// wire.
    #[serde(default, with = "b64")]
    pub value: Vec<u8>,

    /// Nonce used to seal `value`; absent when `value` is not itself sealed.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64_opt")]
    pub nonce: Option<Vec<u8>>,

    /// Whether `value` holds encrypted data. Defaults to false so that plain
    /// JSON documents read back as unencrypted.
    #[serde(default)]
    pub encrypted: bool,
}

/// Result of inspecting a stored value: a structured envelope, or opaque
/// legacy bytes that pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedValue {
    Envelope(Envelope),
    Legacy(Vec<u8>),
}

impl Envelope {
    /// Serialize to the JSON wire encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Inspect a stored value. Decode failure is not an error here: it is the
    /// signal that the bytes predate encryption.
    pub fn detect(data: &[u8]) -> ParsedValue {
        match serde_json::from_slice::<Envelope>(data) {
            Ok(envelope) => ParsedValue::Envelope(envelope),
            Err(_) => ParsedValue::Legacy(data.to_vec()),
        }
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod b64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => ser.serialize_some(&STANDARD.encode(b)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded = Option::<String>::deserialize(de)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_with_nonce() {
        let envelope = Envelope {
            value: vec![1, 2, 3],
            nonce: Some(vec![9; 12]),
            encrypted: true,
        };
        let bytes = envelope.to_bytes().unwrap();
        match Envelope::detect(&bytes) {
            ParsedValue::Envelope(parsed) => assert_eq!(parsed, envelope),
            ParsedValue::Legacy(_) => panic!("expected envelope"),
        }
    }

    #[test]
    fn outer_generation_parses_without_nonce() {
        let parsed = Envelope::detect(br#"{"value":"AQID","encrypted":true}"#);
        match parsed {
            ParsedValue::Envelope(env) => {
                assert_eq!(env.value, vec![1, 2, 3]);
                assert!(env.nonce.is_none());
                assert!(env.encrypted);
            }
            ParsedValue::Legacy(_) => panic!("expected envelope"),
        }
    }

    #[test]
    fn raw_bytes_are_legacy() {
        let data = b"\x00\x01not json at all";
        assert_eq!(Envelope::detect(data), ParsedValue::Legacy(data.to_vec()));
    }

    #[test]
    fn json_non_object_is_legacy() {
        assert!(matches!(Envelope::detect(b"[1,2,3]"), ParsedValue::Legacy(_)));
        assert!(matches!(Envelope::detect(b"\"text\""), ParsedValue::Legacy(_)));
    }

    #[test]
    fn foreign_json_object_reads_as_unencrypted() {
        // A legacy document that happens to be a JSON object parses with every
        // envelope field defaulted, so it is treated as plaintext upstream.
        let parsed = Envelope::detect(br#"{"cluster_name":"east","key_pairs":[]}"#);
        match parsed {
            ParsedValue::Envelope(env) => {
                assert!(!env.encrypted);
                assert!(env.value.is_empty());
            }
            ParsedValue::Legacy(_) => panic!("expected envelope with defaults"),
        }
    }

    #[test]
    fn nonce_is_omitted_from_wire_when_absent() {
        let envelope = Envelope {
            value: vec![1],
            nonce: None,
            encrypted: true,
        };
        let bytes = envelope.to_bytes().unwrap();
        assert!(!String::from_utf8(bytes).unwrap().contains("nonce"));
    }
}
