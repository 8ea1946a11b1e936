//! AES-256-GCM primitives used to seal and open stored values.
//!
//! This module is free of AWS and backend dependencies. The envelope layer
//! supplies the key and persists the nonce alongside the ciphertext.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid data encryption key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The nonce is the wrong length (must be [`NONCE_LEN`] bytes).
    #[error("invalid nonce length: expected {NONCE_LEN} bytes")]
    InvalidNonceLength,

    /// Authentication failed: wrong key, tampered ciphertext, or truncated
    /// input. Final for the given input; retrying cannot change the outcome.
    #[error("aead authentication failed")]
    AeadFailure,
}

/// Encrypt `plaintext` with AES-256-GCM under `key`, with no associated data.
/// Returns the ciphertext (tag included) and the nonce used.
///
/// A fresh 96-bit nonce is drawn from the OS CSPRNG per call. Never use more
/// than 2^32 encryptions under one key because of nonce collision risk; 12
/// random bytes keep the repeat probability negligible well inside that bound.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), CipherError> {
    let cipher = build_cipher(key)?;

    use aes_gcm::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;
    Ok((ciphertext, nonce_bytes))
}

/// Decrypt AES-256-GCM `ciphertext` produced under `key` with `nonce`.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails.
pub fn open(key: &[u8], ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::InvalidNonceLength);
    }
    let cipher = build_cipher(key)?;
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn random_key() -> Vec<u8> {
        use aes_gcm::aead::rand_core::RngCore;
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        for len in [0usize, 1, 13, 1024] {
            let plaintext = vec![0xA5u8; len];
            let (ciphertext, nonce) = seal(&key, &plaintext).unwrap();
            let opened = open(&key, &ciphertext, &nonce).unwrap();
            assert_eq!(opened, plaintext);
        }
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let (ciphertext, nonce) = seal(&random_key(), b"secret").unwrap();
        assert!(matches!(
            open(&random_key(), &ciphertext, &nonce),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(seal(&[0u8; 16], b"x").is_err());
        assert!(open(&[0u8; 16], b"x", &[0u8; NONCE_LEN]).is_err());
    }

    #[test]
    fn invalid_nonce_length_rejected() {
        let key = random_key();
        let (ciphertext, _) = seal(&key, b"x").unwrap();
        assert!(matches!(
            open(&key, &ciphertext, &[0u8; 8]),
            Err(CipherError::InvalidNonceLength)
        ));
    }

    #[test]
    fn any_flipped_ciphertext_bit_fails_auth() {
        let key = random_key();
        let (ciphertext, nonce) = seal(&key, b"tamper me").unwrap();
        for byte in 0..ciphertext.len() {
            for bit in 0..8 {
                let mut corrupt = ciphertext.clone();
                corrupt[byte] ^= 1 << bit;
                assert!(open(&key, &corrupt, &nonce).is_err());
            }
        }
    }

    #[test]
    fn flipped_nonce_bit_fails_auth() {
        let key = random_key();
        let (ciphertext, nonce) = seal(&key, b"tamper me").unwrap();
        let mut corrupt = nonce;
        corrupt[0] ^= 0x01;
        assert!(open(&key, &ciphertext, &corrupt).is_err());
    }

    #[test]
    fn truncated_ciphertext_fails_auth() {
        let key = random_key();
        let (ciphertext, nonce) = seal(&key, b"tamper me").unwrap();
        assert!(open(&key, &ciphertext[..ciphertext.len() - 1], &nonce).is_err());
    }

    #[test]
    fn nonces_are_unique_across_many_seals() {
        let key = random_key();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let (_, nonce) = seal(&key, b"p").unwrap();
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }
}
