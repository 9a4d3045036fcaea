//! ChaCha20-Poly1305 (IETF, 12-byte nonce) AEAD for the group cipher.
//!
//! Noise transport encryption does *not* go through this module — its
//! counter-derived nonce and zeroize-on-clear discipline live in
//! [`crate::noise::cipher_state`]. This module is the group-symmetric-key
//! path only: fresh random nonce per message, single-byte associated data.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// IETF ChaCha20-Poly1305 nonce length.
pub const NONCE_LEN: usize = 12;
/// Poly1305 tag length, appended by the AEAD implementation.
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadError {
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("ciphertext shorter than nonce + tag")]
    Truncated,
}

pub type Result<T> = std::result::Result<T, AeadError>;

/// Encrypt `plaintext` under `key` with single-byte associated data `ad`.
/// Returns `nonce(12) || ciphertext || tag(16)`.
pub fn encrypt(key: &[u8; 32], ad: u8, plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let payload = chacha20poly1305::aead::Payload {
        msg: plaintext,
        aad: &[ad],
    };
    // A 32-byte key and a freshly generated 12-byte nonce can never fail to
    // encrypt; the only AEAD error variant is tag mismatch, which only
    // occurs on decrypt.
    let ciphertext = cipher
        .encrypt(nonce, payload)
        .expect("chacha20poly1305 encrypt with valid key/nonce cannot fail");

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt a buffer produced by [`encrypt`]. Returns `None` on any
/// authentication failure or malformed input — callers MUST treat `None`
/// as "drop the packet", never as "treat ciphertext as plaintext".
pub fn decrypt(key: &[u8; 32], ad: u8, data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let payload = chacha20poly1305::aead::Payload {
        msg: ciphertext,
        aad: &[ad],
    };
    cipher.decrypt(nonce, payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let ct = encrypt(&key, 0x02, b"hello mesh");
        assert_eq!(decrypt(&key, 0x02, &ct).unwrap(), b"hello mesh");
    }

    #[test]
    fn wrong_key_fails() {
        let key = [7u8; 32];
        let other = [8u8; 32];
        let ct = encrypt(&key, 0x02, b"hello mesh");
        assert!(decrypt(&other, 0x02, &ct).is_none());
    }

    #[test]
    fn wrong_ad_fails() {
        let key = [7u8; 32];
        let ct = encrypt(&key, 0x02, b"hello mesh");
        assert!(decrypt(&key, 0x03, &ct).is_none());
    }

    #[test]
    fn nonces_differ_across_calls() {
        let key = [7u8; 32];
        let a = encrypt(&key, 0x02, b"same plaintext");
        let b = encrypt(&key, 0x02, b"same plaintext");
        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_input_rejected() {
        let key = [7u8; 32];
        assert!(decrypt(&key, 0x02, &[0u8; 4]).is_none());
    }
}
