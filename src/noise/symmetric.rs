//! `SymmetricState`: chaining key + running transcript hash, with an
//! internal sequential cipher for encrypting handshake payloads.
//!
//! Key derivation here is **strict SHA-256** HKDF (HMAC-SHA-256,
//! extract-then-expand with an info-byte counter) — never BLAKE2b, per
//! spec.md §4.3 and Open Question 2. Mixing these up would silently
//! break interop with a spec-compliant peer.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

const PROTOCOL_NAME: &[u8] = b"Noise_XX_25519_ChaChaPoly_SHA256";
type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricError {
    #[error("decrypt-and-hash failed")]
    DecryptFailed,
}

pub type Result<T> = std::result::Result<T, SymmetricError>;

/// HMAC-SHA-256-based HKDF with an empty `info`, producing 2 or 3
/// pseudorandom 32-byte outputs from a chaining key and input key
/// material — exactly Noise's `HKDF(chaining_key, input_material,
/// num_outputs)` construction (RFC 5869 HKDF-Expand with empty `info`
/// reduces to the same output1/output2[/output3] chain).
fn hkdf(chaining_key: &[u8; 32], input_material: &[u8], num_outputs: usize) -> Vec<[u8; 32]> {
    let mut extract = <HmacSha256 as Mac>::new_from_slice(chaining_key).expect("valid key length");
    extract.update(input_material);
    let temp_key = extract.finalize().into_bytes();

    let mut outputs = Vec::with_capacity(num_outputs);
    let mut prev: Vec<u8> = Vec::new();
    for i in 1..=num_outputs {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&temp_key).expect("valid key length");
        mac.update(&prev);
        mac.update(&[i as u8]);
        let out = mac.finalize().into_bytes();
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&out);
        prev = buf.to_vec();
        outputs.push(buf);
    }
    outputs
}

/// Sequential cipher used only inside the handshake (no replay window —
/// handshake messages are strictly ordered and exchanged once). The
/// counter resets to 0 every time `initialize_key` is called, matching
/// Noise's `InitializeKey`.
struct HandshakeCipher {
    key: Option<[u8; 32]>,
    counter: u64,
}

impl HandshakeCipher {
    fn empty() -> Self {
        Self { key: None, counter: 0 }
    }

    fn initialize_key(&mut self, key: [u8; 32]) {
        self.key = Some(key);
        self.counter = 0;
    }

    fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn nonce_for(counter: u64) -> Nonce {
        let mut bytes = [0u8; 12];
        bytes[4..].copy_from_slice(&counter.to_be_bytes());
        *Nonce::from_slice(&bytes)
    }

    fn encrypt_with_ad(&mut self, ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let Some(key) = self.key else {
            return plaintext.to_vec();
        };
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = Self::nonce_for(self.counter);
        let out = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad: ad })
            .expect("chacha20poly1305 encrypt with valid key/nonce cannot fail");
        self.counter += 1;
        out
    }

    fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let Some(key) = self.key else {
            return Ok(ciphertext.to_vec());
        };
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = Self::nonce_for(self.counter);
        let out = cipher
            .decrypt(&nonce, Payload { msg: ciphertext, aad: ad })
            .map_err(|_| SymmetricError::DecryptFailed)?;
        self.counter += 1;
        Ok(out)
    }
}

impl Drop for HandshakeCipher {
    fn drop(&mut self) {
        if let Some(mut k) = self.key.take() {
            k.zeroize();
        }
    }
}

pub struct SymmetricState {
    ck: [u8; 32],
    h: [u8; 32],
    cipher: HandshakeCipher,
}

impl SymmetricState {
    pub fn initialize() -> Self {
        let h = crate::crypto::hash::sha256_strict(PROTOCOL_NAME);
        Self { ck: h, h, cipher: HandshakeCipher::empty() }
    }

    pub fn mix_hash(&mut self, data: &[u8]) {
        let mut buf = Vec::with_capacity(32 + data.len());
        buf.extend_from_slice(&self.h);
        buf.extend_from_slice(data);
        self.h = crate::crypto::hash::sha256_strict(&buf);
    }

    pub fn mix_key(&mut self, input_material: &[u8]) {
        let out = hkdf(&self.ck, input_material, 2);
        self.ck = out[0];
        self.cipher.initialize_key(out[1]);
    }

    pub fn has_key(&self) -> bool {
        self.cipher.has_key()
    }

    /// Encrypt (if keyed) and mix the ciphertext into the transcript hash.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = self.cipher.encrypt_with_ad(&self.h, plaintext);
        self.mix_hash(&ciphertext);
        ciphertext
    }

    /// Decrypt (if keyed) and mix the ciphertext into the transcript hash.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self.cipher.decrypt_with_ad(&self.h, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// Finalize the handshake: derive the two transport keys and zero
    /// the chaining key and hash (spec.md §4.3 "Symmetric split() zeros
    /// chaining key and hash").
    pub fn split(mut self) -> ([u8; 32], [u8; 32]) {
        let out = hkdf(&self.ck, &[], 2);
        self.ck.zeroize();
        self.h.zeroize();
        (out[0], out[1])
    }
}
