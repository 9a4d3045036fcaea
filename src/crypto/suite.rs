//! [`CryptoSuite`]: the single explicit handle through which every other
//! layer reaches cryptography. Replaces the teacher's free-function /
//! implicit-`OsRng` style with one struct so call sites never reach for an
//! ambient global (see SPEC_FULL.md §9 "long-lived globals").
//!
//! `CryptoSuite` itself is stateless (every operation is a pure function
//! over its arguments); it exists as a type so `identity`, `group`,
//! `noise`, and `mesh` all take `&CryptoSuite` in their constructors
//! instead of calling `crypto::aead::encrypt` directly, making the
//! dependency explicit and swappable in tests.

use super::{aead, dh, hash, kdf, signing};
use crate::primitives::constant_time::eq_64;

/// Initialized once at process start (see `lib.rs::init`) and passed down
/// to every component that needs cryptography.
#[derive(Clone, Copy, Debug, Default)]
pub struct CryptoSuite;

impl CryptoSuite {
    pub fn new() -> Self {
        Self
    }

    // ---- X25519 ---------------------------------------------------
    pub fn generate_static_keypair(&self) -> ([u8; 32], [u8; 32]) {
        dh::generate_static_keypair()
    }

    pub fn diffie_hellman(&self, our_secret: &[u8; 32], their_public: &[u8; 32]) -> [u8; 32] {
        dh::diffie_hellman(our_secret, their_public)
    }

    // ---- Ed25519 ----------------------------------------------------
    pub fn generate_signing_keypair(&self) -> ([u8; 32], [u8; 32]) {
        signing::generate_keypair()
    }

    pub fn sign(&self, secret_key: &[u8; 32], data: &[u8]) -> [u8; 64] {
        signing::sign(secret_key, data)
    }

    pub fn verify(&self, public_key: &[u8; 32], data: &[u8], signature: &[u8; 64]) -> bool {
        signing::verify(public_key, data, signature)
    }

    /// Constant-time signature comparison, for equality checks that are
    /// not themselves a verify (e.g. dedup of retransmitted signed
    /// envelopes). Never used as a substitute for `verify`.
    pub fn signatures_equal(&self, a: &[u8; 64], b: &[u8; 64]) -> bool {
        eq_64(a, b)
    }

    // ---- Group AEAD ---------------------------------------------------
    pub fn group_encrypt(&self, key: &[u8; 32], ad: u8, plaintext: &[u8]) -> Vec<u8> {
        aead::encrypt(key, ad, plaintext)
    }

    pub fn group_decrypt(&self, key: &[u8; 32], ad: u8, data: &[u8]) -> Option<Vec<u8>> {
        aead::decrypt(key, ad, data)
    }

    // ---- KDF ------------------------------------------------------
    pub fn derive_group_key(
        &self,
        passphrase: &str,
        salt: &[u8; 16],
    ) -> kdf::Result<([u8; 32], [u8; 32])> {
        let key = kdf::derive_key(passphrase, salt, kdf::Argon2Params::default())?;
        let id = hash::blake2b_256(&key);
        Ok((key, id))
    }

    pub fn generate_group_salt(&self) -> [u8; 16] {
        kdf::generate_salt()
    }

    pub fn encode_join_code(&self, salt: &[u8; 16]) -> String {
        kdf::encode_join_code(salt)
    }

    pub fn decode_join_code(&self, code: &str) -> Option<[u8; 16]> {
        kdf::decode_join_code(code)
    }

    // ---- Hashing ----------------------------------------------------
    pub fn peer_id_from_static_pub(&self, static_pub: &[u8; 32]) -> [u8; 32] {
        hash::blake2b_256(static_pub)
    }

    pub fn blake2b_256(&self, data: &[u8]) -> [u8; 32] {
        hash::blake2b_256(data)
    }
}
