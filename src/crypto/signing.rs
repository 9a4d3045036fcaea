//! Ed25519 signatures: packet authentication and post-handshake signer
//! bootstrapping.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid signature encoding")]
    InvalidSignature,
}

pub type Result<T> = std::result::Result<T, SigningError>;

/// Generate a fresh Ed25519 keypair: `(public, secret)`, both 32 bytes.
pub fn generate_keypair() -> ([u8; 32], [u8; 32]) {
    let signing_key = SigningKey::generate(&mut OsRng);
    (signing_key.verifying_key().to_bytes(), signing_key.to_bytes())
}

/// Sign `data` with a 32-byte Ed25519 secret key.
pub fn sign(secret_key: &[u8; 32], data: &[u8]) -> [u8; 64] {
    let signing_key = SigningKey::from_bytes(secret_key);
    signing_key.sign(data).to_bytes()
}

/// Verify a detached Ed25519 signature. Fails closed: any malformed
/// public key or signature bytes returns `false`, never panics.
pub fn verify(public_key: &[u8; 32], data: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(data, &sig).is_ok()
}

/// Derive the Ed25519 public key from a 32-byte secret key.
pub fn derive_public_key(secret_key: &[u8; 32]) -> [u8; 32] {
    SigningKey::from_bytes(secret_key).verifying_key().to_bytes()
}
