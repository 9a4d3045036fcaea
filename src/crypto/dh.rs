//! X25519 Diffie-Hellman: static keypairs and shared-secret derivation
//! for identity keys and Noise handshake DH operations.

use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhError {
    #[error("invalid key length")]
    InvalidKeyLength,
}

pub type Result<T> = std::result::Result<T, DhError>;

/// Generate a static X25519 keypair: `(public, secret)`.
pub fn generate_static_keypair() -> ([u8; 32], [u8; 32]) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    (public.to_bytes(), secret.to_bytes())
}

/// Derive the X25519 shared secret between our secret key and their public key.
pub fn diffie_hellman(our_secret: &[u8; 32], their_public: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*our_secret);
    let public = PublicKey::from(*their_public);
    secret.diffie_hellman(&public).to_bytes()
}

/// Derive the X25519 public key matching a secret key.
pub fn derive_public_key(secret: &[u8; 32]) -> [u8; 32] {
    PublicKey::from(&StaticSecret::from(*secret)).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dh_agrees_both_directions() {
        let (a_pub, a_sec) = generate_static_keypair();
        let (b_pub, b_sec) = generate_static_keypair();
        assert_eq!(
            diffie_hellman(&a_sec, &b_pub),
            diffie_hellman(&b_sec, &a_pub)
        );
    }

    #[test]
    fn derive_public_key_matches_generated() {
        let (public, secret) = generate_static_keypair();
        assert_eq!(derive_public_key(&secret), public);
    }
}
