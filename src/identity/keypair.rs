//! Secret-holding keypair wrappers. Both zeroize their backing bytes on
//! drop; neither exposes its private half as a plain copy — `StaticKeypair`
//! only exposes Diffie-Hellman as an operation, `SigningKeypair` only
//! exposes sign-as-operation plus a keyed comparator hash (spec.md §3,
//! §9 "Secret zeroization").

use crate::crypto::CryptoSuite;
use zeroize::Zeroizing;

/// X25519 static identity keypair. Persisted encrypted by the host; the
/// private half never leaves this wrapper as a plain `[u8; 32]`.
pub struct StaticKeypair {
    secret: Zeroizing<[u8; 32]>,
    public: [u8; 32],
}

impl StaticKeypair {
    pub fn generate(suite: &CryptoSuite) -> Self {
        let (public, secret) = suite.generate_static_keypair();
        Self {
            secret: Zeroizing::new(secret),
            public,
        }
    }

    /// Reconstruct from persisted bytes (loaded from the secure KV store).
    pub fn from_bytes(public: [u8; 32], secret: [u8; 32]) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            public,
        }
    }

    pub fn public(&self) -> [u8; 32] {
        self.public
    }

    /// Bytes to persist. Only called from the identity-store save path,
    /// never cached or logged by the caller.
    pub fn secret_bytes_for_storage(&self) -> [u8; 32] {
        *self.secret
    }

    pub fn diffie_hellman(&self, suite: &CryptoSuite, their_public: &[u8; 32]) -> [u8; 32] {
        suite.diffie_hellman(&self.secret, their_public)
    }
}

/// Ed25519 signing keypair, stored as a 64-byte secret (32-byte seed +
/// 32-byte public, matching the persisted wire format in spec.md §6) plus
/// the 32-byte public half. The private half is never exposed as a plain
/// copy outside this wrapper; callers needing to compare keys use
/// [`SigningKeypair::public_key_hash`].
pub struct SigningKeypair {
    secret: Zeroizing<[u8; 64]>,
    public: [u8; 32],
}

impl SigningKeypair {
    pub fn generate(suite: &CryptoSuite) -> Self {
        let (public, seed) = suite.generate_signing_keypair();
        let mut secret = [0u8; 64];
        secret[..32].copy_from_slice(&seed);
        secret[32..].copy_from_slice(&public);
        Self {
            secret: Zeroizing::new(secret),
            public,
        }
    }

    pub fn from_bytes(public: [u8; 32], secret: [u8; 64]) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            public,
        }
    }

    pub fn public(&self) -> [u8; 32] {
        self.public
    }

    pub fn secret_bytes_for_storage(&self) -> [u8; 64] {
        *self.secret
    }

    fn seed(&self) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&self.secret[..32]);
        seed
    }

    pub fn sign(&self, suite: &CryptoSuite, data: &[u8]) -> [u8; 64] {
        suite.sign(&self.seed(), data)
    }

    /// BLAKE2b-256 of the public key, used as a keyed comparator where a
    /// cache needs to key on "this signing identity" without holding a
    /// plain copy of secret material (there is none to hold here — this
    /// hashes the *public* half, which is the documented pattern for
    /// signing-key caches per spec.md §9).
    pub fn public_key_hash(&self, suite: &CryptoSuite) -> [u8; 32] {
        suite.blake2b_256(&self.public)
    }
}
