//! Cryptographic primitives: X25519 DH, ChaCha20-Poly1305 AEAD, Ed25519
//! signatures, Argon2id KDF, BLAKE2b-256 and strict SHA-256 hashing, all
//! reached through a single [`CryptoSuite`] handle rather than as free
//! functions over an ambient global — see the crate's DESIGN.md for why
//! this replaces the teacher's `once_cell`-singleton pattern.

pub mod aead;
pub mod dh;
pub mod hash;
pub mod kdf;
pub mod signing;
pub mod suite;

pub use aead::{AeadError, NONCE_LEN};
pub use dh::DhError;
pub use hash::{blake2b_256, sha256_strict};
pub use kdf::{Argon2Params, KdfError};
pub use signing::SigningError;
pub use suite::CryptoSuite;
