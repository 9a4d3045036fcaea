//! Hash functions. BLAKE2b-256 is used everywhere a peer-id or group-id is
//! derived from other key material; strict SHA-256 is used *only* inside
//! the Noise engine's HKDF, per spec — the two are never interchangeable,
//! and mixing them up would silently break interop with a spec-compliant
//! peer (see SPEC_FULL.md Open Question 2).

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

/// BLAKE2b with 256-bit output. Used for peer-id and group-id derivation.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// Strict SHA-256. Only ever called from `noise::symmetric` — do not reach
/// for this outside the Noise engine.
pub fn sha256_strict(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_is_deterministic() {
        assert_eq!(blake2b_256(b"peer-static-pub"), blake2b_256(b"peer-static-pub"));
    }

    #[test]
    fn blake2b_and_sha256_diverge() {
        assert_ne!(blake2b_256(b"x"), sha256_strict(b"x"));
    }

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256("abc")
        let expected = hex_literal::hex!(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha256_strict(b"abc"), expected);
    }
}
