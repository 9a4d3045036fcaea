//! [`PeerId`]: stable 32-byte BLAKE2b hash of a peer's X25519 static
//! public key.

use crate::primitives::{constant_time::eq_32, encoding::to_hex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A peer's stable identity, derived once at identity init and never
/// recomputed. Content-addressed: equality and hashing are over the raw
/// bytes, not pointer identity.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    pub fn from_static_public(suite: &crate::crypto::CryptoSuite, static_pub: &[u8; 32]) -> Self {
        Self(suite.peer_id_from_static_pub(static_pub))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = crate::primitives::encoding::from_hex(s)?;
        Some(Self(bytes.try_into().ok()?))
    }

    /// The all-zero id used as the `destId` of a broadcast packet.
    pub const BROADCAST: PeerId = PeerId([0u8; 32]);

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl PartialEq for PeerId {
    fn eq(&self, other: &Self) -> bool {
        eq_32(&self.0, &other.0)
    }
}
impl Eq for PeerId {}

impl std::hash::Hash for PeerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_form_is_64_lowercase_chars() {
        let id = PeerId([0xABu8; 32]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
    }

    #[test]
    fn hex_round_trips() {
        let id = PeerId([0x01u8; 32]);
        let parsed = PeerId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn broadcast_is_all_zero() {
        assert!(PeerId::BROADCAST.is_broadcast());
        assert!(!PeerId([1u8; 32]).is_broadcast());
    }

    #[test]
    fn derivation_uses_blake2b_of_static_pub() {
        let suite = crate::crypto::CryptoSuite::new();
        let (pub_key, _) = suite.generate_static_keypair();
        let id = PeerId::from_static_public(&suite, &pub_key);
        assert_eq!(id.0, suite.blake2b_256(&pub_key));
    }
}
