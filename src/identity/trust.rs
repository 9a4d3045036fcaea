//! Bounded trusted-peer set, persisted as a JSON array of hex peer ids
//! (spec.md §6 `trusted_peers_v1`, load-capped at 500).

use super::peer_id::PeerId;
use std::collections::HashSet;

pub const MAX_TRUSTED_PEERS: usize = 500;

#[derive(Default)]
pub struct TrustedPeerSet {
    peers: HashSet<PeerId>,
}

impl TrustedPeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON array of hex peer ids, capping at
    /// [`MAX_TRUSTED_PEERS`] and silently dropping any entry that doesn't
    /// parse (a corrupted entry is "absent", per spec.md §6).
    pub fn from_json(raw: &str) -> Self {
        let hex_ids: Vec<String> = serde_json::from_str(raw).unwrap_or_default();
        let peers = hex_ids
            .into_iter()
            .filter_map(|h| PeerId::from_hex(&h))
            .take(MAX_TRUSTED_PEERS)
            .collect();
        Self { peers }
    }

    pub fn to_json(&self) -> String {
        let hex_ids: Vec<String> = self.peers.iter().map(|p| p.to_hex()).collect();
        serde_json::to_string(&hex_ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Insert a peer, dropping the attempt once at capacity rather than
    /// evicting an existing trust entry — trust is an explicit grant, not
    /// an LRU cache.
    pub fn trust(&mut self, peer: PeerId) -> bool {
        if self.peers.contains(&peer) {
            return true;
        }
        if self.peers.len() >= MAX_TRUSTED_PEERS {
            return false;
        }
        self.peers.insert(peer);
        true
    }

    pub fn untrust(&mut self, peer: &PeerId) {
        self.peers.remove(peer);
    }

    pub fn is_trusted(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_and_check() {
        let mut set = TrustedPeerSet::new();
        let peer = PeerId([3u8; 32]);
        assert!(!set.is_trusted(&peer));
        assert!(set.trust(peer));
        assert!(set.is_trusted(&peer));
    }

    #[test]
    fn json_round_trips() {
        let mut set = TrustedPeerSet::new();
        set.trust(PeerId([1u8; 32]));
        set.trust(PeerId([2u8; 32]));
        let json = set.to_json();
        let restored = TrustedPeerSet::from_json(&json);
        assert_eq!(restored.len(), 2);
        assert!(restored.is_trusted(&PeerId([1u8; 32])));
    }

    #[test]
    fn caps_at_500_on_load() {
        let ids: Vec<String> = (0..600u32)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[..4].copy_from_slice(&i.to_be_bytes());
                PeerId(bytes).to_hex()
            })
            .collect();
        let json = serde_json::to_string(&ids).unwrap();
        let set = TrustedPeerSet::from_json(&json);
        assert_eq!(set.len(), MAX_TRUSTED_PEERS);
    }

    #[test]
    fn corrupted_json_is_treated_as_empty() {
        let set = TrustedPeerSet::from_json("not json at all");
        assert!(set.is_empty());
    }

    #[test]
    fn untrust_removes() {
        let mut set = TrustedPeerSet::new();
        let peer = PeerId([9u8; 32]);
        set.trust(peer);
        set.untrust(&peer);
        assert!(!set.is_trusted(&peer));
    }
}
