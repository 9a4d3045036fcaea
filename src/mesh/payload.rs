//! Wire payloads carried inside `topologyAnnounce` and `gossipSync`
//! packets. Encoded with `bincode`, same as every other on-wire struct in
//! this crate (see `packet::codec`).

use crate::identity::PeerId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyAnnouncePayload {
    pub neighbors: Vec<PeerId>,
}

impl TopologyAnnouncePayload {
    /// Truncates to `max_neighbors` before encoding (spec.md §4.6: outgoing
    /// announcements never list more than 10 neighbors).
    pub fn encode(neighbors: &[PeerId], max_neighbors: usize) -> Option<Vec<u8>> {
        let truncated: Vec<PeerId> = neighbors.iter().take(max_neighbors).copied().collect();
        bincode::serialize(&Self { neighbors: truncated }).ok()
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GossipRequest {
    /// Packet ids the requester already has, so the responder only sends
    /// what's missing.
    pub known_ids: Vec<String>,
}

impl GossipRequest {
    pub fn encode(known_ids: Vec<String>) -> Option<Vec<u8>> {
        bincode::serialize(&Self { known_ids }).ok()
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_payload_round_trips_and_truncates() {
        let neighbors: Vec<PeerId> = (0u8..20).map(|b| PeerId([b; 32])).collect();
        let encoded = TopologyAnnouncePayload::encode(&neighbors, 10).expect("encode");
        let decoded = TopologyAnnouncePayload::decode(&encoded).expect("decode");
        assert_eq!(decoded.neighbors.len(), 10);
        assert_eq!(decoded.neighbors[0], neighbors[0]);
    }

    #[test]
    fn gossip_request_round_trips() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let encoded = GossipRequest::encode(ids.clone()).expect("encode");
        let decoded = GossipRequest::decode(&encoded).expect("decode");
        assert_eq!(decoded.known_ids, ids);
    }
}
