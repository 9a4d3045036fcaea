//! Per-peer rate limiting for inbound `gossipSync` requests (spec.md
//! §4.6), same rolling-window idiom as
//! [`crate::session::rate_limit::RollingWindow`].

use crate::identity::PeerId;
use crate::primitives::lru_map::BoundedMap;
use crate::session::rate_limit::RollingWindow;
use std::time::{Duration, Instant};

pub struct GossipTracker {
    per_peer_limit: u32,
    peers: BoundedMap<PeerId, RollingWindow>,
}

impl GossipTracker {
    pub fn new(peer_capacity: usize, per_peer_limit: u32) -> Self {
        Self { per_peer_limit, peers: BoundedMap::new(peer_capacity.max(1)) }
    }

    /// `true` if `peer` may make another gossip-sync request right now.
    pub fn allow_request(&mut self, peer: PeerId, now: Instant) -> bool {
        if self.peers.get(&peer).is_none() {
            self.peers.insert(peer, RollingWindow::new(self.per_peer_limit, Duration::from_secs(60)));
        }
        self.peers.get_mut(&peer).expect("just inserted").try_record(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> PeerId {
        PeerId([b; 32])
    }

    #[test]
    fn caps_requests_per_peer_per_minute() {
        let mut tracker = GossipTracker::new(10, 2);
        let now = Instant::now();
        assert!(tracker.allow_request(pid(1), now));
        assert!(tracker.allow_request(pid(1), now));
        assert!(!tracker.allow_request(pid(1), now));
    }

    #[test]
    fn peers_tracked_independently() {
        let mut tracker = GossipTracker::new(10, 1);
        let now = Instant::now();
        assert!(tracker.allow_request(pid(1), now));
        assert!(tracker.allow_request(pid(2), now));
    }
}
