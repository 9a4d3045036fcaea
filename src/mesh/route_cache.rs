//! Advisory, TTL-bounded cache over [`super::topology::Topology`] shortest
//! path queries (spec.md §4.6). This never gates the relay decision — the
//! mesh always floods within a packet's TTL cap regardless of what the
//! cache says — it only answers "how far is X from Y" for callers such as
//! diagnostics without re-running BFS on every call.

use crate::identity::PeerId;
use crate::primitives::lru_map::BoundedMap;
use std::time::{Duration, Instant};

type Key = (PeerId, PeerId, u8);

pub struct RouteCache {
    ttl: Duration,
    entries: BoundedMap<Key, (Option<u8>, Instant)>,
}

impl RouteCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { ttl, entries: BoundedMap::new(capacity.max(1)) }
    }

    /// Cached answer for `(src, dst, max_hops)`, `None` if absent or expired.
    pub fn get(&mut self, src: PeerId, dst: PeerId, max_hops: u8, now: Instant) -> Option<Option<u8>> {
        let key = (src, dst, max_hops);
        let (hops, inserted_at) = *self.entries.peek(&key)?;
        if now.duration_since(inserted_at) > self.ttl {
            self.entries.remove(&key);
            return None;
        }
        Some(hops)
    }

    pub fn insert(&mut self, src: PeerId, dst: PeerId, max_hops: u8, hops: Option<u8>, now: Instant) {
        self.entries.insert((src, dst, max_hops), (hops, now));
    }

    /// Drop every entry. Called whenever a topology prune actually removes
    /// a node, since any cached path through it may now be stale.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> PeerId {
        PeerId([b; 32])
    }

    #[test]
    fn hits_before_ttl_expiry_and_misses_after() {
        let mut cache = RouteCache::new(10, Duration::from_secs(5));
        let t0 = Instant::now();
        cache.insert(pid(1), pid(2), 3, Some(2), t0);
        assert_eq!(cache.get(pid(1), pid(2), 3, t0 + Duration::from_secs(1)), Some(Some(2)));
        assert_eq!(cache.get(pid(1), pid(2), 3, t0 + Duration::from_secs(6)), None);
    }

    #[test]
    fn invalidate_clears_everything() {
        let mut cache = RouteCache::new(10, Duration::from_secs(5));
        let now = Instant::now();
        cache.insert(pid(1), pid(2), 3, Some(1), now);
        cache.invalidate();
        assert_eq!(cache.get(pid(1), pid(2), 3, now), None);
    }
}
