//! Time-and-LRU-bounded packet deduplicator (spec.md §4.6): the second
//! observation of a `packet_id` within the window is dropped. Grounded on
//! the teacher's `network/tor_dos_protection.rs` bounded-map-plus-sweep
//! idiom.

use crate::primitives::lru_map::BoundedMap;
use std::time::{Duration, Instant};

pub struct Dedup {
    capacity: usize,
    window: Duration,
    seen: BoundedMap<String, Instant>,
}

impl Dedup {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self { capacity, window, seen: BoundedMap::new(capacity.max(1)) }
    }

    /// `true` if `id` has not been observed within `window`; records it as
    /// seen either way an observation is made (a re-observation after
    /// expiry is treated as fresh).
    pub fn observe(&mut self, id: &str, now: Instant) -> bool {
        if let Some(seen_at) = self.seen.peek(&id.to_string()) {
            if now.duration_since(*seen_at) <= self.window {
                return false;
            }
        }
        if self.seen.len() >= self.capacity {
            self.compact(now);
        }
        self.seen.insert(id.to_string(), now);
        true
    }

    /// Drop every entry older than `window`. Run periodically so memory
    /// doesn't accumulate purely time-expired entries between inserts.
    pub fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.seen.retain_evicting(|_, seen_at| now.duration_since(*seen_at) <= window);
    }

    /// Sweep first; if still at capacity, compact down to 25% of capacity
    /// by evicting the least-recently-used entries (spec.md §4.6
    /// "compacts to 25% of capacity when full or on periodic sweep").
    fn compact(&mut self, now: Instant) {
        self.sweep(now);
        let target = (self.capacity / 4).max(1);
        while self.seen.len() > target {
            if self.seen.pop_lru().is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_observation_within_window_is_duplicate() {
        let mut dedup = Dedup::new(16, Duration::from_secs(300));
        let now = Instant::now();
        assert!(dedup.observe("a", now));
        assert!(!dedup.observe("a", now));
    }

    #[test]
    fn observation_after_window_expiry_is_fresh() {
        let mut dedup = Dedup::new(16, Duration::from_millis(10));
        let t0 = Instant::now();
        assert!(dedup.observe("a", t0));
        let t1 = t0 + Duration::from_millis(20);
        assert!(dedup.observe("a", t1));
    }

    #[test]
    fn compacts_to_quarter_capacity_when_full() {
        let mut dedup = Dedup::new(8, Duration::from_secs(300));
        let now = Instant::now();
        for i in 0..8 {
            assert!(dedup.observe(&format!("id-{i}"), now));
        }
        assert!(dedup.observe("id-new", now));
        assert!(dedup.seen.len() <= 3);
    }
}
