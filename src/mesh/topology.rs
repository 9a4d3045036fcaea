//! Directed neighbor-claim map and BFS shortest-path query (spec.md
//! §4.6): an edge A↔B is only considered valid for routing purposes when
//! both sides claim each other, so a single lying node can't fabricate a
//! phantom link.

use crate::identity::PeerId;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

struct Claim {
    neighbors: HashSet<PeerId>,
    last_seen: Instant,
}

pub struct Topology {
    claims: HashMap<PeerId, Claim>,
}

impl Topology {
    pub fn new() -> Self {
        Self { claims: HashMap::new() }
    }

    /// Replace `node`'s claimed neighbor set (from a `topologyAnnounce`).
    pub fn update_neighbors(&mut self, node: PeerId, neighbors: Vec<PeerId>, now: Instant) {
        self.claims.insert(node, Claim { neighbors: neighbors.into_iter().collect(), last_seen: now });
    }

    /// Bump `node`'s last-seen time without altering its claimed
    /// neighbors (a `discovery` beacon: "I exist", not a topology claim).
    pub fn touch(&mut self, node: PeerId, now: Instant) {
        self.claims.entry(node).or_insert_with(|| Claim { neighbors: HashSet::new(), last_seen: now }).last_seen = now;
    }

    pub fn remove_peer(&mut self, node: &PeerId) {
        self.claims.remove(node);
        for claim in self.claims.values_mut() {
            claim.neighbors.remove(node);
        }
    }

    pub fn reset(&mut self) {
        self.claims.clear();
    }

    /// Drop nodes unseen for `max_age`. Returns `true` if at least one was
    /// removed, so the caller knows to invalidate the route cache.
    pub fn prune(&mut self, now: Instant, max_age: Duration) -> bool {
        let stale: Vec<PeerId> =
            self.claims.iter().filter(|(_, c)| now.duration_since(c.last_seen) >= max_age).map(|(id, _)| *id).collect();
        for id in &stale {
            self.remove_peer(id);
        }
        !stale.is_empty()
    }

    fn bidirectional_neighbors(&self, node: &PeerId) -> Vec<PeerId> {
        match self.claims.get(node) {
            None => Vec::new(),
            Some(claim) => claim
                .neighbors
                .iter()
                .filter(|candidate| self.claims.get(candidate).map(|c| c.neighbors.contains(node)).unwrap_or(false))
                .copied()
                .collect(),
        }
    }

    /// Number of peers `node` has a confirmed bidirectional edge with.
    /// Used to pick a degree-adaptive relay jitter band.
    pub fn degree(&self, node: &PeerId) -> usize {
        self.bidirectional_neighbors(node).len()
    }

    /// BFS shortest path hop count over confirmed bidirectional edges,
    /// capped at `max_hops`. `None` if unreachable within the cap.
    pub fn shortest_path(&self, src: PeerId, dst: PeerId, max_hops: u8) -> Option<u8> {
        if src == dst {
            return Some(0);
        }
        let mut visited = HashSet::new();
        visited.insert(src);
        let mut frontier = vec![src];
        for hop in 1..=max_hops {
            let mut next = Vec::new();
            for node in &frontier {
                for neighbor in self.bidirectional_neighbors(node) {
                    if neighbor == dst {
                        return Some(hop);
                    }
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        None
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(b: u8) -> PeerId {
        PeerId([b; 32])
    }

    #[test]
    fn edge_requires_both_sides_to_claim() {
        let mut t = Topology::new();
        let now = Instant::now();
        t.update_neighbors(pid(1), vec![pid(2)], now);
        // Only one side claims so far: no confirmed edge yet.
        assert_eq!(t.shortest_path(pid(1), pid(2), 3), None);
        t.update_neighbors(pid(2), vec![pid(1)], now);
        assert_eq!(t.shortest_path(pid(1), pid(2), 3), Some(1));
    }

    #[test]
    fn multi_hop_path_found_via_bfs() {
        let mut t = Topology::new();
        let now = Instant::now();
        t.update_neighbors(pid(1), vec![pid(2)], now);
        t.update_neighbors(pid(2), vec![pid(1), pid(3)], now);
        t.update_neighbors(pid(3), vec![pid(2)], now);
        assert_eq!(t.shortest_path(pid(1), pid(3), 3), Some(2));
        assert_eq!(t.shortest_path(pid(1), pid(3), 1), None);
    }

    #[test]
    fn prune_removes_stale_nodes_and_reports_mutation() {
        let mut t = Topology::new();
        let t0 = Instant::now();
        t.update_neighbors(pid(1), vec![pid(2)], t0);
        t.update_neighbors(pid(2), vec![pid(1)], t0);
        let t1 = t0 + Duration::from_secs(61);
        assert!(t.prune(t1, Duration::from_secs(60)));
        assert_eq!(t.shortest_path(pid(1), pid(2), 3), None);
        assert!(!t.prune(t1, Duration::from_secs(60)));
    }

    #[test]
    fn remove_peer_clears_it_from_neighbor_sets() {
        let mut t = Topology::new();
        let now = Instant::now();
        t.update_neighbors(pid(1), vec![pid(2)], now);
        t.update_neighbors(pid(2), vec![pid(1)], now);
        t.remove_peer(&pid(2));
        assert_eq!(t.degree(&pid(1)), 0);
    }
}
