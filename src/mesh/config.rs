//! Mesh service tunables (spec.md §4.6), pulled into one config struct
//! with a `Default` matching the spec's constants — same pattern as
//! [`crate::transport::ble::BleConfig`].

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct MeshConfig {
    pub dedup_capacity: usize,
    pub dedup_window: Duration,

    /// A topology node is dropped if unseen for this long.
    pub topology_stale_after: Duration,

    pub route_cache_capacity: usize,
    pub route_cache_ttl: Duration,

    /// LRU cap on tracked gossip-request peers.
    pub gossip_peer_capacity: usize,
    /// Gossip requests a single peer may issue per rolling minute. Not
    /// given an exact figure in spec.md; chosen to mirror the per-device
    /// handshake-attempt rate limit pattern (see DESIGN.md).
    pub gossip_requests_per_minute: u32,
    /// Packets served per gossip-sync request.
    pub gossip_max_packets_per_response: usize,

    /// Mesh-layer handshake-type acceptance cap, per source, per minute.
    pub handshake_accept_per_source_per_minute: u32,
    /// Effective TTL ceiling applied when relaying handshake-type packets.
    pub handshake_relay_ttl_cap: u8,

    /// Broadcast TTL cap for `topologyAnnounce`.
    pub announce_ttl_cap: u8,
    /// Broadcast TTL cap for every other public (broadcast) message type.
    pub public_message_ttl_cap: u8,

    /// Degree-adaptive jitter bands: (min, max) per density tier.
    pub jitter_sparse: (Duration, Duration),
    pub jitter_mid: (Duration, Duration),
    pub jitter_dense: (Duration, Duration),
    /// Direct-peer counts at/under which the sparse/mid bands apply;
    /// above `mid_degree_max` the dense band applies.
    pub sparse_degree_max: usize,
    pub mid_degree_max: usize,

    /// How often the dedup/topology sweep runs.
    pub sweep_interval: Duration,

    /// Outgoing topology announcements never list more than this many
    /// neighbors (spec.md §4.6 "truncate neighbor lists to 10 entries").
    pub max_announced_neighbors: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: 1024,
            dedup_window: Duration::from_secs(300),
            topology_stale_after: Duration::from_secs(60),
            route_cache_capacity: 500,
            route_cache_ttl: Duration::from_secs(5),
            gossip_peer_capacity: 200,
            gossip_requests_per_minute: 5,
            gossip_max_packets_per_response: 20,
            handshake_accept_per_source_per_minute: 3,
            handshake_relay_ttl_cap: 3,
            announce_ttl_cap: 7,
            public_message_ttl_cap: 6,
            jitter_sparse: (Duration::from_millis(10), Duration::from_millis(25)),
            jitter_mid: (Duration::from_millis(60), Duration::from_millis(150)),
            jitter_dense: (Duration::from_millis(100), Duration::from_millis(220)),
            sparse_degree_max: 2,
            mid_degree_max: 6,
            sweep_interval: Duration::from_secs(30),
            max_announced_neighbors: 10,
        }
    }
}
