//! [`MeshService`]: the relay orchestrator (spec.md §4.6). Wraps a
//! concrete [`Transport`] and is itself a `Transport` — callers drive it
//! exactly like the BLE transport it sits on top of, but every packet
//! that crosses it has passed dedup, signature verification, topology and
//! gossip bookkeeping, and an independent flood-relay decision first.
//!
//! Uses the same `Arc<Inner>` newtype shape as
//! [`crate::transport::ble::BleTransport`]: background tasks (the inbound
//! pipeline, peer-event forwarder, periodic sweep) each hold a real
//! `Arc<Inner>` clone rather than `&self`.

use super::config::MeshConfig;
use super::dedup::Dedup;
use super::gossip::GossipTracker;
use super::payload::{GossipRequest, TopologyAnnouncePayload};
use super::route_cache::RouteCache;
use super::topology::Topology;
use crate::crypto::CryptoSuite;
use crate::identity::{IdentityManager, PeerId};
use crate::packet::{packet_id, MessageType, Packet};
use crate::primitives::lru_map::BoundedMap;
use crate::session::rate_limit::RollingWindow;
use crate::transport::{PeerEvent, PeerEventKind, Result as TransportResult, Transport, TransportError, STREAM_CAPACITY};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, Notify};

struct Inner {
    transport: Arc<dyn Transport>,
    identity: Arc<IdentityManager>,
    suite: CryptoSuite,
    config: MeshConfig,
    running: AtomicBool,
    stop_notify: Notify,
    dedup: Mutex<Dedup>,
    topology: Mutex<Topology>,
    route_cache: Mutex<RouteCache>,
    gossip: Mutex<GossipTracker>,
    recent_packets: Mutex<BoundedMap<String, Packet>>,
    direct_peers: Mutex<HashSet<PeerId>>,
    handshake_source_rate: Mutex<BoundedMap<PeerId, RollingWindow>>,
    app_packets_tx: broadcast::Sender<Packet>,
    peers_tx: broadcast::Sender<PeerEvent>,
}

#[derive(Clone)]
pub struct MeshService(Arc<Inner>);

impl MeshService {
    pub fn new(transport: Arc<dyn Transport>, identity: Arc<IdentityManager>, suite: CryptoSuite, config: MeshConfig) -> Self {
        let (app_packets_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let (peers_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let dedup = Dedup::new(config.dedup_capacity, config.dedup_window);
        let route_cache = RouteCache::new(config.route_cache_capacity, config.route_cache_ttl);
        let gossip = GossipTracker::new(config.gossip_peer_capacity, config.gossip_requests_per_minute);
        let recent_packets = BoundedMap::new(config.dedup_capacity);
        let handshake_source_rate = BoundedMap::new(config.gossip_peer_capacity);

        Self(Arc::new(Inner {
            transport,
            identity,
            suite,
            config,
            running: AtomicBool::new(false),
            stop_notify: Notify::new(),
            dedup: Mutex::new(dedup),
            topology: Mutex::new(Topology::new()),
            route_cache: Mutex::new(route_cache),
            gossip: Mutex::new(gossip),
            recent_packets: Mutex::new(recent_packets),
            direct_peers: Mutex::new(HashSet::new()),
            handshake_source_rate: Mutex::new(handshake_source_rate),
            app_packets_tx,
            peers_tx,
        }))
    }

    /// Build, sign, and flood a `topologyAnnounce` listing our currently
    /// confirmed direct neighbors, truncated to
    /// [`MeshConfig::max_announced_neighbors`].
    pub async fn announce_topology(&self) -> TransportResult<()> {
        let neighbors: Vec<PeerId> = self.0.direct_peers.lock().await.iter().copied().collect();
        let payload = TopologyAnnouncePayload::encode(&neighbors, self.0.config.max_announced_neighbors)
            .ok_or_else(|| TransportError::Radio("failed to encode topology announce payload".into()))?;
        let my_id = self.0.identity.my_peer_id();
        let packet = Packet::new(MessageType::TopologyAnnounce, self.0.config.announce_ttl_cap, my_id, PeerId::BROADCAST, payload)
            .map_err(|e| TransportError::Radio(e.to_string()))?;
        self.broadcast_packet(&packet).await
    }

    /// Currently confirmed direct (one-hop, authenticated) peers.
    pub async fn direct_peers(&self) -> HashSet<PeerId> {
        self.0.direct_peers.lock().await.clone()
    }

    /// Advisory shortest-path query over the confirmed topology graph.
    /// Never gates relaying — purely informational.
    pub async fn route_hops(&self, dst: PeerId, max_hops: u8) -> Option<u8> {
        let my_id = self.0.identity.my_peer_id();
        let now = Instant::now();
        if let Some(cached) = self.0.route_cache.lock().await.get(my_id, dst, max_hops, now) {
            return cached;
        }
        let hops = self.0.topology.lock().await.shortest_path(my_id, dst, max_hops);
        self.0.route_cache.lock().await.insert(my_id, dst, max_hops, hops, now);
        hops
    }
}

impl Inner {
    async fn sign_packet(&self, packet: &Packet) -> TransportResult<Packet> {
        let signable = packet.signable_bytes().map_err(|e| TransportError::Radio(e.to_string()))?;
        let sig = self.identity.sign(&signable).await;
        Ok(packet.clone().with_signature(sig))
    }

    async fn allow_handshake_from(&self, source: PeerId, now: Instant) -> bool {
        let mut rate = self.handshake_source_rate.lock().await;
        if rate.get(&source).is_none() {
            rate.insert(source, RollingWindow::new(self.config.handshake_accept_per_source_per_minute, Duration::from_secs(60)));
        }
        rate.get_mut(&source).expect("just inserted").try_record(now)
    }

    /// Signature verification (spec.md §4.6 step 4): a known signer's
    /// signature must verify or the packet is dropped. An unverifiable
    /// *signed* packet from an unknown signer is accepted only if it's a
    /// bootstrap type (`handshake`/`discovery`/`topologyAnnounce`) and the
    /// sender is a direct authenticated peer; from a multi-hop sender it
    /// is provisionally accepted regardless of type (Open Question: a
    /// later handshake resolving the key never retroactively re-verifies
    /// an already-emitted packet). A packet with *no* signature at all is
    /// only acceptable when it's a bootstrap type.
    async fn verify_signature(&self, packet: &Packet) -> bool {
        let Some(sig) = packet.signature else {
            return packet.msg_type.is_bootstrap();
        };
        let Ok(signable) = packet.signable_bytes() else {
            return false;
        };
        if let Some(known_key) = self.transport.remote_signing_key(packet.source_id) {
            return self.suite.verify(&known_key, &signable, &sig);
        }
        if self.direct_peers.lock().await.contains(&packet.source_id) {
            return packet.msg_type.is_bootstrap();
        }
        true
    }

    async fn store_recent(&self, id: &str, packet: Packet) {
        self.recent_packets.lock().await.insert(id.to_string(), packet);
    }

    async fn jitter_band(&self) -> (Duration, Duration) {
        let degree = self.direct_peers.lock().await.len();
        if degree <= self.config.sparse_degree_max {
            self.config.jitter_sparse
        } else if degree <= self.config.mid_degree_max {
            self.config.jitter_mid
        } else {
            self.config.jitter_dense
        }
    }

    /// Independent relay decision (spec.md §4.6 step 8): broadcast types
    /// are capped at `broadcast_ttl_cap`; directed (non-broadcast `destId`)
    /// packets relay with no type cap, just their own ttl decrementing to
    /// zero. A degree-adaptive jitter wait runs first so nearby nodes
    /// don't all flood the same packet in lockstep; `stop()` cancels any
    /// pending wait.
    async fn maybe_relay(&self, packet: Packet, broadcast_ttl_cap: u8) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if packet.source_id == self.identity.my_peer_id() {
            return;
        }
        let capped_ttl = if packet.is_broadcast() { packet.ttl.min(broadcast_ttl_cap) } else { packet.ttl };
        if capped_ttl == 0 {
            return;
        }

        let (min, max) = self.jitter_band().await;
        let span = max.saturating_sub(min);
        let extra = if span.is_zero() { Duration::ZERO } else { Duration::from_nanos(rand::thread_rng().gen_range(0..=span.as_nanos() as u64)) };
        tokio::select! {
            _ = tokio::time::sleep(min + extra) => {}
            _ = self.stop_notify.notified() => { return; }
        }
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        let mut relayed = packet;
        relayed.ttl = capped_ttl - 1;
        let _ = self.transport.broadcast_packet(&relayed).await;
    }

    async fn handle_gossip_sync(&self, packet: &Packet, now: Instant) {
        let Some(request) = GossipRequest::decode(&packet.payload) else {
            return;
        };
        if request.known_ids.len() > self.config.dedup_capacity * 2 {
            return;
        }
        if !self.gossip.lock().await.allow_request(packet.source_id, now) {
            return;
        }
        let known: HashSet<&String> = request.known_ids.iter().collect();
        let to_send: Vec<Packet> = {
            let recent = self.recent_packets.lock().await;
            recent
                .iter()
                .filter(|(id, _)| !known.contains(id))
                .take(self.config.gossip_max_packets_per_response)
                .map(|(_, p)| p.clone())
                .collect()
        };
        for p in to_send {
            let _ = self.transport.send_packet(&p, packet.source_id).await;
        }
    }

    /// The nine-step inbound pipeline (spec.md §4.6): ignore-self, dedup,
    /// handshake special-case, signature verification, discovery /
    /// topology-announce consumption, gossip-sync serving, app emission,
    /// `recentPackets` bookkeeping (only once every drop decision has
    /// passed, so application-layer drops never leak back into gossip
    /// anti-entropy), and finally the independent relay decision.
    async fn process_inbound(&self, packet: Packet) {
        let my_id = self.identity.my_peer_id();
        if packet.source_id == my_id {
            return;
        }

        let now = Instant::now();
        let id = packet_id(&packet);
        if !self.dedup.lock().await.observe(&id, now) {
            return;
        }

        if packet.msg_type == MessageType::Handshake {
            if self.allow_handshake_from(packet.source_id, now).await {
                self.maybe_relay(packet, self.config.handshake_relay_ttl_cap).await;
            }
            return;
        }

        if !self.verify_signature(&packet).await {
            return;
        }

        match packet.msg_type {
            MessageType::Discovery => {
                self.topology.lock().await.touch(packet.source_id, now);
                self.store_recent(&id, packet.clone()).await;
                self.maybe_relay(packet, self.config.public_message_ttl_cap).await;
                return;
            }
            MessageType::TopologyAnnounce => {
                if let Some(payload) = TopologyAnnouncePayload::decode(&packet.payload) {
                    self.topology.lock().await.update_neighbors(packet.source_id, payload.neighbors, now);
                    self.route_cache.lock().await.invalidate();
                }
                self.store_recent(&id, packet.clone()).await;
                self.maybe_relay(packet, self.config.announce_ttl_cap).await;
                return;
            }
            MessageType::GossipSync => {
                // Anti-entropy request/response, never flooded further.
                self.handle_gossip_sync(&packet, now).await;
                return;
            }
            _ => {}
        }

        if packet.dest_id.is_broadcast() || packet.dest_id == my_id {
            let _ = self.app_packets_tx.send(packet.clone());
        }

        self.store_recent(&id, packet.clone()).await;
        self.maybe_relay(packet, self.config.public_message_ttl_cap).await;
    }
}

async fn run_packet_pipeline(inner: Arc<Inner>) {
    let mut rx = inner.transport.packets();
    loop {
        match rx.recv().await {
            Ok(packet) => inner.process_inbound(packet).await,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
    }
}

async fn run_peer_forwarder(inner: Arc<Inner>) {
    let mut rx = inner.transport.peers();
    loop {
        match rx.recv().await {
            Ok(event) => {
                match (event.kind, event.peer_id) {
                    (PeerEventKind::Authenticated, Some(peer_id)) => {
                        inner.direct_peers.lock().await.insert(peer_id);
                    }
                    (PeerEventKind::Disconnected, Some(peer_id)) => {
                        inner.direct_peers.lock().await.remove(&peer_id);
                    }
                    _ => {}
                }
                let _ = inner.peers_tx.send(event);
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
    }
}

async fn run_sweeps(inner: Arc<Inner>) {
    let mut ticker = tokio::time::interval(inner.config.sweep_interval);
    loop {
        ticker.tick().await;
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }
        let now = Instant::now();
        inner.dedup.lock().await.sweep(now);
        let removed = inner.topology.lock().await.prune(now, inner.config.topology_stale_after);
        if removed {
            inner.route_cache.lock().await.invalidate();
        }
    }
}

#[async_trait]
impl Transport for MeshService {
    async fn start(&self) -> TransportResult<()> {
        if self.0.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.0.transport.start().await {
            self.0.running.store(false, Ordering::SeqCst);
            return Err(e);
        }
        tokio::spawn(run_packet_pipeline(self.0.clone()));
        tokio::spawn(run_peer_forwarder(self.0.clone()));
        tokio::spawn(run_sweeps(self.0.clone()));
        Ok(())
    }

    async fn stop(&self) {
        if !self.0.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.0.stop_notify.notify_waiters();
        self.0.transport.stop().await;
        self.0.direct_peers.lock().await.clear();
    }

    async fn send_packet(&self, packet: &Packet, to: PeerId) -> TransportResult<()> {
        let signed = self.0.sign_packet(packet).await?;
        self.0.transport.send_packet(&signed, to).await
    }

    async fn broadcast_packet(&self, packet: &Packet) -> TransportResult<()> {
        let signed = self.0.sign_packet(packet).await?;
        self.0.transport.broadcast_packet(&signed).await
    }

    fn packets(&self) -> broadcast::Receiver<Packet> {
        self.0.app_packets_tx.subscribe()
    }

    fn peers(&self) -> broadcast::Receiver<PeerEvent> {
        self.0.peers_tx.subscribe()
    }

    fn my_peer_id(&self) -> PeerId {
        self.0.identity.my_peer_id()
    }

    fn remote_signing_key(&self, peer: PeerId) -> Option<[u8; 32]> {
        self.0.transport.remote_signing_key(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    struct FakeTransport {
        my_id: PeerId,
        signing_keys: HashMap<PeerId, [u8; 32]>,
        sent: StdMutex<Vec<(Packet, PeerId)>>,
        broadcasts: StdMutex<Vec<Packet>>,
    }

    impl FakeTransport {
        fn new(my_id: PeerId) -> Self {
            Self {
                my_id,
                signing_keys: HashMap::new(),
                sent: StdMutex::new(Vec::new()),
                broadcasts: StdMutex::new(Vec::new()),
            }
        }

        fn with_known_signer(mut self, peer: PeerId, signing_pub: [u8; 32]) -> Self {
            self.signing_keys.insert(peer, signing_pub);
            self
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn start(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn stop(&self) {}
        async fn send_packet(&self, packet: &Packet, to: PeerId) -> TransportResult<()> {
            self.sent.lock().unwrap().push((packet.clone(), to));
            Ok(())
        }
        async fn broadcast_packet(&self, packet: &Packet) -> TransportResult<()> {
            self.broadcasts.lock().unwrap().push(packet.clone());
            Ok(())
        }
        fn packets(&self) -> broadcast::Receiver<Packet> {
            broadcast::channel(1).1
        }
        fn peers(&self) -> broadcast::Receiver<PeerEvent> {
            broadcast::channel(1).1
        }
        fn my_peer_id(&self) -> PeerId {
            self.my_id
        }
        fn remote_signing_key(&self, peer: PeerId) -> Option<[u8; 32]> {
            self.signing_keys.get(&peer).copied()
        }
    }

    fn zero_jitter_config() -> MeshConfig {
        MeshConfig {
            jitter_sparse: (Duration::ZERO, Duration::ZERO),
            jitter_mid: (Duration::ZERO, Duration::ZERO),
            jitter_dense: (Duration::ZERO, Duration::ZERO),
            ..MeshConfig::default()
        }
    }

    async fn fresh_identity() -> Arc<IdentityManager> {
        let suite = CryptoSuite::new();
        let store: Arc<dyn crate::storage::SecureKvStore> = Arc::new(MemoryKvStore::new());
        Arc::new(IdentityManager::initialize(suite, store).await.unwrap())
    }

    fn service_over(transport: FakeTransport, identity: Arc<IdentityManager>, config: MeshConfig) -> MeshService {
        MeshService::new(Arc::new(transport), identity, CryptoSuite::new(), config)
    }

    fn service_with_fake(transport: FakeTransport, identity: Arc<IdentityManager>, config: MeshConfig) -> (MeshService, Arc<FakeTransport>) {
        let fake = Arc::new(transport);
        let svc = MeshService::new(fake.clone(), identity, CryptoSuite::new(), config);
        (svc, fake)
    }

    fn chat_packet(source: PeerId, dest: PeerId, signature: Option<[u8; 64]>) -> Packet {
        let mut p = Packet::new(MessageType::Chat, 7, source, dest, b"hi".to_vec()).unwrap();
        if let Some(sig) = signature {
            p = p.with_signature(sig);
        }
        p
    }

    #[tokio::test]
    async fn ignores_self_originated_packets() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let svc = service_over(FakeTransport::new(my_id), identity, zero_jitter_config());
        let mut app_rx = svc.packets();

        let packet = chat_packet(my_id, PeerId::BROADCAST, Some([0x11u8; 64]));
        svc.0.process_inbound(packet).await;

        assert!(app_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn drops_duplicate_packets() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([9u8; 32]);
        let svc = service_over(FakeTransport::new(my_id), identity, zero_jitter_config());
        let mut app_rx = svc.packets();

        // Not a direct peer and no known signing key: provisionally accepted
        // regardless of the (junk) signature contents.
        let packet = chat_packet(other, PeerId::BROADCAST, Some([0x22u8; 64]));
        svc.0.process_inbound(packet.clone()).await;
        svc.0.process_inbound(packet).await;

        assert!(app_rx.try_recv().is_ok());
        assert!(app_rx.try_recv().is_err(), "second copy must be deduped");
    }

    #[tokio::test]
    async fn known_signer_must_verify() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let suite = CryptoSuite::new();
        let (signing_pub, signing_secret) = suite.generate_signing_keypair();
        let other = PeerId([3u8; 32]);

        let transport = FakeTransport::new(my_id).with_known_signer(other, signing_pub);
        let svc = service_over(transport, identity, zero_jitter_config());

        let unsigned = chat_packet(other, PeerId::BROADCAST, None);
        let signable = unsigned.signable_bytes().unwrap();
        let sig = suite.sign(&signing_secret, &signable);
        let good = unsigned.clone().with_signature(sig);
        assert!(svc.0.verify_signature(&good).await);

        let mut bad = good.clone();
        bad.signature = Some([0u8; 64]);
        assert!(!svc.0.verify_signature(&bad).await);
    }

    #[tokio::test]
    async fn direct_peer_unknown_signer_only_passes_for_bootstrap_types() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([4u8; 32]);
        let svc = service_over(FakeTransport::new(my_id), identity, zero_jitter_config());
        svc.0.direct_peers.lock().await.insert(other);

        let discovery = Packet::new(MessageType::Discovery, 7, other, PeerId::BROADCAST, vec![])
            .unwrap()
            .with_signature([0u8; 64]);
        assert!(svc.0.verify_signature(&discovery).await);

        let chat = chat_packet(other, PeerId::BROADCAST, Some([0u8; 64]));
        assert!(!svc.0.verify_signature(&chat).await);
    }

    #[tokio::test]
    async fn multihop_unknown_signer_is_provisionally_accepted() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([5u8; 32]);
        let svc = service_over(FakeTransport::new(my_id), identity, zero_jitter_config());

        // `other` is not a direct peer, so the multi-hop branch applies
        // regardless of message type.
        let chat = chat_packet(other, PeerId::BROADCAST, Some([0u8; 64]));
        assert!(svc.0.verify_signature(&chat).await);
    }

    #[tokio::test]
    async fn unsigned_packet_passes_only_for_bootstrap_types() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([6u8; 32]);
        let svc = service_over(FakeTransport::new(my_id), identity, zero_jitter_config());

        let unsigned_chat = chat_packet(other, PeerId::BROADCAST, None);
        assert!(!svc.0.verify_signature(&unsigned_chat).await);

        let unsigned_discovery = Packet::new(MessageType::Discovery, 7, other, PeerId::BROADCAST, vec![]).unwrap();
        assert!(svc.0.verify_signature(&unsigned_discovery).await);
    }

    #[tokio::test]
    async fn relay_caps_broadcast_ttl_and_decrements_before_resend() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([7u8; 32]);
        let (svc, fake) = service_with_fake(FakeTransport::new(my_id), identity, zero_jitter_config());
        svc.0.running.store(true, Ordering::SeqCst);

        let packet = chat_packet(other, PeerId::BROADCAST, Some([0u8; 64]));
        svc.0.maybe_relay(packet, 3).await;

        let broadcasts = fake.broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].ttl, 2);
    }

    #[tokio::test]
    async fn relay_skips_self_originated_and_expired_ttl() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let (svc, fake) = service_with_fake(FakeTransport::new(my_id), identity, zero_jitter_config());
        svc.0.running.store(true, Ordering::SeqCst);

        let mut from_self = chat_packet(my_id, PeerId::BROADCAST, Some([0u8; 64]));
        from_self.ttl = 5;
        svc.0.maybe_relay(from_self, 3).await;
        assert!(fake.broadcasts.lock().unwrap().is_empty());

        let other = PeerId([8u8; 32]);
        let mut expired = chat_packet(other, PeerId::BROADCAST, Some([0u8; 64]));
        expired.ttl = 0;
        svc.0.maybe_relay(expired, 3).await;
        assert!(fake.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_pipeline_emits_and_relays_unknown_multihop_chat() {
        let identity = fresh_identity().await;
        let my_id = identity.my_peer_id();
        let other = PeerId([9u8; 32]);
        let (svc, fake) = service_with_fake(FakeTransport::new(my_id), identity, zero_jitter_config());
        svc.0.running.store(true, Ordering::SeqCst);
        let mut app_rx = svc.packets();

        let mut packet = chat_packet(other, PeerId::BROADCAST, Some([0u8; 64]));
        packet.ttl = 4;
        svc.0.process_inbound(packet).await;

        let emitted = app_rx.try_recv().unwrap();
        assert_eq!(emitted.source_id, other);

        let broadcasts = fake.broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].ttl, 3);
    }
}
