//! End-to-end multi-hop relay: A and C never connect directly, only
//! through B, and a broadcast chat packet from A must still reach C's
//! application layer, relayed once by B (spec.md §4.6, §8).
//!
//! The bus below stands in for a completed Noise transport: each node's
//! `remote_signing_key` only knows the signing keys of its own direct
//! neighbors, exactly as if those links had each run their own
//! handshake. A and C share no such link, so C only accepts A's relayed
//! packet through the multi-hop provisional-accept path.

use async_trait::async_trait;
use driftmesh::identity::{IdentityManager, PeerId};
use driftmesh::mesh::{MeshConfig, MeshService};
use driftmesh::packet::{MessageType, Packet};
use driftmesh::storage::{MemoryKvStore, SecureKvStore};
use driftmesh::transport::{PeerEvent, PeerEventKind, Result as TransportResult, Transport};
use driftmesh::CryptoSuite;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct NodeChannels {
    packets_tx: broadcast::Sender<Packet>,
    peers_tx: broadcast::Sender<PeerEvent>,
}

struct BusTransport {
    my_id: PeerId,
    neighbors: HashSet<PeerId>,
    signing_keys: HashMap<PeerId, [u8; 32]>,
    registry: Arc<HashMap<PeerId, NodeChannels>>,
}

#[async_trait]
impl Transport for BusTransport {
    async fn start(&self) -> TransportResult<()> {
        // Announce each direct neighbor as authenticated, retrying briefly
        // so the send lands after `MeshService::start` has subscribed.
        let my_id = self.my_id;
        let registry = self.registry.clone();
        let neighbors: Vec<PeerId> = self.neighbors.iter().copied().collect();
        tokio::spawn(async move {
            let my_peers_tx = &registry[&my_id].peers_tx;
            for _ in 0..8 {
                for n in &neighbors {
                    let _ = my_peers_tx.send(PeerEvent {
                        device_id: n.to_hex(),
                        peer_id: Some(*n),
                        kind: PeerEventKind::Authenticated,
                    });
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        });
        Ok(())
    }

    async fn stop(&self) {}

    async fn send_packet(&self, packet: &Packet, to: PeerId) -> TransportResult<()> {
        if self.neighbors.contains(&to) {
            let _ = self.registry[&to].packets_tx.send(packet.clone());
        }
        Ok(())
    }

    async fn broadcast_packet(&self, packet: &Packet) -> TransportResult<()> {
        for n in &self.neighbors {
            let _ = self.registry[n].packets_tx.send(packet.clone());
        }
        Ok(())
    }

    fn packets(&self) -> broadcast::Receiver<Packet> {
        self.registry[&self.my_id].packets_tx.subscribe()
    }

    fn peers(&self) -> broadcast::Receiver<PeerEvent> {
        self.registry[&self.my_id].peers_tx.subscribe()
    }

    fn my_peer_id(&self) -> PeerId {
        self.my_id
    }

    fn remote_signing_key(&self, peer: PeerId) -> Option<[u8; 32]> {
        self.signing_keys.get(&peer).copied()
    }
}

async fn new_identity() -> Arc<IdentityManager> {
    let suite = CryptoSuite::new();
    let store: Arc<dyn SecureKvStore> = Arc::new(MemoryKvStore::new());
    Arc::new(IdentityManager::initialize(suite, store).await.unwrap())
}

#[tokio::test]
async fn broadcast_from_a_reaches_c_only_through_b() {
    let alice = new_identity().await;
    let bob = new_identity().await;
    let carol = new_identity().await;

    let alice_id = alice.my_peer_id();
    let bob_id = bob.my_peer_id();
    let carol_id = carol.my_peer_id();

    let alice_signing = alice.signing_public_key().await;
    let bob_signing = bob.signing_public_key().await;
    let carol_signing = carol.signing_public_key().await;

    let mut registry = HashMap::new();
    for id in [alice_id, bob_id, carol_id] {
        let (packets_tx, _) = broadcast::channel(64);
        let (peers_tx, _) = broadcast::channel(64);
        registry.insert(id, NodeChannels { packets_tx, peers_tx });
    }
    let registry = Arc::new(registry);

    // A <-> B <-> C; A and C are never direct neighbors.
    let alice_transport = BusTransport {
        my_id: alice_id,
        neighbors: [bob_id].into_iter().collect(),
        signing_keys: [(bob_id, bob_signing)].into_iter().collect(),
        registry: registry.clone(),
    };
    let bob_transport = BusTransport {
        my_id: bob_id,
        neighbors: [alice_id, carol_id].into_iter().collect(),
        signing_keys: [(alice_id, alice_signing), (carol_id, carol_signing)].into_iter().collect(),
        registry: registry.clone(),
    };
    let carol_transport = BusTransport {
        my_id: carol_id,
        neighbors: [bob_id].into_iter().collect(),
        signing_keys: [(bob_id, bob_signing)].into_iter().collect(),
        registry,
    };

    let alice_svc = MeshService::new(Arc::new(alice_transport), alice, CryptoSuite::new(), MeshConfig::default());
    let bob_svc = MeshService::new(Arc::new(bob_transport), bob, CryptoSuite::new(), MeshConfig::default());
    let carol_svc = MeshService::new(Arc::new(carol_transport), carol, CryptoSuite::new(), MeshConfig::default());

    alice_svc.start().await.unwrap();
    bob_svc.start().await.unwrap();
    carol_svc.start().await.unwrap();

    // Let the peer-authenticated announcements land before sending.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut carol_rx = carol_svc.packets();
    let mut bob_rx = bob_svc.packets();

    let packet = Packet::new(MessageType::Chat, 7, alice_id, PeerId::BROADCAST, b"hello from alice".to_vec()).unwrap();
    alice_svc.broadcast_packet(&packet).await.unwrap();

    let at_bob = tokio::time::timeout(Duration::from_secs(2), bob_rx.recv())
        .await
        .expect("bob must see the broadcast directly")
        .unwrap();
    assert_eq!(at_bob.source_id, alice_id);
    assert_eq!(at_bob.payload, b"hello from alice");

    let at_carol = tokio::time::timeout(Duration::from_secs(2), carol_rx.recv())
        .await
        .expect("carol must see the relayed broadcast via bob")
        .unwrap();
    assert_eq!(at_carol.source_id, alice_id);
    assert_eq!(at_carol.payload, b"hello from alice");

    alice_svc.stop().await;
    bob_svc.stop().await;
    carol_svc.stop().await;
}

#[tokio::test]
async fn duplicate_relayed_copies_are_deduped_at_each_hop() {
    let alice = new_identity().await;
    let bob = new_identity().await;
    let alice_id = alice.my_peer_id();
    let bob_id = bob.my_peer_id();
    let alice_signing = alice.signing_public_key().await;
    let bob_signing = bob.signing_public_key().await;

    let mut registry = HashMap::new();
    for id in [alice_id, bob_id] {
        let (packets_tx, _) = broadcast::channel(64);
        let (peers_tx, _) = broadcast::channel(64);
        registry.insert(id, NodeChannels { packets_tx, peers_tx });
    }
    let registry = Arc::new(registry);

    let alice_transport = BusTransport {
        my_id: alice_id,
        neighbors: [bob_id].into_iter().collect(),
        signing_keys: [(bob_id, bob_signing)].into_iter().collect(),
        registry: registry.clone(),
    };
    let bob_transport = BusTransport {
        my_id: bob_id,
        neighbors: [alice_id].into_iter().collect(),
        signing_keys: [(alice_id, alice_signing)].into_iter().collect(),
        registry,
    };

    let alice_svc = MeshService::new(Arc::new(alice_transport), alice, CryptoSuite::new(), MeshConfig::default());
    let bob_svc = MeshService::new(Arc::new(bob_transport), bob, CryptoSuite::new(), MeshConfig::default());

    alice_svc.start().await.unwrap();
    bob_svc.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut bob_rx = bob_svc.packets();
    let packet = Packet::new(MessageType::Chat, 7, alice_id, PeerId::BROADCAST, b"once only".to_vec()).unwrap();

    // Same packet, injected twice straight onto the wire: identical
    // source/timestamp/type/flags/signature collapse to one dedup key.
    alice_svc.broadcast_packet(&packet).await.unwrap();
    alice_svc.broadcast_packet(&packet).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), bob_rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.payload, b"once only");
    assert!(
        tokio::time::timeout(Duration::from_millis(300), bob_rx.recv()).await.is_err(),
        "second copy must be deduped, not re-emitted"
    );

    alice_svc.stop().await;
    bob_svc.stop().await;
}
