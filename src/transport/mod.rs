//! Radio-agnostic transport boundary (spec.md §4.5): a `Transport` trait
//! that the mesh service (§4.6) drives, and the one concrete
//! implementation in scope, [`ble::BleTransport`].
//!
//! The trait itself carries no BLE vocabulary — `send_packet`,
//! `broadcast_packet`, `packets()`, `peers()` — so a future non-BLE
//! radio (declared out of scope per spec.md §1 Non-goals, but not
//! precluded by the type system) could implement it without touching
//! [`crate::mesh`].

pub mod ble;

use crate::identity::PeerId;
use crate::packet::Packet;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no established session for this peer")]
    NoSession,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("radio error: {0}")]
    Radio(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A connection-state change for one device, delivered on
/// [`Transport::peers`]. `device_id` is the opaque radio-layer identity;
/// `peer_id` is populated once Noise authentication completes.
#[derive(Clone, Debug)]
pub struct PeerEvent {
    pub device_id: String,
    pub peer_id: Option<PeerId>,
    pub kind: PeerEventKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerEventKind {
    Connected,
    Authenticated,
    Disconnected,
}

/// Bound applied to every `packets()`/`peers()` broadcast channel (spec.md
/// §5 "Streams are backpressure-tolerant broadcast channels; slow
/// subscribers are dropped if they fall behind a bounded queue rather
/// than blocking the producer").
pub const STREAM_CAPACITY: usize = 256;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Bring the transport up. Idempotent: calling `start` while already
    /// started is a no-op success. On partial failure every resource
    /// acquired so far is torn down before the error is returned
    /// (spec.md §4.5 "Cleanup discipline").
    async fn start(&self) -> Result<()>;

    /// Tear the transport down. Idempotent. Flips the shared `running`
    /// flag before awaiting any in-flight work so relay jitter and scan
    /// loops observe it and exit without emitting (spec.md §5
    /// "Cancellation semantics").
    async fn stop(&self);

    /// Send one packet to a specific authenticated peer, Noise-encrypting
    /// it first. Returns [`TransportError::NoSession`] if no session is
    /// established, never silently drops.
    async fn send_packet(&self, packet: &Packet, to: PeerId) -> Result<()>;

    /// Send to every authenticated peer, each Noise-encrypted per
    /// recipient (spec.md §4.5 "each transmission is Noise-encrypted per
    /// recipient before the radio write").
    async fn broadcast_packet(&self, packet: &Packet) -> Result<()>;

    /// Stream of decoded inbound application-layer packets. Mesh-internal
    /// packet types (handshake, discovery, topology, gossip) never
    /// appear here — the mesh service consumes them silently.
    fn packets(&self) -> broadcast::Receiver<Packet>;

    /// Stream of connection-state snapshots.
    fn peers(&self) -> broadcast::Receiver<PeerEvent>;

    fn my_peer_id(&self) -> PeerId;

    /// The Ed25519 signing key learned from `peer`'s Noise handshake, if
    /// `peer` is (or recently was) a direct, authenticated link. Mesh-layer
    /// signature verification (spec.md §4.6 step 4) consults this before
    /// falling back to the bootstrap-type unknown-signer exception.
    fn remote_signing_key(&self, peer: PeerId) -> Option<[u8; 32]>;
}
