//! The outer, single-link wire envelope every BLE write carries.
//!
//! Two message types ever appear as an *outer* envelope: `Handshake`
//! (raw Noise XX handshake-message bytes) and `NoiseEncrypted` (a Noise
//! transport-mode frame whose plaintext is itself a complete encoded
//! [`Packet`] — header, payload, and, for everything but bootstrap
//! types, an Ed25519 signature). The inner packet's `source_id` is the
//! *original* multi-hop sender and is untouched by relay; the outer
//! envelope's `source_id` is always the direct link peer's own id, which
//! is what [`super::transport::BleTransport`]'s source-id check
//! validates against the peer-id bound to this `device_id` at handshake
//! completion (spec.md §4.5 "Source-id check"). Mesh-internal types
//! (discovery, topologyAnnounce, gossipSync, ...) are never legal as an
//! *outer* envelope — they only ever exist as the plaintext inside a
//! `NoiseEncrypted` frame, because the cold-boot rule requires an
//! established Noise session before anything but a handshake crosses a
//! link at all.

use crate::identity::PeerId;
use crate::packet::{MessageType, Packet, PacketEncodeError};

/// Build the outer `Handshake`-type envelope carrying raw Noise bytes.
pub fn wrap_handshake(my_peer_id: PeerId, noise_bytes: Vec<u8>) -> Result<Packet, PacketEncodeError> {
    Packet::new(MessageType::Handshake, 0, my_peer_id, PeerId::BROADCAST, noise_bytes)
}

/// Build the outer `NoiseEncrypted` envelope carrying a Noise transport
/// frame (the ciphertext of one encoded inner [`Packet`]).
pub fn wrap_noise_frame(my_peer_id: PeerId, to: PeerId, frame: Vec<u8>) -> Result<Packet, PacketEncodeError> {
    Packet::new(MessageType::NoiseEncrypted, 0, my_peer_id, to, frame)
}
