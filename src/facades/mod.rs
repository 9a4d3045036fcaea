//! Application facades (spec.md §4.7): thin repositories above the mesh
//! that encode/decode typed payloads, group-encrypt where applicable, and
//! broadcast/unicast through a shared [`crate::transport::Transport`].
//!
//! Grounded on the teacher's `protocol/message.rs`/`protocol/contact.rs`
//! (typed payload + serialize/deserialize pair), generalized to the three
//! concrete repositories the spec names. Every facade installs an error
//! handler on its inbound subscription task — a `Transport::packets()`
//! stream error never silently cancels the facade's forwarding loop
//! (spec.md §7 "Every subscription on a radio-backed stream installs an
//! error handler that logs and keeps the subscription alive").

pub mod chat;
pub mod emergency;
pub mod location;
pub mod receipt;

use crate::identity::PeerId;
use crate::packet::{MessageType, Packet, PacketEncodeError};
use crate::transport::{Transport, TransportError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacadeError {
    #[error("payload encoding error: {0}")]
    Encode(#[from] PacketEncodeError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("no active group to encrypt for")]
    NoActiveGroup,
}

pub type Result<T> = std::result::Result<T, FacadeError>;

/// Shared surface over the three facades (spec.md §4.7 "a small `Facade`
/// trait shared by the three repositories"). Not `async_trait` — every
/// method here is either a thin construction+send already `async fn` on
/// the concrete type, or a plain stream getter, so each facade exposes it
/// directly rather than through a boxed trait object; this trait exists
/// to name the shared shape for documentation and tests, not for dynamic
/// dispatch (no facade is ever stored as `dyn Facade`).
pub trait Facade {
    type Event: Clone + Send + 'static;

    fn inbound_stream(&self) -> tokio::sync::broadcast::Receiver<Self::Event>;
}

/// Build and broadcast one packet of `msg_type` carrying `payload`,
/// rejecting payloads over the 512-byte wire maximum before it ever
/// reaches the transport (spec.md §4.6 "reject payloads > 512 before
/// reaching the radio").
pub(crate) async fn broadcast_payload(
    transport: &Arc<dyn Transport>,
    msg_type: MessageType,
    ttl: u8,
    payload: Vec<u8>,
) -> Result<()> {
    let packet = Packet::new(msg_type, ttl, transport.my_peer_id(), PeerId::BROADCAST, payload)?;
    transport.broadcast_packet(&packet).await?;
    Ok(())
}

pub(crate) async fn send_payload(
    transport: &Arc<dyn Transport>,
    msg_type: MessageType,
    ttl: u8,
    payload: Vec<u8>,
    to: PeerId,
) -> Result<()> {
    let packet = Packet::new(msg_type, ttl, transport.my_peer_id(), to, payload)?;
    transport.send_packet(&packet, to).await?;
    Ok(())
}

/// Default TTL for facade-originated broadcasts: the spec's "public
/// message" cap (spec.md §4.6 step 8).
pub const DEFAULT_BROADCAST_TTL: u8 = 6;
