//! Per-device Noise state held by [`super::manager::SessionManager`]
//! (spec.md §4.4): an optional in-progress handshake, an optional
//! established transport cipher pair, and bookkeeping needed for rate
//! limiting and eviction.

use crate::noise::{CipherState, HandshakeState};
use std::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandshakeStage {
    /// We sent message 1 as initiator; the next inbound bytes must be message 2.
    AwaitingMsg2,
    /// We sent message 2 as responder; the next inbound bytes must be message 3.
    AwaitingMsg3,
}

pub struct Transport {
    pub send: CipherState,
    pub recv: CipherState,
}

/// One device's Noise relationship with us. `handshake`/`stage` and
/// `transport` are mutually exclusive in practice (a completed handshake
/// clears itself and installs `transport`), but both live behind
/// `Option` so eviction/disposal is just "drop the whole `PeerSession`".
pub struct PeerSession {
    pub handshake: Option<HandshakeState>,
    pub stage: Option<HandshakeStage>,
    pub transport: Option<Transport>,
    pub remote_static_public: Option<[u8; 32]>,
    pub remote_signing_public: Option<[u8; 32]>,
    pub attempts: u32,
    pub last_handshake_at: Option<Instant>,
}

impl PeerSession {
    pub fn empty() -> Self {
        Self {
            handshake: None,
            stage: None,
            transport: None,
            remote_static_public: None,
            remote_signing_public: None,
            attempts: 0,
            last_handshake_at: None,
        }
    }

    pub fn is_established(&self) -> bool {
        self.transport.is_some()
    }
}
