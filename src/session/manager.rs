//! [`SessionManager`]: per-device-id Noise handshake/session state,
//! bounded at 500 entries with LRU eviction, gated by rolling-window
//! handshake-rate limits checked before any cryptographic work
//! (spec.md §4.4).

use super::peer_session::{HandshakeStage, PeerSession, Transport};
use super::rate_limit::RollingWindow;
use crate::crypto::CryptoSuite;
use crate::identity::IdentityManager;
use crate::noise::handshake::peek_remote_ephemeral;
use crate::noise::{HandshakeError, HandshakeState};
use crate::primitives::lru_map::BoundedMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

pub const MAX_SESSIONS: usize = 500;
const MAX_ATTEMPTS_PER_DEVICE_PER_WINDOW: u32 = 5;
const MAX_GLOBAL_COMPLETIONS_PER_WINDOW: u32 = 20;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("per-device handshake attempt rate limit exceeded")]
    DeviceRateLimited,
    #[error("global handshake completion rate limit exceeded")]
    GlobalRateLimited,
    #[error("no session exists for this device")]
    NoSession,
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

struct Locked {
    sessions: BoundedMap<String, PeerSession>,
    device_attempts: HashMap<String, RollingWindow>,
    global_completions: RollingWindow,
}

/// Owns every per-device Noise relationship. One instance per running
/// core, shared behind `Arc` with the transport and mesh layers.
pub struct SessionManager {
    suite: CryptoSuite,
    identity: Arc<IdentityManager>,
    state: Mutex<Locked>,
}

impl SessionManager {
    pub fn new(suite: CryptoSuite, identity: Arc<IdentityManager>) -> Self {
        Self {
            suite,
            identity,
            state: Mutex::new(Locked {
                sessions: BoundedMap::new(MAX_SESSIONS),
                device_attempts: HashMap::new(),
                global_completions: RollingWindow::new(MAX_GLOBAL_COMPLETIONS_PER_WINDOW, RATE_WINDOW),
            }),
        }
    }

    fn check_device_attempt_rate(locked: &mut Locked, device_id: &str, now: Instant) -> bool {
        let window = locked
            .device_attempts
            .entry(device_id.to_string())
            .or_insert_with(|| RollingWindow::new(MAX_ATTEMPTS_PER_DEVICE_PER_WINDOW, RATE_WINDOW));
        window.try_record(now)
    }

    /// Begin a handshake as initiator. Installs a fresh `PeerSession`
    /// (evicting the LRU entry if at capacity), gated by the per-device
    /// attempt rate limit. Returns message 1 to send.
    pub async fn start_handshake(&self, device_id: &str) -> Result<Vec<u8>> {
        let now = Instant::now();
        let mut locked = self.state.lock().await;
        if !Self::check_device_attempt_rate(&mut locked, device_id, now) {
            return Err(SessionError::DeviceRateLimited);
        }
        drop(locked);

        let static_pub = self.identity.static_public_key().await;
        let signing_pub = self.identity.signing_public_key().await;
        let (handshake, msg1) = HandshakeState::initiate(static_pub, signing_pub);

        let mut session = PeerSession::empty();
        session.handshake = Some(handshake);
        session.stage = Some(HandshakeStage::AwaitingMsg2);
        session.attempts = 1;
        session.last_handshake_at = Some(now);

        let mut locked = self.state.lock().await;
        if let Some((_evicted_id, evicted)) = locked.sessions.insert(device_id.to_string(), session) {
            drop(evicted); // Drop zeroizes any CipherState/HandshakeState secrets owned.
        }
        Ok(msg1)
    }

    /// Feed inbound handshake-stage bytes for `device_id`. Returns the
    /// reply to send back (message 2 for an incoming message 1, message
    /// 3 for an incoming message 2), or `None` once the handshake is
    /// complete on this side (an incoming message 3 produces no reply).
    pub async fn process(&self, device_id: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let key = device_id.to_string();

        let stage = {
            let locked = self.state.lock().await;
            locked.sessions.peek(&key).and_then(|s| s.stage)
        };

        match stage {
            None => {
                // Fresh inbound message 1: act as responder.
                let mut locked = self.state.lock().await;
                if !Self::check_device_attempt_rate(&mut locked, device_id, now) {
                    return Err(SessionError::DeviceRateLimited);
                }
                drop(locked);

                let remote_e = peek_remote_ephemeral(bytes)?;
                let es_dh = self.identity.diffie_hellman(&remote_e).await;
                let static_pub = self.identity.static_public_key().await;
                let signing_pub = self.identity.signing_public_key().await;

                let mut handshake = HandshakeState::respond(static_pub, signing_pub);
                let msg2 = handshake.read_msg1_write_msg2(bytes, es_dh)?;

                let mut session = PeerSession::empty();
                session.handshake = Some(handshake);
                session.stage = Some(HandshakeStage::AwaitingMsg3);
                session.attempts = 1;
                session.last_handshake_at = Some(now);

                let mut locked = self.state.lock().await;
                if let Some((_id, evicted)) = locked.sessions.insert(key, session) {
                    drop(evicted);
                }
                Ok(Some(msg2))
            }
            Some(HandshakeStage::AwaitingMsg2) => {
                let remote_e = peek_remote_ephemeral(bytes)?;
                let se_dh = self.identity.diffie_hellman(&remote_e).await;

                let mut locked = self.state.lock().await;
                let mut handshake = locked
                    .sessions
                    .get_mut(&key)
                    .and_then(|s| s.handshake.take())
                    .ok_or(HandshakeError::OutOfOrder)?;
                let (msg3, output) = handshake.read_msg2_write_msg3(bytes, se_dh)?;
                drop(handshake);

                if !locked.global_completions.try_record(now) {
                    locked.sessions.remove(&key);
                    return Err(SessionError::GlobalRateLimited);
                }

                let session = locked.sessions.get_mut(&key).ok_or(SessionError::NoSession)?;
                session.handshake = None;
                session.stage = None;
                session.transport = Some(Transport { send: output.send, recv: output.recv });
                session.remote_static_public = Some(output.remote_static_public);
                session.remote_signing_public = Some(output.remote_signing_public);
                Ok(Some(msg3))
            }
            Some(HandshakeStage::AwaitingMsg3) => {
                let mut locked = self.state.lock().await;
                let mut handshake = locked
                    .sessions
                    .get_mut(&key)
                    .and_then(|s| s.handshake.take())
                    .ok_or(HandshakeError::OutOfOrder)?;
                let output = handshake.read_msg3(bytes)?;
                drop(handshake);

                if !locked.global_completions.try_record(now) {
                    locked.sessions.remove(&key);
                    return Err(SessionError::GlobalRateLimited);
                }

                let session = locked.sessions.get_mut(&key).ok_or(SessionError::NoSession)?;
                session.handshake = None;
                session.stage = None;
                session.transport = Some(Transport { send: output.send, recv: output.recv });
                session.remote_static_public = Some(output.remote_static_public);
                session.remote_signing_public = Some(output.remote_signing_public);
                Ok(None)
            }
        }
    }

    pub async fn encrypt(&self, device_id: &str, plaintext: &[u8]) -> Option<Vec<u8>> {
        let mut locked = self.state.lock().await;
        let session = locked.sessions.get_mut(&device_id.to_string())?;
        let transport = session.transport.as_mut()?;
        transport.send.encrypt(plaintext).ok()
    }

    pub async fn decrypt(&self, device_id: &str, frame: &[u8]) -> Option<Vec<u8>> {
        let mut locked = self.state.lock().await;
        let session = locked.sessions.get_mut(&device_id.to_string())?;
        let transport = session.transport.as_mut()?;
        transport.recv.decrypt(frame).ok()
    }

    pub async fn is_established(&self, device_id: &str) -> bool {
        let mut locked = self.state.lock().await;
        locked
            .sessions
            .get(&device_id.to_string())
            .map(|s| s.is_established())
            .unwrap_or(false)
    }

    pub async fn remote_signing_key(&self, device_id: &str) -> Option<[u8; 32]> {
        let mut locked = self.state.lock().await;
        locked.sessions.get(&device_id.to_string())?.remote_signing_public
    }

    pub async fn remote_static_key(&self, device_id: &str) -> Option<[u8; 32]> {
        let mut locked = self.state.lock().await;
        locked.sessions.get(&device_id.to_string())?.remote_static_public
    }

    /// Explicitly tear down a device's session (disposal of all owned
    /// secret state, via `Drop`).
    pub async fn dispose(&self, device_id: &str) {
        let mut locked = self.state.lock().await;
        if let Some(session) = locked.sessions.remove(&device_id.to_string()) {
            drop(session);
        }
    }

    pub fn suite(&self) -> &CryptoSuite {
        &self.suite
    }
}
