//! Noise XX handshake state machine: `-> e`, `<- e, ee, s, es`,
//! `-> s, se`, each of messages 2 and 3 carrying the sender's Ed25519
//! signing public key as its payload so that packet-signature
//! verification is bootstrapped inside the authenticated channel
//! (spec.md §4.3).
//!
//! `HandshakeState` never holds the local static private key — the two
//! DH operations that need it (`es` for the responder, `se` for the
//! initiator) are always against the peer's already-received ephemeral
//! public key, so the caller (normally
//! [`crate::session::SessionManager`] over an [`crate::identity::IdentityManager`])
//! computes that one Diffie-Hellman itself and passes in the raw shared
//! secret, the same way [`crate::identity::keypair::StaticKeypair`]
//! exposes Diffie-Hellman as an operation rather than a key.

use super::cipher_state::CipherState;
use super::symmetric::SymmetricState;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("message arrived out of order for this handshake's role/step")]
    OutOfOrder,
    #[error("message too short or malformed")]
    Malformed,
    #[error("embedded static/signing public key had the wrong length")]
    InvalidKeyLength,
    #[error("payload decryption failed")]
    DecryptFailed,
}

pub type Result<T> = std::result::Result<T, HandshakeError>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Role {
    Initiator,
    Responder,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Step {
    AwaitingMsg1, // responder only, before reading msg1
    Sent1,        // initiator, after writing msg1, awaiting msg2
    Sent2,        // responder, after writing msg2, awaiting msg3
    Complete,
}

/// One in-progress Noise XX handshake. Constructed fresh per device-id by
/// [`crate::session::SessionManager`]; disposed (all secret material
/// zeroized) on every success or failure path.
pub struct HandshakeState {
    role: Role,
    step: Step,
    symmetric: Option<SymmetricState>,
    local_static_public: [u8; 32],
    local_signing_public: [u8; 32],
    local_ephemeral: Option<StaticSecret>,
    remote_ephemeral_public: Option<[u8; 32]>,
    remote_static_public: Option<[u8; 32]>,
    remote_signing_public: Option<[u8; 32]>,
}

/// Output of a completed handshake: the two transport `CipherState`s
/// (send then receive, from this party's perspective) and the remote
/// party's authenticated static + signing public keys.
pub struct HandshakeOutput {
    pub send: CipherState,
    pub recv: CipherState,
    pub remote_static_public: [u8; 32],
    pub remote_signing_public: [u8; 32],
}

fn generate_ephemeral() -> (StaticSecret, [u8; 32]) {
    let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
    let public = PublicKey::from(&secret).to_bytes();
    (secret, public)
}

fn dh(secret: &StaticSecret, public_bytes: &[u8; 32]) -> [u8; 32] {
    secret.diffie_hellman(&PublicKey::from(*public_bytes)).to_bytes()
}

fn exact_32(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| HandshakeError::InvalidKeyLength)
}

/// The first 32 bytes of message 1 or message 2 are always the sender's
/// fresh ephemeral public key. Callers need this *before* feeding the
/// message into the handshake so they can compute the local-static/
/// remote-ephemeral DH (`es`/`se`) themselves.
pub fn peek_remote_ephemeral(message: &[u8]) -> Result<[u8; 32]> {
    if message.len() < 32 {
        return Err(HandshakeError::Malformed);
    }
    exact_32(&message[..32])
}

impl HandshakeState {
    /// Begin as initiator: produces message 1 (the ephemeral public key,
    /// 32 bytes, unencrypted).
    pub fn initiate(local_static_public: [u8; 32], local_signing_public: [u8; 32]) -> (Self, Vec<u8>) {
        let mut symmetric = SymmetricState::initialize();
        let (e_secret, e_pub) = generate_ephemeral();
        symmetric.mix_hash(&e_pub);

        let state = Self {
            role: Role::Initiator,
            step: Step::Sent1,
            symmetric: Some(symmetric),
            local_static_public,
            local_signing_public,
            local_ephemeral: Some(e_secret),
            remote_ephemeral_public: None,
            remote_static_public: None,
            remote_signing_public: None,
        };
        (state, e_pub.to_vec())
    }

    /// Begin as responder, awaiting message 1.
    pub fn respond(local_static_public: [u8; 32], local_signing_public: [u8; 32]) -> Self {
        Self {
            role: Role::Responder,
            step: Step::AwaitingMsg1,
            symmetric: Some(SymmetricState::initialize()),
            local_static_public,
            local_signing_public,
            local_ephemeral: None,
            remote_ephemeral_public: None,
            remote_static_public: None,
            remote_signing_public: None,
        }
    }

    /// Responder: read message 1 (`e`), produce message 2
    /// (`e, ee, s, es` + encrypted signing-pubkey payload).
    ///
    /// `static_es_dh` must be `DH(local_static_secret, remote_ephemeral)`
    /// for the `remote_ephemeral` returned by [`peek_remote_ephemeral`]
    /// on this same `msg1` — the caller computes it (e.g. via
    /// `IdentityManager::diffie_hellman`) so this type never touches the
    /// local static secret directly.
    pub fn read_msg1_write_msg2(&mut self, msg1: &[u8], static_es_dh: [u8; 32]) -> Result<Vec<u8>> {
        if self.role != Role::Responder || self.step != Step::AwaitingMsg1 {
            return Err(HandshakeError::OutOfOrder);
        }
        if msg1.len() != 32 {
            return Err(HandshakeError::Malformed);
        }
        let remote_e = exact_32(msg1)?;
        let symmetric = self.symmetric.as_mut().expect("symmetric state present");
        symmetric.mix_hash(&remote_e);
        self.remote_ephemeral_public = Some(remote_e);

        let (e_secret, e_pub) = generate_ephemeral();
        symmetric.mix_hash(&e_pub);
        let dh_ee = dh(&e_secret, &remote_e);
        symmetric.mix_key(&dh_ee);

        let enc_static = symmetric.encrypt_and_hash(&self.local_static_public);

        symmetric.mix_key(&static_es_dh);

        let enc_payload = symmetric.encrypt_and_hash(&self.local_signing_public);

        self.local_ephemeral = Some(e_secret);
        self.step = Step::Sent2;

        let mut out = Vec::with_capacity(32 + enc_static.len() + enc_payload.len());
        out.extend_from_slice(&e_pub);
        out.extend_from_slice(&enc_static);
        out.extend_from_slice(&enc_payload);
        Ok(out)
    }

    /// Initiator: read message 2 (`e, ee, s, es` + payload), produce
    /// message 3 (`s, se` + encrypted signing-pubkey payload), and
    /// return the finished handshake output.
    ///
    /// `static_se_dh` must be `DH(local_static_secret, remote_ephemeral)`
    /// for the `remote_ephemeral` returned by [`peek_remote_ephemeral`]
    /// on this same `msg2`.
    pub fn read_msg2_write_msg3(
        &mut self,
        msg2: &[u8],
        static_se_dh: [u8; 32],
    ) -> Result<(Vec<u8>, HandshakeOutput)> {
        if self.role != Role::Initiator || self.step != Step::Sent1 {
            return Err(HandshakeError::OutOfOrder);
        }
        if msg2.len() < 32 + 48 + 48 {
            return Err(HandshakeError::Malformed);
        }
        let remote_e = exact_32(&msg2[0..32])?;
        let enc_static = &msg2[32..32 + 48];
        let enc_payload = &msg2[32 + 48..];

        let symmetric = self.symmetric.as_mut().expect("symmetric state present");
        symmetric.mix_hash(&remote_e);
        self.remote_ephemeral_public = Some(remote_e);

        let local_e = self.local_ephemeral.as_ref().expect("initiator has ephemeral");
        let dh_ee = dh(local_e, &remote_e);
        symmetric.mix_key(&dh_ee);

        let remote_static = symmetric
            .decrypt_and_hash(enc_static)
            .map_err(|_| HandshakeError::DecryptFailed)?;
        let remote_static = exact_32(&remote_static)?;
        self.remote_static_public = Some(remote_static);

        symmetric.mix_key(&static_se_dh);

        let remote_signing = symmetric
            .decrypt_and_hash(enc_payload)
            .map_err(|_| HandshakeError::DecryptFailed)?;
        let remote_signing = exact_32(&remote_signing)?;
        self.remote_signing_public = Some(remote_signing);

        let enc_local_static = symmetric.encrypt_and_hash(&self.local_static_public);

        // "se": DH(local static secret, remote ephemeral) — same value as
        // `static_se_dh` supplied above, reused rather than recomputed.
        symmetric.mix_key(&static_se_dh);

        let enc_local_payload = symmetric.encrypt_and_hash(&self.local_signing_public);

        self.step = Step::Complete;
        let symmetric = self.symmetric.take().expect("symmetric state present");
        let (c1, c2) = symmetric.split();
        // Initiator: c1 = send, c2 = recv.
        let send = CipherState::new(c1);
        let mut recv = CipherState::new(c2);
        recv.enable_replay_window();

        let mut msg3 = Vec::with_capacity(enc_local_static.len() + enc_local_payload.len());
        msg3.extend_from_slice(&enc_local_static);
        msg3.extend_from_slice(&enc_local_payload);

        Ok((
            msg3,
            HandshakeOutput {
                send,
                recv,
                remote_static_public: remote_static,
                remote_signing_public: remote_signing,
            },
        ))
    }

    /// Responder: read message 3 (`s, se` + payload), complete the
    /// handshake. Needs no additional input from the caller: `se` is
    /// `DH(remote_static, local_ephemeral)`, computed entirely from keys
    /// this `HandshakeState` already owns.
    pub fn read_msg3(&mut self, msg3: &[u8]) -> Result<HandshakeOutput> {
        if self.role != Role::Responder || self.step != Step::Sent2 {
            return Err(HandshakeError::OutOfOrder);
        }
        if msg3.len() < 48 + 48 {
            return Err(HandshakeError::Malformed);
        }
        let enc_static = &msg3[0..48];
        let enc_payload = &msg3[48..];

        let symmetric = self.symmetric.as_mut().expect("symmetric state present");
        let remote_static = symmetric
            .decrypt_and_hash(enc_static)
            .map_err(|_| HandshakeError::DecryptFailed)?;
        let remote_static = exact_32(&remote_static)?;
        self.remote_static_public = Some(remote_static);

        let local_e = self.local_ephemeral.as_ref().expect("responder has ephemeral");
        let dh_se = dh(local_e, &remote_static);
        symmetric.mix_key(&dh_se);

        let remote_signing = symmetric
            .decrypt_and_hash(enc_payload)
            .map_err(|_| HandshakeError::DecryptFailed)?;
        let remote_signing = exact_32(&remote_signing)?;
        self.remote_signing_public = Some(remote_signing);

        self.step = Step::Complete;
        let symmetric = self.symmetric.take().expect("symmetric state present");
        let (c1, c2) = symmetric.split();
        // Responder: c1 = recv, c2 = send.
        let send = CipherState::new(c2);
        let mut recv = CipherState::new(c1);
        recv.enable_replay_window();

        Ok(HandshakeOutput {
            send,
            recv,
            remote_static_public: remote_static,
            remote_signing_public: remote_signing,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.step == Step::Complete
    }
}

impl Drop for HandshakeState {
    /// Zero the local ephemeral private key and remote statics/
    /// ephemerals on every success or failure path (spec.md §4.3
    /// `HandshakeState.dispose()`); `SymmetricState::split`/`Drop`
    /// already zero the chaining key and transcript hash.
    fn drop(&mut self) {
        if let Some(e) = self.local_ephemeral.take() {
            drop(e); // StaticSecret zeroizes its own bytes on drop.
        }
        if let Some(mut v) = self.remote_ephemeral_public.take() {
            v.zeroize();
        }
        if let Some(mut v) = self.remote_static_public.take() {
            v.zeroize();
        }
        if let Some(mut v) = self.remote_signing_public.take() {
            v.zeroize();
        }
    }
}
