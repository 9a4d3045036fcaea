//! Fixed-layout packet header, strict decode validation, and the dedup
//! packet-identifier rule (spec.md §4.1). Generalizes the teacher's
//! `network/packet.rs` fixed-size-with-HMAC layout to a variable-length,
//! signed-or-unsigned frame sized to the declared payload.

use super::message_type::MessageType;
use crate::identity::PeerId;
use crate::primitives::encoding::to_hex;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

pub const VERSION: u8 = 1;
pub const MAX_TTL: u8 = 7;
pub const MAX_PAYLOAD: usize = 512;
pub const HEADER_LEN: usize = 1 + 1 + 1 + 1 + 8 + 32 + 32 + 2;
pub const SIGNATURE_LEN: usize = 64;
const CLOCK_SKEW_MS: i64 = 5 * 60 * 1000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketEncodeError {
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD}-byte maximum")]
    PayloadTooLarge(usize),
}

pub type EncodeResult<T> = std::result::Result<T, PacketEncodeError>;

/// One wire packet. `signature` is `Some` for the signed wire form,
/// `None` for the unsigned form — both are valid on the wire, and the
/// dedup key distinguishes them (see [`packet_id`]).
#[derive(Clone, Debug)]
pub struct Packet {
    pub msg_type: MessageType,
    pub ttl: u8,
    pub flags: u8,
    pub timestamp_ms: i64,
    pub source_id: PeerId,
    pub dest_id: PeerId,
    pub payload: Vec<u8>,
    pub signature: Option<[u8; 64]>,
}

impl Packet {
    /// Build a new unsigned packet with a fresh CSPRNG `flags` byte and
    /// the current wall-clock timestamp. Callers that need a signed
    /// packet attach one with [`Packet::with_signature`] after computing
    /// it over `encode_unsigned_part`.
    pub fn new(
        msg_type: MessageType,
        ttl: u8,
        source_id: PeerId,
        dest_id: PeerId,
        payload: Vec<u8>,
    ) -> EncodeResult<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(PacketEncodeError::PayloadTooLarge(payload.len()));
        }
        let mut flags = [0u8; 1];
        OsRng.fill_bytes(&mut flags);
        Ok(Self {
            msg_type,
            ttl,
            flags: flags[0],
            timestamp_ms: now_ms(),
            source_id,
            dest_id,
            payload,
            signature: None,
        })
    }

    pub fn with_signature(mut self, signature: [u8; 64]) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.dest_id.is_broadcast()
    }

    /// The header+payload bytes a signature is computed/verified over —
    /// i.e. the encoded packet minus the trailing signature slot.
    pub fn signable_bytes(&self) -> EncodeResult<Vec<u8>> {
        self.encode_inner(false)
    }

    /// Full wire encoding: header + payload + signature (if present).
    pub fn encode(&self) -> EncodeResult<Vec<u8>> {
        self.encode_inner(true)
    }

    fn encode_inner(&self, include_signature: bool) -> EncodeResult<Vec<u8>> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(PacketEncodeError::PayloadTooLarge(self.payload.len()));
        }
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len() + SIGNATURE_LEN);
        buf.push(VERSION);
        buf.push(self.msg_type.as_u8());
        buf.push(self.ttl);
        buf.push(self.flags);
        buf.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        buf.extend_from_slice(self.source_id.as_bytes());
        buf.extend_from_slice(self.dest_id.as_bytes());
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        if include_signature {
            if let Some(sig) = self.signature {
                buf.extend_from_slice(&sig);
            }
        }
        Ok(buf)
    }

    /// Strictly validate and decode a wire buffer. Returns `None` on any
    /// malformed-packet condition: wrong version, unknown type, ttl > 7,
    /// declared payload length > 512, buffer shorter than declared, or a
    /// timestamp more than 5 minutes away from the local clock in either
    /// direction. Never panics on attacker-controlled input. The returned
    /// `Packet` copies out of `data` — it does not alias the caller's
    /// buffer.
    pub fn decode(data: &[u8]) -> Option<Packet> {
        if data.len() < HEADER_LEN {
            return None;
        }
        if data[0] != VERSION {
            return None;
        }
        let msg_type = MessageType::from_u8(data[1])?;
        let ttl = data[2];
        if ttl > MAX_TTL {
            return None;
        }
        let flags = data[3];
        let timestamp_ms = i64::from_be_bytes(data[4..12].try_into().ok()?);
        if (timestamp_ms - now_ms()).abs() > CLOCK_SKEW_MS {
            return None;
        }
        let source_id = PeerId(data[12..44].try_into().ok()?);
        let dest_id = PeerId(data[44..76].try_into().ok()?);
        let payload_len = u16::from_be_bytes(data[76..78].try_into().ok()?) as usize;
        if payload_len > MAX_PAYLOAD {
            return None;
        }

        let payload_start = HEADER_LEN;
        let payload_end = payload_start + payload_len;
        if data.len() < payload_end {
            return None;
        }
        let payload = data[payload_start..payload_end].to_vec();

        let signature = if data.len() == payload_end {
            None
        } else if data.len() == payload_end + SIGNATURE_LEN {
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(&data[payload_end..payload_end + SIGNATURE_LEN]);
            Some(sig)
        } else {
            return None;
        };

        Some(Packet {
            msg_type,
            ttl,
            flags,
            timestamp_ms,
            source_id,
            dest_id,
            payload,
            signature,
        })
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Dedup key: `hex(sourceId) ":" timestamp ":" type ":" flags`, plus the
/// first 8 signature bytes (hex) when signed, or the literal `nosig`
/// suffix when not — so a signed packet and its stripped-signature twin
/// never collide in the deduplicator (spec.md §4.1).
pub fn packet_id(p: &Packet) -> String {
    let base = format!(
        "{}:{}:{}:{}",
        to_hex(p.source_id.as_bytes()),
        p.timestamp_ms,
        p.msg_type.as_u8(),
        p.flags
    );
    match p.signature {
        Some(sig) => format!("{base}:{}", to_hex(&sig[..8])),
        None => format!("{base}:nosig"),
    }
}
