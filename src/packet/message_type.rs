//! Single-byte message-type discriminant (spec.md §4.1).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Handshake = 0x01,
    Chat = 0x02,
    TopologyAnnounce = 0x03,
    GossipSync = 0x04,
    Ack = 0x05,
    Ping = 0x06,
    Pong = 0x07,
    Discovery = 0x08,
    NoiseEncrypted = 0x09,
    LocationUpdate = 0x0A,
    GroupJoin = 0x0B,
    GroupJoinResponse = 0x0C,
    GroupKeyRotation = 0x0D,
    EmergencyAlert = 0x0E,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Unknown discriminants return `None` — the packet is rejected, not
    /// mapped to a default variant.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x01 => Self::Handshake,
            0x02 => Self::Chat,
            0x03 => Self::TopologyAnnounce,
            0x04 => Self::GossipSync,
            0x05 => Self::Ack,
            0x06 => Self::Ping,
            0x07 => Self::Pong,
            0x08 => Self::Discovery,
            0x09 => Self::NoiseEncrypted,
            0x0A => Self::LocationUpdate,
            0x0B => Self::GroupJoin,
            0x0C => Self::GroupJoinResponse,
            0x0D => Self::GroupKeyRotation,
            0x0E => Self::EmergencyAlert,
            _ => return None,
        })
    }

    /// True for message types that are bootstrap/mesh-internal and may be
    /// accepted from an unknown signer if the sender is a direct
    /// authenticated peer (spec.md §4.2, §4.6 step 4).
    pub fn is_bootstrap(self) -> bool {
        matches!(self, Self::Handshake | Self::Discovery | Self::TopologyAnnounce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_value() {
        for v in [
            0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
        ] {
            let ty = MessageType::from_u8(v).unwrap();
            assert_eq!(ty.as_u8(), v);
        }
    }

    #[test]
    fn unknown_type_is_none() {
        assert!(MessageType::from_u8(0x00).is_none());
        assert!(MessageType::from_u8(0xFF).is_none());
    }

    #[test]
    fn bootstrap_classification() {
        assert!(MessageType::Handshake.is_bootstrap());
        assert!(MessageType::Discovery.is_bootstrap());
        assert!(MessageType::TopologyAnnounce.is_bootstrap());
        assert!(!MessageType::Chat.is_bootstrap());
    }
}
