//! Binary wire protocol: fixed header layout, signed-or-unsigned packet
//! body, message-type discriminants, and the dedup packet-identifier rule
//! (spec.md §4.1).

pub mod codec;
pub mod message_type;

pub use codec::{packet_id, Packet, PacketEncodeError, HEADER_LEN, MAX_PAYLOAD, MAX_TTL, SIGNATURE_LEN, VERSION};
pub use message_type::MessageType;
