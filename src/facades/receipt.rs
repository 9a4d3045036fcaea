//! Batched delivery receipts (spec.md §4.7): a fixed 41-byte struct,
//! batched up to 11 per packet behind a sentinel `0xFF` byte.
//!
//! The spec names the struct's size and the sentinel but not its exact
//! field layout (SPEC_FULL.md Open Question 4) — resolved here as
//! `status:1 | packet_id_hash:32 | timestamp_ms:8` (1 + 32 + 8 = 41),
//! the same shape as every other fixed record in this crate (tag byte,
//! content hash, timestamp), mirroring `packet::codec`'s own header
//! layout discipline.

use crate::crypto::CryptoSuite;

pub const RECEIPT_LEN: usize = 41;
pub const BATCH_SENTINEL: u8 = 0xFF;
pub const MAX_RECEIPTS_PER_BATCH: usize = 11;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Delivered,
    Read,
}

impl ReceiptStatus {
    fn as_u8(self) -> u8 {
        match self {
            Self::Delivered => 0x01,
            Self::Read => 0x02,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Delivered),
            0x02 => Some(Self::Read),
            _ => None,
        }
    }
}

/// One acknowledgement, keyed by a truncation-free BLAKE2b-256 hash of
/// the acknowledged packet's dedup id rather than the id string itself,
/// so the fixed-size record never has to carry a variable-length hex
/// string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub packet_id_hash: [u8; 32],
    pub timestamp_ms: i64,
}

impl Receipt {
    pub fn for_packet_id(suite: &CryptoSuite, packet_id: &str, status: ReceiptStatus, timestamp_ms: i64) -> Self {
        Self {
            status,
            packet_id_hash: suite.blake2b_256(packet_id.as_bytes()),
            timestamp_ms,
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.status.as_u8());
        buf.extend_from_slice(&self.packet_id_hash);
        buf.extend_from_slice(&self.timestamp_ms.to_be_bytes());
    }

    fn decode_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != RECEIPT_LEN {
            return None;
        }
        let status = ReceiptStatus::from_u8(bytes[0])?;
        let mut packet_id_hash = [0u8; 32];
        packet_id_hash.copy_from_slice(&bytes[1..33]);
        let timestamp_ms = i64::from_be_bytes(bytes[33..41].try_into().ok()?);
        Some(Self { status, packet_id_hash, timestamp_ms })
    }
}

/// Encode up to [`MAX_RECEIPTS_PER_BATCH`] receipts behind the `0xFF`
/// sentinel. Callers with more receipts than fit in one batch split
/// across multiple `ack` packets themselves.
pub fn encode_batch(receipts: &[Receipt]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + RECEIPT_LEN * MAX_RECEIPTS_PER_BATCH);
    buf.push(BATCH_SENTINEL);
    for r in receipts.iter().take(MAX_RECEIPTS_PER_BATCH) {
        r.encode_into(&mut buf);
    }
    buf
}

/// Decode an `ack` payload. Returns `None` if the sentinel is absent or
/// the remaining bytes aren't an exact multiple of [`RECEIPT_LEN`].
pub fn decode_batch(payload: &[u8]) -> Option<Vec<Receipt>> {
    let (sentinel, rest) = payload.split_first()?;
    if *sentinel != BATCH_SENTINEL {
        return None;
    }
    if rest.is_empty() || rest.len() % RECEIPT_LEN != 0 {
        return None;
    }
    let count = rest.len() / RECEIPT_LEN;
    if count > MAX_RECEIPTS_PER_BATCH {
        return None;
    }
    rest.chunks(RECEIPT_LEN).map(Receipt::decode_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_receipt_round_trips() {
        let suite = CryptoSuite::new();
        let r = Receipt::for_packet_id(&suite, "abc:1:2:3:nosig", ReceiptStatus::Delivered, 1_000);
        let encoded = encode_batch(&[r]);
        assert_eq!(encoded[0], BATCH_SENTINEL);
        let decoded = decode_batch(&encoded).unwrap();
        assert_eq!(decoded, vec![r]);
    }

    #[test]
    fn batch_truncates_to_eleven() {
        let suite = CryptoSuite::new();
        let receipts: Vec<Receipt> = (0..20)
            .map(|i| Receipt::for_packet_id(&suite, &format!("id{i}"), ReceiptStatus::Read, i))
            .collect();
        let encoded = encode_batch(&receipts);
        let decoded = decode_batch(&encoded).unwrap();
        assert_eq!(decoded.len(), MAX_RECEIPTS_PER_BATCH);
        assert_eq!(decoded[0].timestamp_ms, 0);
    }

    #[test]
    fn missing_sentinel_is_rejected() {
        let suite = CryptoSuite::new();
        let r = Receipt::for_packet_id(&suite, "abc", ReceiptStatus::Delivered, 1);
        let mut encoded = encode_batch(&[r]);
        encoded[0] = 0x00;
        assert!(decode_batch(&encoded).is_none());
    }

    #[test]
    fn truncated_trailing_bytes_rejected() {
        let suite = CryptoSuite::new();
        let r = Receipt::for_packet_id(&suite, "abc", ReceiptStatus::Delivered, 1);
        let mut encoded = encode_batch(&[r]);
        encoded.pop();
        assert!(decode_batch(&encoded).is_none());
    }

    #[test]
    fn twelfth_receipt_in_batch_rejected_on_decode() {
        // A hand-built payload with 12 entries (one over the cap) must be
        // rejected even though its length is a clean multiple of 41 —
        // exercises spec.md §8 "12th receipt in one batch is deferred".
        let suite = CryptoSuite::new();
        let mut buf = vec![BATCH_SENTINEL];
        for i in 0..12u8 {
            Receipt::for_packet_id(&suite, &format!("id{i}"), ReceiptStatus::Delivered, i as i64).encode_into(&mut buf);
        }
        assert!(decode_batch(&buf).is_none());
    }
}
