//! Hex and base64 helpers used throughout identity, group, and storage
//! layers. Centralized here so every call site uses the same encoding
//! table and the same "legacy format" detection rule (see
//! `storage::kv` for the hex-to-base64 migration that relies on `is_hex`).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Lowercase hex encoding (used for peer ids and log-safe prefixes).
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode lowercase or uppercase hex; rejects odd-length or non-hex input.
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    hex::decode(s).ok()
}

/// True iff `s` is a non-empty, even-length string of only `0-9a-f` / `0-9A-F`.
///
/// Used to detect the legacy on-disk key format before base64 was adopted.
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Standard (padded) base64 encoding — the storage-layer wire format for
/// raw key and salt bytes.
pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64.
pub fn from_base64(s: &str) -> Option<Vec<u8>> {
    BASE64.decode(s).ok()
}
