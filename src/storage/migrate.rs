//! Storage-format migration helpers: accept legacy hex, rewrite as base64,
//! never brick startup on a corrupt value.
//!
//! Source pattern (spec.md §9 "Migration paths on persistent values"):
//! when a stored format evolves, accept both on read and silently rewrite;
//! never crash on the old format. Applied here to the `hex -> base64` key
//! migration and to `DateTime` parse failures on group metadata.

use super::{Result, SecureKvStore};
use crate::primitives::encoding::{from_base64, from_hex, is_hex, to_base64};
use chrono::{DateTime, Utc};

/// Load a 32-byte key value stored under `storage_key`, accepting either
/// base64 (current format) or legacy hex. On a hex hit, rewrites the
/// value as base64 so the next load takes the fast path. Returns `None`
/// if absent or if the stored value can't be decoded to exactly 32 bytes
/// in either format — a corrupt entry is "absent", not a startup abort.
pub async fn load_key_bytes(store: &dyn SecureKvStore, storage_key: &str) -> Result<Option<[u8; 32]>> {
    let Some(raw) = store.get(storage_key).await? else {
        return Ok(None);
    };

    let decoded = if is_hex(&raw) {
        let bytes = from_hex(&raw);
        if let Some(bytes) = &bytes {
            if bytes.len() == 32 {
                store.set(storage_key, &to_base64(bytes)).await?;
            }
        }
        bytes
    } else {
        from_base64(&raw)
    };

    Ok(decoded.and_then(|b| <[u8; 32]>::try_from(b).ok()))
}

/// Load a 64-byte key value (Ed25519 secret key) with the same
/// hex-then-base64 migration rule as [`load_key_bytes`].
pub async fn load_key_bytes_64(store: &dyn SecureKvStore, storage_key: &str) -> Result<Option<[u8; 64]>> {
    let Some(raw) = store.get(storage_key).await? else {
        return Ok(None);
    };

    let decoded = if is_hex(&raw) {
        let bytes = from_hex(&raw);
        if let Some(bytes) = &bytes {
            if bytes.len() == 64 {
                store.set(storage_key, &to_base64(bytes)).await?;
            }
        }
        bytes
    } else {
        from_base64(&raw)
    };

    Ok(decoded.and_then(|b| <[u8; 64]>::try_from(b).ok()))
}

pub async fn save_key_bytes(store: &dyn SecureKvStore, storage_key: &str, bytes: &[u8]) -> Result<()> {
    store.set(storage_key, &to_base64(bytes)).await
}

/// Parse a stored ISO-8601 timestamp. A parse failure defaults to "now"
/// rather than aborting startup (spec.md §6).
pub fn parse_timestamp_or_now(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
