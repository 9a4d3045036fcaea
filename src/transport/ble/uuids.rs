//! Fixed 128-bit GATT UUIDs (spec.md §6). Compile-time constants, not
//! configuration — every node in the mesh must agree on these.

use once_cell::sync::Lazy;
use uuid::Uuid;

/// Advertised service UUID. Advertising carries only this — no local
/// name, no manufacturer-specific peer data (spec.md §4.5).
pub static SERVICE_UUID: Lazy<Uuid> =
    Lazy::new(|| Uuid::parse_str("b3a1e200-0af0-4f0e-9e21-0a6f0c9d9a01").expect("valid UUID literal"));

/// The single characteristic: write (with/without response) + notify, no
/// read permission. One GATT write or notification carries exactly one
/// encoded packet (spec.md §6).
pub static PACKET_CHARACTERISTIC_UUID: Lazy<Uuid> =
    Lazy::new(|| Uuid::parse_str("b3a1e201-0af0-4f0e-9e21-0a6f0c9d9a01").expect("valid UUID literal"));
