//! Constant-time comparison for sensitive values (keys, nonces, tags,
//! padding). Use for all comparisons that could leak through timing side
//! channels; never use `==` on secret-derived bytes.

use subtle::ConstantTimeEq;

/// Constant-time equality for 32-byte arrays (e.g. keys, public keys, peer ids).
#[inline(always)]
pub fn eq_32(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time equality for 64-byte arrays (e.g. signatures).
#[inline(always)]
pub fn eq_64(a: &[u8; 64], b: &[u8; 64]) -> bool {
    a.ct_eq(b).into()
}

/// Constant-time equality for slices of the same length.
///
/// Visits every byte regardless of where the first mismatch is; a length
/// mismatch is reported early because there is no secret-dependent
/// difference in length, only in contents.
#[inline(always)]
pub fn eq_slices(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    bool::from(diff.ct_eq(&0u8))
}
