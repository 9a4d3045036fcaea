//! Argon2id group-key derivation and Base32 join codes.
//!
//! Ops/mem parameters match spec.md §4.2 "Moderate" profile: 3 passes,
//! 256 MiB memory, 32-byte output. Derivation is CPU- and memory-heavy by
//! design (it is the group's only defense against passphrase guessing) —
//! callers on an async path MUST run it via `tokio::task::spawn_blocking`
//! (see `group::GroupManager::create`/`join`).

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Argon2id parameters, exposed so callers/tests can see exactly what
/// "Moderate" means rather than reading it off a magic-number literal.
#[derive(Clone, Copy, Debug)]
pub struct Argon2Params {
    pub mem_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            mem_cost_kib: 256 * 1024,
            time_cost: 3,
            parallelism: 1,
            output_len: 32,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfError {
    #[error("passphrase must be between 8 and 128 characters")]
    PassphraseOutOfBounds,
    #[error("argon2id derivation failed")]
    DerivationFailed,
}

pub type Result<T> = std::result::Result<T, KdfError>;

pub const MIN_PASSPHRASE_LEN: usize = 8;
pub const MAX_PASSPHRASE_LEN: usize = 128;

/// Reject passphrases outside `[8, 128]` chars, counted as Unicode scalar
/// values (matches both the UI entry field and this API boundary, per
/// spec.md §4.2 "Passphrase bounds").
pub fn check_passphrase_bounds(passphrase: &str) -> Result<()> {
    let len = passphrase.chars().count();
    if !(MIN_PASSPHRASE_LEN..=MAX_PASSPHRASE_LEN).contains(&len) {
        return Err(KdfError::PassphraseOutOfBounds);
    }
    Ok(())
}

/// Derive a 32-byte key from `passphrase` and a 16-byte `salt` with the
/// "Moderate" Argon2id profile. Synchronous and blocking — run on a
/// blocking-capable executor from async call sites.
pub fn derive_key(passphrase: &str, salt: &[u8; 16], params: Argon2Params) -> Result<[u8; 32]> {
    check_passphrase_bounds(passphrase)?;
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(params.output_len),
    )
    .map_err(|_| KdfError::DerivationFailed)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output)
        .map_err(|_| KdfError::DerivationFailed)?;
    Ok(output)
}

/// Generate a fresh 16-byte CSPRNG salt for a new group.
pub fn generate_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Encode a 16-byte salt as a 26-character Base32 (RFC4648, no padding,
/// `A-Z2-7`) join code shared out-of-band between group members.
pub fn encode_join_code(salt: &[u8; 16]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, salt)
}

/// Decode a join code back into a 16-byte salt. Returns `None` if the
/// code does not decode to exactly 16 bytes.
pub fn decode_join_code(code: &str) -> Option<[u8; 16]> {
    let bytes = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, code)?;
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic_per_salt() {
        let salt = generate_salt();
        let a = derive_key("correct horse battery staple", &salt, Argon2Params::default()).unwrap();
        let b = derive_key("correct horse battery staple", &salt, Argon2Params::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let salt_a = generate_salt();
        let salt_b = generate_salt();
        let a = derive_key("same passphrase here", &salt_a, Argon2Params::default()).unwrap();
        let b = derive_key("same passphrase here", &salt_b, Argon2Params::default()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn passphrase_bounds_enforced() {
        assert!(check_passphrase_bounds("short").is_err());
        assert!(check_passphrase_bounds(&"x".repeat(129)).is_err());
        assert!(check_passphrase_bounds(&"x".repeat(8)).is_ok());
        assert!(check_passphrase_bounds(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn join_code_round_trips() {
        let salt = generate_salt();
        let code = encode_join_code(&salt);
        assert_eq!(code.len(), 26);
        assert_eq!(decode_join_code(&code).unwrap(), salt);
    }

    #[test]
    fn join_code_rejects_garbage() {
        assert!(decode_join_code("not valid base32!!").is_none());
    }
}
