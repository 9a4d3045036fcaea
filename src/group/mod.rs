//! Passphrase-derived symmetric group: at most one active group per
//! device (spec.md §1 Non-goals), created/joined/left through
//! [`GroupManager`].

pub mod manager;

use crate::identity::PeerId;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use zeroize::Zeroizing;

pub use manager::{GroupError, GroupManager};

/// An active group's metadata and symmetric key. The passphrase used to
/// derive `key` is never a field here or anywhere else — it is
/// function-local in `GroupManager::create`/`join` and zeroized
/// immediately after the Argon2id call.
pub struct Group {
    pub id: [u8; 32],
    pub name: String,
    pub salt: [u8; 16],
    key: Zeroizing<[u8; 32]>,
    pub members: HashSet<PeerId>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn join_code(&self, suite: &crate::crypto::CryptoSuite) -> String {
        suite.encode_join_code(&self.salt)
    }
}
