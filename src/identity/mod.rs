//! Persistent device identity: X25519 static keypair, Ed25519 signing
//! keypair, derived [`PeerId`], and the bounded trusted-peer set.

pub mod keypair;
pub mod manager;
pub mod peer_id;
pub mod trust;

pub use keypair::{SigningKeypair, StaticKeypair};
pub use manager::{IdentityError, IdentityManager};
pub use peer_id::PeerId;
pub use trust::{TrustedPeerSet, MAX_TRUSTED_PEERS};
