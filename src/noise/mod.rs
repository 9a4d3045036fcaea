//! Noise XX handshake engine and post-handshake transport cipher
//! (spec.md §4.3). [`symmetric`] and [`cipher_state`] are the building
//! blocks; [`handshake`] drives the 3-message pattern and hands off two
//! [`cipher_state::CipherState`]s to the caller (normally
//! [`crate::session::SessionManager`]).

pub mod cipher_state;
pub mod handshake;
pub mod symmetric;

pub use cipher_state::{CipherError, CipherState};
pub use handshake::{HandshakeError, HandshakeOutput, HandshakeState};
pub use symmetric::{SymmetricError, SymmetricState};

use thiserror::Error;

/// Unified error type for callers that drive a handshake end to end
/// without caring which stage failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}
