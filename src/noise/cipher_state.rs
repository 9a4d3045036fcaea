//! Transport-mode `CipherState`: ChaCha20-Poly1305 with a monotonic
//! 8-byte counter nonce and a 1024-bit sliding replay window on the
//! receive side (spec.md §4.3). This is the *post-handshake* cipher used
//! by [`crate::session::SessionManager`]; the handshake's own internal
//! cipher (sequential, no replay window, reset on every `mix_key`) lives
//! in [`super::symmetric`].

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use thiserror::Error;
use zeroize::Zeroize;

/// Counter values are valid in `0..=MAX_COUNTER`; `MAX_COUNTER + 1` would
/// wrap the low 8 bytes of a 12-byte nonce alongside the BLE wire frame's
/// 4-byte extracted low word, so encryption refuses to proceed at that
/// point and the caller must rekey via a fresh handshake.
pub const MAX_COUNTER: u64 = 0xFFFF_FFFF;
const REPLAY_WINDOW_BITS: u64 = 1024;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[error("send counter exhausted, rekey required")]
    CounterExhausted,
    #[error("decryption failed (forged or corrupted frame)")]
    DecryptionFailed,
    #[error("replay: counter already seen or too old")]
    Replay,
    #[error("cipher has no key (session not established)")]
    NoKey,
}

pub type Result<T> = std::result::Result<T, CipherError>;

/// Sliding window of the most recently accepted counters, anchored at the
/// highest one seen so far (spec.md §4.3, §8).
struct ReplayWindow {
    highest: Option<u64>,
    /// Bit `i` set means `highest - i` has been accepted.
    bits: [u64; (REPLAY_WINDOW_BITS / 64) as usize],
}

impl ReplayWindow {
    fn new() -> Self {
        Self {
            highest: None,
            bits: [0u64; (REPLAY_WINDOW_BITS / 64) as usize],
        }
    }

    fn word_and_bit(offset: u64) -> (usize, u32) {
        ((offset / 64) as usize, (offset % 64) as u32)
    }

    /// Returns `true` if `counter` is acceptable (not already seen, not
    /// older than the window), without mutating state.
    fn check(&self, counter: u64) -> bool {
        let Some(highest) = self.highest else {
            return true;
        };
        if counter > highest {
            return true;
        }
        let offset = highest - counter;
        if offset >= REPLAY_WINDOW_BITS {
            return false;
        }
        let (word, bit) = Self::word_and_bit(offset);
        self.bits[word] & (1 << bit) == 0
    }

    /// Record `counter` as accepted. Must only be called after the AEAD
    /// decrypt for this counter has already succeeded.
    fn accept(&mut self, counter: u64) {
        match self.highest {
            None => {
                self.highest = Some(counter);
                self.bits = [0u64; (REPLAY_WINDOW_BITS / 64) as usize];
                let (word, bit) = Self::word_and_bit(0);
                self.bits[word] |= 1 << bit;
            }
            Some(highest) if counter > highest => {
                let shift = counter - highest;
                if shift >= REPLAY_WINDOW_BITS {
                    self.bits = [0u64; (REPLAY_WINDOW_BITS / 64) as usize];
                } else {
                    // Shift the whole bitmap left by `shift` bits.
                    for _ in 0..shift {
                        let mut carry = 0u64;
                        for word in self.bits.iter_mut() {
                            let new_carry = *word >> 63;
                            *word = (*word << 1) | carry;
                            carry = new_carry;
                        }
                    }
                }
                self.highest = Some(counter);
                let (word, bit) = Self::word_and_bit(0);
                self.bits[word] |= 1 << bit;
            }
            Some(highest) => {
                let offset = highest - counter;
                if offset < REPLAY_WINDOW_BITS {
                    let (word, bit) = Self::word_and_bit(offset);
                    self.bits[word] |= 1 << bit;
                }
            }
        }
    }
}

/// Transport-direction symmetric cipher: one per direction, produced in
/// pairs by [`super::handshake::HandshakeState::split`].
pub struct CipherState {
    key: Option<[u8; 32]>,
    counter: u64,
    replay: Option<ReplayWindow>,
}

impl CipherState {
    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self {
            key: Some(key),
            counter: 0,
            replay: None,
        }
    }

    /// Enable replay-window tracking for the receive direction. Only
    /// the `CipherState` used to decrypt inbound frames needs this.
    pub fn enable_replay_window(&mut self) {
        if self.replay.is_none() {
            self.replay = Some(ReplayWindow::new());
        }
    }

    fn nonce_for(counter: u64) -> Nonce {
        let mut bytes = [0u8; 12];
        bytes[4..].copy_from_slice(&counter.to_be_bytes());
        *Nonce::from_slice(&bytes)
    }

    /// Encrypt `plaintext`. Returns `(counter_used, wire_frame)` where
    /// `wire_frame` is `counter_low4_be || ciphertext`, matching the
    /// "prepend the 4-byte big-endian low word of the nonce" wire rule.
    /// The send counter only advances after this call returns `Ok`.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.ok_or(CipherError::NoKey)?;
        if self.counter >= MAX_COUNTER {
            return Err(CipherError::CounterExhausted);
        }
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = Self::nonce_for(self.counter);
        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad: &[] })
            .expect("chacha20poly1305 encrypt with valid key/nonce cannot fail");

        let counter_low: u32 = self.counter as u32;
        let mut frame = Vec::with_capacity(4 + ciphertext.len());
        frame.extend_from_slice(&counter_low.to_be_bytes());
        frame.extend_from_slice(&ciphertext);

        self.counter += 1;
        Ok(frame)
    }

    /// Decrypt a wire frame produced by [`CipherState::encrypt`]. The
    /// counter is taken from the frame's prepended 4 bytes, checked
    /// against the replay window *before* attempting AEAD decryption,
    /// and only recorded as seen once decryption succeeds.
    pub fn decrypt(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.ok_or(CipherError::NoKey)?;
        if frame.len() < 4 {
            return Err(CipherError::DecryptionFailed);
        }
        let counter = u32::from_be_bytes(frame[..4].try_into().unwrap()) as u64;

        if let Some(replay) = &self.replay {
            if !replay.check(counter) {
                return Err(CipherError::Replay);
            }
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let nonce = Self::nonce_for(counter);
        let plaintext = cipher
            .decrypt(&nonce, Payload { msg: &frame[4..], aad: &[] })
            .map_err(|_| CipherError::DecryptionFailed)?;

        if let Some(replay) = &mut self.replay {
            replay.accept(counter);
        }
        Ok(plaintext)
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Zero the key material. Called from both success and failure
    /// disposal paths (spec.md §4.3 "Both CipherStates zero their key
    /// material on clear()").
    pub fn clear(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.zeroize();
        }
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trips() {
        let key = [3u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);
        recv.enable_replay_window();

        let frame = send.encrypt(b"hello").unwrap();
        let pt = recv.decrypt(&frame).unwrap();
        assert_eq!(pt, b"hello");
    }

    #[test]
    fn counter_increments_on_success() {
        let mut send = CipherState::new([1u8; 32]);
        assert_eq!(send.counter(), 0);
        send.encrypt(b"a").unwrap();
        assert_eq!(send.counter(), 1);
        send.encrypt(b"b").unwrap();
        assert_eq!(send.counter(), 2);
    }

    #[test]
    fn decrypt_of_replayed_counter_is_rejected() {
        let key = [5u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);
        recv.enable_replay_window();

        let frame = send.encrypt(b"msg").unwrap();
        assert!(recv.decrypt(&frame).is_ok());
        assert_eq!(recv.decrypt(&frame), Err(CipherError::Replay));
    }

    #[test]
    fn decrypt_below_window_floor_is_rejected() {
        let key = [6u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);
        recv.enable_replay_window();

        let first = send.encrypt(b"first").unwrap();
        for _ in 0..1100 {
            let f = send.encrypt(b"x").unwrap();
            recv.decrypt(&f).unwrap();
        }
        assert_eq!(recv.decrypt(&first), Err(CipherError::Replay));
    }

    #[test]
    fn decrypt_failure_does_not_advance_counter() {
        let key = [8u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);
        recv.enable_replay_window();

        let mut frame = send.encrypt(b"tampered").unwrap();
        *frame.last_mut().unwrap() ^= 0xFF;
        assert!(recv.decrypt(&frame).is_err());
        // Counter-0 is still fresh: a correctly encrypted message at
        // counter 0 must still be acceptable.
        let good = {
            let mut s2 = CipherState::new(key);
            s2.encrypt(b"tampered").unwrap()
        };
        assert!(recv.decrypt(&good).is_ok());
    }

    #[test]
    fn encrypt_fails_at_counter_exhaustion_and_session_must_rekey() {
        let mut send = CipherState::new([9u8; 32]);
        send.counter = MAX_COUNTER - 1;
        assert!(send.encrypt(b"ok").is_ok()); // consumes MAX_COUNTER - 1
        assert_eq!(send.counter(), MAX_COUNTER);
        assert_eq!(send.encrypt(b"over"), Err(CipherError::CounterExhausted));
    }

    #[test]
    fn clear_zeroes_key_so_further_use_fails() {
        let mut send = CipherState::new([4u8; 32]);
        send.clear();
        assert_eq!(send.encrypt(b"x"), Err(CipherError::NoKey));
    }
}
