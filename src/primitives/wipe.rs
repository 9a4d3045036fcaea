//! Secure byte wipe for secret-holding buffers that for some reason can't
//! derive [`zeroize::Zeroize`] directly (e.g. a `Vec<u8>` returned from an
//! FFI boundary). Prefer `#[derive(Zeroize, ZeroizeOnDrop)]` on new types;
//! use this for one-off buffers.

use zeroize::Zeroize;

/// Overwrite `bytes` with zeros in place. Does not change the length.
pub fn wipe_bytes(bytes: &mut [u8]) {
    bytes.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_zeroes_all_bytes() {
        let mut secret = vec![0xAAu8; 16];
        wipe_bytes(&mut secret);
        assert_eq!(secret, vec![0u8; 16]);
    }
}
