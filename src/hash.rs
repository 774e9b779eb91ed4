//! The hash primitive used for password verification and document-content
//! comparison: a pure SHA-1 digest, as required by the wire format's
//! 20-byte hash field.

use sha1::{Digest, Sha1};

use crate::protocol::Hash;

/// Compute the SHA-1 digest of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_sha1() {
        // SHA-1("") = da39a3ee5e6b4b0d3255bfef95601890afd80709
        let digest = hash_bytes(b"");
        assert_eq!(
            digest,
            [
                0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95,
                0x60, 0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09,
            ]
        );
    }

    #[test]
    fn differing_inputs_hash_differently() {
        assert_ne!(hash_bytes(b"x"), hash_bytes(b"y"));
    }

    #[test]
    fn same_input_hashes_identically() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
    }
}
