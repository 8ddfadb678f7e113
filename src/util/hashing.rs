//! SHA-256 helpers for content fingerprints.
//!
//! Fingerprints are always taken over whitespace-trimmed text so that the
//! number of trailing newlines a file happens to end with never changes its
//! identity.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Returns the fingerprint of a piece of text: the hex SHA-256 of its trimmed form.
pub(crate) fn content_fingerprint(content: &str) -> String {
    sha256_hex(content.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"Hello, world!"),
            "315f5bdb76d078c43b8ac0064e4a0164612b1fce77c869345bfc94c75894edd3"
        );
    }

    #[test]
    fn sha256_hex_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(
            content_fingerprint("# Title\nbody"),
            content_fingerprint("\n\n# Title\nbody\n\n\n")
        );
    }

    #[test]
    fn fingerprint_is_sensitive_to_inner_changes() {
        assert_ne!(
            content_fingerprint("# Title\nbody"),
            content_fingerprint("# Title\nbody!")
        );
    }

    #[test]
    fn fingerprint_has_fixed_length() {
        assert_eq!(content_fingerprint("anything").len(), 64);
    }
}
