//! SHA-256 helpers for the transport domain.
//!
//! Everything that travels outside the circuit — transaction digests,
//! header hashes, Merkle nodes — is SHA-256. Circuit-side hashing lives
//! in [`super::mimc`] and the two must never be interchanged.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data` as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices as if they were concatenated, without the
/// temporary buffer. Used for Merkle parent nodes (`left || right`) and
/// header preimages.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the canonical test vector.
        let digest = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(digest.as_slice(), expected.as_slice());
    }

    #[test]
    fn sha256_deterministic() {
        assert_eq!(sha256(b"rollup"), sha256(b"rollup"));
        assert_ne!(sha256(b"rollup"), sha256(b"Rollup"));
    }

    #[test]
    fn concat_matches_single_buffer() {
        let joined = sha256(b"hello world");
        let parts = sha256_concat(&[b"hello", b" ", b"world"]);
        assert_eq!(joined, parts);
    }
}
