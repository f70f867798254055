// Path: crates/crypto/src/hash.rs
//! The two hash functions of the protocol.
//!
//! Blake2b-256 is the primary hash for state, packages and preimages;
//! Keccak-256 is reserved for the accumulation-log mountain range where
//! external proof systems need Ethereum-compatible digests. Components that
//! must be parameterized over the choice take a [`HashFn`].

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use jam_types::Hash;
use sha3::Keccak256;

type Blake2b256 = Blake2b<U32>;

/// A hash function usable where the algorithm is injected.
pub type HashFn = fn(&[u8]) -> Hash;

/// Blake2b-256 of `data`.
pub fn blake2b(data: &[u8]) -> Hash {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Blake2b-256 over the concatenation of two inputs, avoiding a copy at the
/// call sites that fold hash chains.
pub fn blake2b_pair(a: &[u8], b: &[u8]) -> Hash {
    let mut hasher = Blake2b256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_known_answer() {
        // Blake2b-256 of the empty string.
        assert_eq!(
            hex::encode(blake2b(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn keccak_known_answer() {
        // Keccak-256 of the empty string.
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn pair_matches_concatenation() {
        assert_eq!(blake2b_pair(b"ab", b"cd"), blake2b(b"abcd"));
    }
}
