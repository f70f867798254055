// Path: crates/crypto/src/lib.rs
#![forbid(unsafe_code)]

//! Cryptographic primitives for the JAM core.
//!
//! Two concerns live here: the concrete hash functions (Blake2b-256 and
//! Keccak-256) plus Ed25519 verification, and the trait surface for the
//! Bandersnatch VRF constructions that remain external black boxes.

pub mod hash;
pub mod sign;
pub mod vrf;

pub use hash::{blake2b, blake2b_pair, keccak256, HashFn};
pub use sign::verify_ed25519;
pub use vrf::{CryptoCtx, RingVrfVerifier, SealVerifier};
