// Path: crates/crypto/src/vrf.rs
//! Bandersnatch VRF verification delegates.
//!
//! The ring-VRF and plain VRF constructions are consensus black boxes: the
//! core needs their outputs and accept/reject decisions, not their algebra.
//! Implementations plug in behind these traits; the transition function
//! carries them in a [`CryptoCtx`] rather than reaching for globals.

use jam_types::error::CryptoError;
use jam_types::{BandersnatchKey, BandersnatchSignature, Hash, RingRoot, RingVrfProof};

/// Plain (non-ring) Bandersnatch VRF verification.
pub trait SealVerifier {
    /// Verifies `signature` by `key` over the VRF input `context`, with
    /// `payload` as associated (signed but non-input) data. Returns the
    /// 32-byte VRF output on success.
    fn vrf_verify(
        &self,
        key: &BandersnatchKey,
        context: &[u8],
        payload: &[u8],
        signature: &BandersnatchSignature,
    ) -> Result<Hash, CryptoError>;
}

/// Ring-VRF verification against an epoch's ring commitment.
pub trait RingVrfVerifier {
    /// Verifies `proof` against `ring_root` over the VRF input `context`.
    /// Returns the 32-byte VRF output (the ticket identifier) on success.
    fn ring_vrf_verify(
        &self,
        ring_root: &RingRoot,
        context: &[u8],
        proof: &RingVrfProof,
    ) -> Result<Hash, CryptoError>;

    /// Computes the ring commitment of an ordered validator key set.
    fn ring_commitment(&self, keys: &[BandersnatchKey]) -> Result<RingRoot, CryptoError>;
}

/// The cryptographic capabilities handed to the transition function.
#[derive(Clone, Copy)]
pub struct CryptoCtx<'a> {
    /// Seal and entropy VRF verification.
    pub seal: &'a dyn SealVerifier,
    /// Ticket ring-VRF verification and ring commitments.
    pub ring: &'a dyn RingVrfVerifier,
}
