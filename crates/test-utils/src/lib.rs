// Path: crates/test-utils/src/lib.rs
#![forbid(unsafe_code)]

//! Deterministic fixtures for exercising the JAM core without real
//! Bandersnatch cryptography.
//!
//! The fixed verifiers here accept anything except inputs explicitly marked
//! bad, and derive their VRF outputs by hashing the inputs, so tests can
//! both drive the happy path and craft specific outputs (a ring proof's
//! ticket identifier is just the Blake2b hash of the proof bytes).

pub mod asm;
pub mod vectors;

use ed25519_dalek::{Signer, SigningKey};
use jam_crypto::{blake2b, CryptoCtx, RingVrfVerifier, SealVerifier};
use jam_state::State;
use jam_types::error::CryptoError;
use jam_types::params::ChainParams;
use jam_types::validator::ValidatorKey;
use jam_types::work::{RefineContext, WorkDigest, WorkItem, WorkPackage, WorkReport, WorkResult};
use jam_types::{
    BandersnatchKey, BandersnatchSignature, Ed25519Signature, Hash, RingRoot, RingVrfProof,
};
use std::collections::BTreeMap;

/// First byte marking a signature or proof as deliberately invalid for the
/// fixed verifiers.
pub const BAD_SIG_MARKER: u8 = 0xEE;

/// A [`SealVerifier`] and [`RingVrfVerifier`] with hash-derived outputs.
pub struct FixedCrypto;

impl SealVerifier for FixedCrypto {
    fn vrf_verify(
        &self,
        key: &BandersnatchKey,
        context: &[u8],
        _payload: &[u8],
        signature: &BandersnatchSignature,
    ) -> Result<Hash, CryptoError> {
        if signature[0] == BAD_SIG_MARKER {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(blake2b(&[b"vrf".as_slice(), key, context].concat()))
    }
}

impl RingVrfVerifier for FixedCrypto {
    fn ring_vrf_verify(
        &self,
        _ring_root: &RingRoot,
        _context: &[u8],
        proof: &RingVrfProof,
    ) -> Result<Hash, CryptoError> {
        if proof[0] == BAD_SIG_MARKER {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(blake2b(proof))
    }

    fn ring_commitment(&self, keys: &[BandersnatchKey]) -> Result<RingRoot, CryptoError> {
        let mut root = [0u8; 144];
        for (i, key) in keys.iter().enumerate() {
            for (j, byte) in key.iter().enumerate() {
                root[(i + j) % 144] ^= byte;
            }
        }
        Ok(root)
    }
}

/// The crypto context used across tests.
pub fn fixed_crypto() -> CryptoCtx<'static> {
    static FIXED: FixedCrypto = FixedCrypto;
    CryptoCtx {
        seal: &FIXED,
        ring: &FIXED,
    }
}

/// A validator set with real Ed25519 keys and index-tagged Bandersnatch
/// keys, plus the signing halves for forging attestations.
pub struct TestValidators {
    /// The published key bundles, in index order.
    pub keys: Vec<ValidatorKey>,
    signers: Vec<SigningKey>,
}

impl TestValidators {
    /// A deterministic set of `count` validators.
    pub fn new(count: usize) -> Self {
        let mut keys = Vec::with_capacity(count);
        let mut signers = Vec::with_capacity(count);
        for index in 0..count {
            let seed = blake2b(&[b"validator".as_slice(), &index.to_le_bytes()].concat());
            let signing = SigningKey::from_bytes(&seed);
            let mut key = ValidatorKey::zeroed();
            key.bandersnatch = blake2b(&[b"bander".as_slice(), &index.to_le_bytes()].concat());
            key.ed25519 = signing.verifying_key().to_bytes();
            key.bls[0] = index as u8;
            keys.push(key);
            signers.push(signing);
        }
        Self { keys, signers }
    }

    /// Signs `domain ++ message` as validator `index`.
    pub fn sign(&self, index: usize, domain: &[u8], message: &[u8]) -> Ed25519Signature {
        let payload = [domain, message].concat();
        self.signers[index].sign(&payload).to_bytes()
    }
}

/// The tiny parameter profile used by almost every test.
pub fn tiny_params() -> ChainParams {
    ChainParams::tiny()
}

/// A genesis state over `validators` with the fixed crypto context.
pub fn genesis_state(params: &ChainParams, validators: &TestValidators) -> State {
    State::genesis(params, validators.keys.clone(), [7; 32], &FixedCrypto)
        .expect("genesis construction")
}

/// A minimal work report for `core` with a single successful digest owned
/// by `service`.
pub fn report_for(core: u16, service: u32, anchor: Hash, output: &[u8]) -> WorkReport {
    let context = RefineContext {
        anchor,
        state_root: [0; 32],
        accumulation_root: [0; 32],
        lookup_anchor: anchor,
        lookup_slot: 0,
        prerequisites: vec![],
    };
    WorkReport {
        specification: WorkPackage {
            auth_token: vec![],
            auth_service: service,
            auth_code_hash: [3; 32],
            auth_config: vec![],
            context: context.clone(),
            items: vec![WorkItem {
                service,
                code_hash: [4; 32],
                payload: output.to_vec(),
                refine_gas: 1_000,
                accumulate_gas: 10_000,
                imports: vec![],
                extrinsics: vec![],
                export_count: 0,
            }],
        },
        context,
        core_index: core,
        authorizer_hash: [5; 32],
        gas_used: 800,
        trace: vec![],
        segment_roots: BTreeMap::new(),
        digests: vec![WorkDigest {
            service,
            code_hash: [4; 32],
            payload_hash: blake2b(output),
            accumulate_gas: 10_000,
            gas_used: 700,
            result: WorkResult::Ok(output.to_vec()),
        }],
    }
}
