// Path: crates/state/src/lib.rs
#![forbid(unsafe_code)]

//! The JAM chain-state container and its commitments.
//!
//! [`State`] owns every consensus component. The transition function works
//! on a clone and the caller swaps it in only when the whole block
//! succeeded, so a failed transition never leaves a half-applied state.

pub mod history;
pub mod mmr;
pub mod persist;
pub mod serialize;

use history::RecentHistory;
use jam_crypto::RingVrfVerifier;
use jam_types::codec::{Decode, Encode};
use jam_types::disputes::JudgmentState;
use jam_types::error::{CryptoError, DecodeError};
use jam_types::params::ChainParams;
use jam_types::privileges::PrivilegedState;
use jam_types::safrole::{SafroleState, SealKeys};
use jam_types::service::ServiceAccount;
use jam_types::statistics::Statistics;
use jam_types::validator::ValidatorKey;
use jam_types::work::{PendingReport, WorkReport};
use jam_types::{BandersnatchKey, Hash, ServiceId, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A work report parked until its prerequisites accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyRecord {
    /// The available but not yet accumulable report.
    pub report: WorkReport,
    /// Package hashes still missing.
    pub deps: BTreeSet<Hash>,
    /// The timeslot the report became available.
    pub queued_at: TimeSlot,
}

impl Encode for ReadyRecord {
    fn encode_to(&self, dest: &mut Vec<u8>) {
        self.report.encode_to(dest);
        self.deps.encode_to(dest);
        self.queued_at.encode_to(dest);
    }
}

impl Decode for ReadyRecord {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            report: Decode::decode(input)?,
            deps: Decode::decode(input)?,
            queued_at: Decode::decode(input)?,
        })
    }
}

/// The complete chain state.
///
/// Field order follows the canonical component enumeration; the state root
/// hashes the fields serialized in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// α: per-core authorizer pools, each at most O entries.
    pub auth_pools: Vec<Vec<Hash>>,
    /// β: recent blocks and the accumulation-output belt.
    pub recent: RecentHistory,
    /// γ: Safrole election state.
    pub safrole: SafroleState,
    /// δ: service accounts.
    pub services: BTreeMap<ServiceId, ServiceAccount>,
    /// η: the entropy accumulator and its three epochal snapshots.
    pub entropy: [Hash; 4],
    /// ι: the staging validator set for the epoch after next.
    pub staging_set: Vec<ValidatorKey>,
    /// κ: the active validator set.
    pub current_set: Vec<ValidatorKey>,
    /// λ: the previous validator set.
    pub previous_set: Vec<ValidatorKey>,
    /// ρ: per-core pending work reports awaiting availability.
    pub reports: Vec<Option<PendingReport>>,
    /// τ: the most recent block's timeslot.
    pub timeslot: TimeSlot,
    /// φ: per-core authorizer queues, each Q entries.
    pub auth_queues: Vec<Vec<Hash>>,
    /// χ: privileged service assignments.
    pub privileges: PrivilegedState,
    /// π: activity statistics.
    pub statistics: Statistics,
    /// ω: reports waiting on unaccumulated prerequisites.
    pub ready: Vec<ReadyRecord>,
    /// ξ: recently accumulated package hashes, one set per recent block,
    /// newest last, bounded to the epoch length.
    pub accumulated: Vec<BTreeSet<Hash>>,
    /// θ: accumulation outputs of the most recent block.
    pub last_outputs: Vec<(ServiceId, Hash)>,
    /// ψ: dispute judgments and offenders.
    pub judgments: JudgmentState,
}

impl State {
    /// The union of all recently accumulated package hashes (ξ flattened).
    pub fn accumulated_union(&self) -> BTreeSet<Hash> {
        self.accumulated.iter().flatten().copied().collect()
    }

    /// Constructs the genesis state: fallback seal keys cycling the
    /// validator set, every validator set equal to `validators`, and no
    /// services, reports or history.
    pub fn genesis(
        params: &ChainParams,
        validators: Vec<ValidatorKey>,
        genesis_entropy: Hash,
        ring: &dyn RingVrfVerifier,
    ) -> Result<Self, CryptoError> {
        let bandersnatch: Vec<BandersnatchKey> =
            validators.iter().map(|v| v.bandersnatch).collect();
        let epoch_root = ring.ring_commitment(&bandersnatch)?;
        let seal_keys = SealKeys::Fallback(fallback_key_sequence(
            &bandersnatch,
            params.epoch_length,
        ));
        let cores = usize::from(params.core_count);
        Ok(Self {
            auth_pools: vec![Vec::new(); cores],
            recent: RecentHistory::default(),
            safrole: SafroleState {
                pending: validators.clone(),
                epoch_root,
                seal_keys,
                ticket_accumulator: Vec::new(),
            },
            services: BTreeMap::new(),
            entropy: [genesis_entropy; 4],
            staging_set: validators.clone(),
            current_set: validators.clone(),
            previous_set: validators,
            reports: vec![None; cores],
            timeslot: 0,
            auth_queues: vec![vec![[0; 32]; params.auth_queue_size]; cores],
            privileges: PrivilegedState {
                assigners: vec![0; cores],
                ..PrivilegedState::default()
            },
            statistics: Statistics::empty(
                usize::from(params.validator_count),
                cores,
            ),
            ready: Vec::new(),
            accumulated: Vec::new(),
            last_outputs: Vec::new(),
            judgments: JudgmentState::default(),
        })
    }
}

/// Derives the fallback seal-key table: the validator set's Bandersnatch
/// keys cycled to one entry per slot of the epoch.
pub fn fallback_key_sequence(keys: &[BandersnatchKey], length: u32) -> Vec<BandersnatchKey> {
    if keys.is_empty() {
        return Vec::new();
    }
    (0..length as usize).map(|i| keys[i % keys.len()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullRing;
    impl RingVrfVerifier for NullRing {
        fn ring_vrf_verify(
            &self,
            _root: &jam_types::RingRoot,
            _context: &[u8],
            _proof: &jam_types::RingVrfProof,
        ) -> Result<Hash, CryptoError> {
            Err(CryptoError::VerificationFailed)
        }
        fn ring_commitment(
            &self,
            _keys: &[BandersnatchKey],
        ) -> Result<jam_types::RingRoot, CryptoError> {
            Ok([0; 144])
        }
    }

    #[test]
    fn genesis_is_fallback_sealed_and_sized() {
        let params = ChainParams::tiny();
        let validators: Vec<ValidatorKey> = (0..params.validator_count)
            .map(|i| {
                let mut key = ValidatorKey::zeroed();
                key.bandersnatch[0] = i as u8 + 1;
                key
            })
            .collect();
        let state = State::genesis(&params, validators, [7; 32], &NullRing).unwrap();
        assert_eq!(state.auth_pools.len(), usize::from(params.core_count));
        assert_eq!(state.reports.len(), usize::from(params.core_count));
        assert_eq!(
            state.safrole.seal_keys.len(),
            params.epoch_length as usize
        );
        assert!(!state.safrole.seal_keys.is_ticketed());
        assert_eq!(
            state.auth_queues[0].len(),
            params.auth_queue_size
        );
    }

    #[test]
    fn fallback_sequence_cycles_the_set() {
        let keys: Vec<BandersnatchKey> = (0..5u8).map(|i| [i + 1; 32]).collect();
        let seq = fallback_key_sequence(&keys, 12);
        assert_eq!(seq.len(), 12);
        assert_eq!(seq[0], keys[0]);
        assert_eq!(seq[5], keys[0]);
        assert_eq!(seq[11], keys[1]);
    }
}
