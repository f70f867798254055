// Path: crates/state/src/persist.rs
//! Loading and saving state through a column backend.
//!
//! The mapping is stable: service accounts keyed by id in `SERVICE`,
//! per-core authorization data in `AUTH`, history and availability in
//! `RECENT`, validator and election material in `VALIDATORS`, counters in
//! `STATS`. Consensus never depends on intra-column ordering.

use crate::history::RecentHistory;
use crate::{ReadyRecord, State};
use jam_storage::{Backend, Column, StorageError};
use jam_types::codec::{decode_exact, Decode, Encode};
use jam_types::error::DecodeError;
use jam_types::service::ServiceAccount;
use jam_types::work::PendingReport;
use jam_types::{Hash, ServiceId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors from state persistence.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// The backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// A stored value failed to decode.
    #[error("Corrupt stored value under {key}: {source}")]
    Corrupt {
        /// The offending key, rendered for diagnostics.
        key: String,
        /// The decode failure.
        source: DecodeError,
    },
    /// A required key was absent.
    #[error("Missing stored value: {0}")]
    Missing(&'static str),
}

const K_HISTORY: &[u8] = b"history";
const K_PENDING: &[u8] = b"pending";
const K_READY: &[u8] = b"ready";
const K_ACCUMULATED: &[u8] = b"accumulated";
const K_OUTPUTS: &[u8] = b"outputs";
const K_SAFROLE: &[u8] = b"safrole";
const K_ENTROPY: &[u8] = b"entropy";
const K_STAGING: &[u8] = b"staging";
const K_CURRENT: &[u8] = b"current";
const K_PREVIOUS: &[u8] = b"previous";
const K_TIMESLOT: &[u8] = b"timeslot";
const K_PRIVILEGES: &[u8] = b"privileges";
const K_JUDGMENTS: &[u8] = b"judgments";
const K_STATS: &[u8] = b"stats";

fn decode_stored<T: Decode>(key: &[u8], bytes: &[u8]) -> Result<T, StateStoreError> {
    decode_exact(bytes).map_err(|source| StateStoreError::Corrupt {
        key: String::from_utf8_lossy(key).into_owned(),
        source,
    })
}

fn get_required<T: Decode>(
    backend: &dyn Backend,
    col: Column,
    key: &'static [u8],
    name: &'static str,
) -> Result<T, StateStoreError> {
    let bytes = backend
        .get(col, key)?
        .ok_or(StateStoreError::Missing(name))?;
    decode_stored(key, &bytes)
}

/// Stages the whole state into the backend buffer. The caller decides when
/// to `commit`, which is what makes a block application atomic.
pub fn save_state(state: &State, backend: &mut dyn Backend) -> Result<(), StateStoreError> {
    // Replace the service column wholesale: deletions must not survive.
    for (key, _) in backend.pairs(Column::Service)? {
        backend.delete(Column::Service, &key);
    }
    for (id, account) in &state.services {
        backend.put(Column::Service, &id.to_le_bytes(), account.encode());
    }

    for (core, (pool, queue)) in state
        .auth_pools
        .iter()
        .zip(state.auth_queues.iter())
        .enumerate()
    {
        // Big-endian keys so lexicographic column order is core order.
        let value = (pool.clone(), queue.clone()).encode();
        backend.put(Column::Auth, &(core as u16).to_be_bytes(), value);
    }

    backend.put(Column::Recent, K_HISTORY, state.recent.encode());
    backend.put(Column::Recent, K_PENDING, state.reports.encode());
    backend.put(Column::Recent, K_READY, state.ready.encode());
    backend.put(Column::Recent, K_ACCUMULATED, state.accumulated.encode());
    backend.put(Column::Recent, K_OUTPUTS, state.last_outputs.encode());

    backend.put(Column::Validators, K_SAFROLE, state.safrole.encode());
    let mut entropy = Vec::with_capacity(128);
    for e in &state.entropy {
        e.encode_to(&mut entropy);
    }
    backend.put(Column::Validators, K_ENTROPY, entropy);
    backend.put(Column::Validators, K_STAGING, state.staging_set.encode());
    backend.put(Column::Validators, K_CURRENT, state.current_set.encode());
    backend.put(Column::Validators, K_PREVIOUS, state.previous_set.encode());
    backend.put(Column::Validators, K_TIMESLOT, state.timeslot.encode());
    backend.put(Column::Validators, K_PRIVILEGES, state.privileges.encode());
    backend.put(Column::Validators, K_JUDGMENTS, state.judgments.encode());

    backend.put(Column::Stats, K_STATS, state.statistics.encode());
    Ok(())
}

/// Reconstructs the state from a backend.
pub fn load_state(backend: &dyn Backend) -> Result<State, StateStoreError> {
    let mut services = BTreeMap::new();
    for (key, value) in backend.pairs(Column::Service)? {
        let mut id_bytes = [0u8; 4];
        if key.len() != 4 {
            return Err(StateStoreError::Corrupt {
                key: hex::encode(&key),
                source: DecodeError::InvalidLength(key.len() as u64),
            });
        }
        id_bytes.copy_from_slice(&key);
        let id = ServiceId::from_le_bytes(id_bytes);
        services.insert(id, decode_stored::<ServiceAccount>(&key, &value)?);
    }

    let mut auth_pools = Vec::new();
    let mut auth_queues = Vec::new();
    for (key, value) in backend.pairs(Column::Auth)? {
        let (pool, queue): (Vec<Hash>, Vec<Hash>) = decode_stored(&key, &value)?;
        auth_pools.push(pool);
        auth_queues.push(queue);
    }

    let recent: RecentHistory = get_required(backend, Column::Recent, K_HISTORY, "history")?;
    let reports: Vec<Option<PendingReport>> =
        get_required(backend, Column::Recent, K_PENDING, "pending")?;
    let ready: Vec<ReadyRecord> = get_required(backend, Column::Recent, K_READY, "ready")?;
    let accumulated: Vec<BTreeSet<Hash>> =
        get_required(backend, Column::Recent, K_ACCUMULATED, "accumulated")?;
    let last_outputs: Vec<(ServiceId, Hash)> =
        get_required(backend, Column::Recent, K_OUTPUTS, "outputs")?;

    let safrole = get_required(backend, Column::Validators, K_SAFROLE, "safrole")?;
    let entropy_bytes = backend
        .get(Column::Validators, K_ENTROPY)?
        .ok_or(StateStoreError::Missing("entropy"))?;
    if entropy_bytes.len() != 128 {
        return Err(StateStoreError::Corrupt {
            key: "entropy".into(),
            source: DecodeError::InvalidLength(entropy_bytes.len() as u64),
        });
    }
    let mut entropy = [[0u8; 32]; 4];
    for (i, chunk) in entropy_bytes.chunks_exact(32).enumerate() {
        entropy[i].copy_from_slice(chunk);
    }
    let staging_set = get_required(backend, Column::Validators, K_STAGING, "staging")?;
    let current_set = get_required(backend, Column::Validators, K_CURRENT, "current")?;
    let previous_set = get_required(backend, Column::Validators, K_PREVIOUS, "previous")?;
    let timeslot = get_required(backend, Column::Validators, K_TIMESLOT, "timeslot")?;
    let privileges = get_required(backend, Column::Validators, K_PRIVILEGES, "privileges")?;
    let judgments = get_required(backend, Column::Validators, K_JUDGMENTS, "judgments")?;
    let statistics = get_required(backend, Column::Stats, K_STATS, "stats")?;

    Ok(State {
        auth_pools,
        recent,
        safrole,
        services,
        entropy,
        staging_set,
        current_set,
        previous_set,
        reports,
        timeslot,
        auth_queues,
        privileges,
        statistics,
        ready,
        accumulated,
        last_outputs,
        judgments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_crypto::RingVrfVerifier;
    use jam_storage::MemoryBackend;
    use jam_types::error::CryptoError;
    use jam_types::params::ChainParams;
    use jam_types::validator::ValidatorKey;
    use jam_types::{BandersnatchKey, RingRoot, RingVrfProof};

    struct NullRing;
    impl RingVrfVerifier for NullRing {
        fn ring_vrf_verify(
            &self,
            _root: &RingRoot,
            _context: &[u8],
            _proof: &RingVrfProof,
        ) -> Result<Hash, CryptoError> {
            Err(CryptoError::VerificationFailed)
        }
        fn ring_commitment(&self, _keys: &[BandersnatchKey]) -> Result<RingRoot, CryptoError> {
            Ok([0; 144])
        }
    }

    #[test]
    fn save_load_round_trip() {
        let params = ChainParams::tiny();
        let validators = vec![ValidatorKey::zeroed(); params.validator_count as usize];
        let mut state = State::genesis(&params, validators, [5; 32], &NullRing).unwrap();
        state
            .services
            .insert(7, jam_types::service::ServiceAccount::new([1; 32], 500, 0, 7));
        state.timeslot = 42;

        let mut backend = MemoryBackend::new();
        save_state(&state, &mut backend).unwrap();
        backend.commit().unwrap();

        let loaded = load_state(&backend).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn deleted_service_does_not_survive_resave() {
        let params = ChainParams::tiny();
        let validators = vec![ValidatorKey::zeroed(); params.validator_count as usize];
        let mut state = State::genesis(&params, validators, [5; 32], &NullRing).unwrap();
        state
            .services
            .insert(7, jam_types::service::ServiceAccount::new([1; 32], 500, 0, 7));

        let mut backend = MemoryBackend::new();
        save_state(&state, &mut backend).unwrap();
        backend.commit().unwrap();

        state.services.remove(&7);
        save_state(&state, &mut backend).unwrap();
        backend.commit().unwrap();

        let loaded = load_state(&backend).unwrap();
        assert!(loaded.services.is_empty());
    }

    #[test]
    fn missing_component_is_reported() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            load_state(&backend),
            Err(StateStoreError::Missing("history"))
        ));
    }
}
