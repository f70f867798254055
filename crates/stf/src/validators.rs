// Path: crates/stf/src/validators.rs
//! Epoch-boundary rotation: entropy snapshots, validator sets, seal keys
//! and statistics.

use jam_crypto::CryptoCtx;
use jam_state::{fallback_key_sequence, State};
use jam_types::error::TransitionError;
use jam_types::params::ChainParams;
use jam_types::safrole::SealKeys;
use jam_types::validator::ValidatorKey;
use jam_types::BandersnatchKey;

/// Performs every epoch-boundary rotation, in dependency order:
///
/// 1. entropy snapshots roll (`η₁,η₂,η₃ ← η₀,η₁,η₂`);
/// 2. validator sets roll (`λ ← κ`, `κ ← γ.pending`, `γ.pending ← Φ(ι)`),
///    where Φ zeroes entries whose Ed25519 key is a known offender;
/// 3. the ring commitment is recomputed over the new pending set;
/// 4. seal keys roll over: a saturated accumulator becomes the ticket
///    table, anything less falls back to cycling the incoming set's
///    Bandersnatch keys; the accumulator resets;
/// 5. statistics swap current into previous.
pub fn rotate_epoch(
    state: &mut State,
    params: &ChainParams,
    crypto: &CryptoCtx<'_>,
) -> Result<(), TransitionError> {
    let [eta0, eta1, eta2, _] = state.entropy;
    state.entropy = [eta0, eta0, eta1, eta2];

    state.previous_set = std::mem::take(&mut state.current_set);
    state.current_set = std::mem::take(&mut state.safrole.pending);
    state.safrole.pending = state
        .staging_set
        .iter()
        .map(|v| {
            if state.judgments.offenders.contains(&v.ed25519) {
                ValidatorKey::zeroed()
            } else {
                v.clone()
            }
        })
        .collect();

    let pending_keys: Vec<BandersnatchKey> = state
        .safrole
        .pending
        .iter()
        .map(|v| v.bandersnatch)
        .collect();
    state.safrole.epoch_root = crypto.ring.ring_commitment(&pending_keys)?;

    let accumulator = std::mem::take(&mut state.safrole.ticket_accumulator);
    if accumulator.len() >= params.epoch_length as usize {
        state.safrole.seal_keys =
            SealKeys::Tickets(accumulator[..params.epoch_length as usize].to_vec());
        tracing::debug!("epoch sealed from tickets");
    } else {
        let current_keys: Vec<BandersnatchKey> =
            state.current_set.iter().map(|v| v.bandersnatch).collect();
        state.safrole.seal_keys =
            SealKeys::Fallback(fallback_key_sequence(&current_keys, params.epoch_length));
        tracing::warn!(
            tickets = accumulator.len(),
            needed = params.epoch_length,
            "epoch sealed from fallback keys"
        );
    }

    state.statistics.rotate_epoch();
    Ok(())
}
