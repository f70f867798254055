// Path: crates/stf/src/header.rs
//! Header validation: chain position, markers and the seal.

use jam_crypto::CryptoCtx;
use jam_state::State;
use jam_types::block::{Block, EpochMark, Header};
use jam_types::codec::Encode;
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::safrole::SealKeys;
use jam_types::Hash;

/// Extra wall-clock tolerance, in slots, for blocks from the near future.
const FUTURE_TOLERANCE_SLOTS: u64 = 1;

/// Structural checks that need no cryptography: timeslot monotonicity, the
/// wall clock, the parent link and the extrinsic commitment.
pub fn check_structure(
    state: &State,
    block: &Block,
    params: &ChainParams,
    wall_clock: u64,
) -> Result<(), TransitionError> {
    let header = &block.header;
    if header.timeslot <= state.timeslot {
        return Err(TransitionError::BadHeader(format!(
            "timeslot {} not after {}",
            header.timeslot, state.timeslot
        )));
    }
    let earliest = u64::from(header.timeslot) * u64::from(params.slot_period);
    if earliest > wall_clock + FUTURE_TOLERANCE_SLOTS * u64::from(params.slot_period) {
        return Err(TransitionError::BadHeader("block from the future".into()));
    }
    let genesis = header.parent_hash == [0u8; 32] && state.recent.blocks.is_empty();
    if !genesis && !state.recent.contains_header(&header.parent_hash) {
        return Err(TransitionError::BadHeader("unknown parent".into()));
    }
    let extrinsic_hash = jam_crypto::blake2b(&block.extrinsic.encode());
    if header.extrinsic_hash != extrinsic_hash {
        return Err(TransitionError::BadHeader("extrinsic hash mismatch".into()));
    }
    if usize::from(header.author_index) >= state.current_set.len() {
        return Err(TransitionError::BadHeader("author index out of range".into()));
    }
    Ok(())
}

/// Validates the epoch and winning-tickets markers against the (already
/// rotated, when crossing) posterior election state.
pub fn check_markers(
    prior: &State,
    next: &State,
    header: &Header,
    params: &ChainParams,
    crossing: bool,
) -> Result<(), TransitionError> {
    let expected_epoch_mark = crossing.then(|| EpochMark {
        entropy: next.entropy[2],
        validators: next.safrole.pending.iter().map(|v| v.bandersnatch).collect(),
    });
    if header.epoch_mark != expected_epoch_mark {
        return Err(TransitionError::BadHeader("epoch marker mismatch".into()));
    }

    // The winning-tickets marker appears exactly on the block that closes a
    // saturated submission window, inside the epoch.
    let submission_end = params.epoch_length - params.ticket_tail;
    let closes_window = !crossing
        && params.slot_phase(prior.timeslot) < submission_end
        && params.slot_phase(header.timeslot) >= submission_end
        && prior.safrole.ticket_accumulator.len() == params.epoch_length as usize;
    let expected_tickets = closes_window.then(|| prior.safrole.ticket_accumulator.clone());
    if header.winning_tickets != expected_tickets {
        return Err(TransitionError::BadHeader(
            "winning-tickets marker mismatch".into(),
        ));
    }
    Ok(())
}

/// Verifies the seal against the slot's seal key and the entropy VRF
/// signature against the seal output. Returns the entropy VRF output that
/// feeds the accumulator.
pub fn verify_seal(
    next: &State,
    header: &Header,
    params: &ChainParams,
    crypto: &CryptoCtx<'_>,
) -> Result<Hash, TransitionError> {
    let phase = params.slot_phase(header.timeslot) as usize;
    let author = next
        .current_set
        .get(usize::from(header.author_index))
        .ok_or_else(|| TransitionError::BadHeader("author index out of range".into()))?;
    let unsealed = header.encode_unsealed();

    let seal_output = match &next.safrole.seal_keys {
        SealKeys::Tickets(tickets) => {
            let ticket = tickets
                .get(phase)
                .ok_or_else(|| TransitionError::BadSeal("no seal key for slot".into()))?;
            let mut context = domains::TICKET_SEAL.to_vec();
            context.extend_from_slice(&next.entropy[3]);
            context.push(ticket.attempt);
            let output = crypto
                .seal
                .vrf_verify(&author.bandersnatch, &context, &unsealed, &header.seal)?;
            if output != ticket.id {
                return Err(TransitionError::BadSeal(
                    "seal output does not match the slot ticket".into(),
                ));
            }
            output
        }
        SealKeys::Fallback(keys) => {
            let expected = keys
                .get(phase)
                .ok_or_else(|| TransitionError::BadSeal("no seal key for slot".into()))?;
            if *expected != author.bandersnatch {
                return Err(TransitionError::BadSeal(
                    "author does not hold the slot key".into(),
                ));
            }
            let mut context = domains::FALLBACK_SEAL.to_vec();
            context.extend_from_slice(&next.entropy[3]);
            crypto
                .seal
                .vrf_verify(&author.bandersnatch, &context, &unsealed, &header.seal)?
        }
    };

    let mut context = domains::ENTROPY.to_vec();
    context.extend_from_slice(&seal_output);
    let output = crypto
        .seal
        .vrf_verify(&author.bandersnatch, &context, &[], &header.vrf_signature)?;
    Ok(output)
}

/// True when this header directly extends `state` (used by chain drivers,
/// not by `apply` itself).
pub fn extends(state: &State, header: &Header) -> bool {
    match state.recent.blocks.last() {
        Some(last) => last.header_hash == header.parent_hash,
        None => header.parent_hash == [0u8; 32],
    }
}
