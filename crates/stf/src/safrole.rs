// Path: crates/stf/src/safrole.rs
//! Safrole ticket admission (γ′).

use jam_crypto::CryptoCtx;
use jam_state::State;
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::safrole::{Ticket, TicketEnvelope};
use jam_types::Hash;

/// Verifies and merges submitted tickets into the accumulator.
///
/// Tickets are only admissible while the submission window is open
/// (`slot mod E < E − Y`); each must carry a valid ring-VRF proof against
/// the pending set's epoch root and the η₂ entropy, arrive in strictly
/// increasing identifier order, and not collide with the accumulator. The
/// merged accumulator keeps the E smallest identifiers.
pub fn apply_tickets(
    state: &mut State,
    envelopes: &[TicketEnvelope],
    params: &ChainParams,
    crypto: &CryptoCtx<'_>,
) -> Result<(), TransitionError> {
    if envelopes.is_empty() {
        return Ok(());
    }
    let phase = params.slot_phase(state.timeslot);
    if phase >= params.epoch_length - params.ticket_tail {
        return Err(TransitionError::UnexpectedTicket);
    }
    if envelopes.len() > params.max_tickets_per_block {
        return Err(TransitionError::BadExtrinsic(format!(
            "{} tickets exceed the per-block limit",
            envelopes.len()
        )));
    }

    let mut incoming: Vec<Ticket> = Vec::with_capacity(envelopes.len());
    let mut prev_id: Option<Hash> = None;
    for envelope in envelopes {
        if envelope.attempt >= params.ticket_attempts {
            return Err(TransitionError::BadTicketAttempt);
        }
        let mut context = domains::TICKET_SEAL.to_vec();
        context.extend_from_slice(&state.entropy[2]);
        context.push(envelope.attempt);
        let id = crypto
            .ring
            .ring_vrf_verify(&state.safrole.epoch_root, &context, &envelope.signature)
            .map_err(|_| TransitionError::BadTicketProof)?;
        if let Some(prev) = prev_id {
            if id <= prev {
                return Err(TransitionError::BadTicketOrder);
            }
        }
        prev_id = Some(id);
        if state
            .safrole
            .ticket_accumulator
            .iter()
            .any(|t| t.id == id)
        {
            return Err(TransitionError::DuplicateTicket);
        }
        incoming.push(Ticket {
            id,
            attempt: envelope.attempt,
        });
    }

    let accumulator = &mut state.safrole.ticket_accumulator;
    accumulator.extend(incoming);
    accumulator.sort();
    accumulator.truncate(params.epoch_length as usize);
    tracing::debug!(
        len = accumulator.len(),
        target = params.epoch_length,
        "ticket accumulator updated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::{params, small_state};
    use jam_crypto::blake2b;
    use jam_test_utils::{fixed_crypto, BAD_SIG_MARKER};

    fn envelope(tag: u8, attempt: u8) -> (TicketEnvelope, Hash) {
        let mut signature = [0u8; 784];
        signature[1] = tag;
        let id = blake2b(&signature);
        (TicketEnvelope { attempt, signature }, id)
    }

    /// Envelopes sorted by the identifier the fixed verifier will derive.
    fn sorted_envelopes(count: usize) -> Vec<(TicketEnvelope, Hash)> {
        let mut all: Vec<(TicketEnvelope, Hash)> =
            (0..count).map(|i| envelope(i as u8 + 1, 0)).collect();
        all.sort_by_key(|(_, id)| *id);
        all
    }

    #[test]
    fn tickets_merge_sorted() {
        let mut state = small_state();
        let crypto = fixed_crypto();
        let envelopes = sorted_envelopes(3);
        let wire: Vec<TicketEnvelope> = envelopes.iter().map(|(e, _)| e.clone()).collect();
        apply_tickets(&mut state, &wire, &params(), &crypto).unwrap();
        let ids: Vec<Hash> = state.safrole.ticket_accumulator.iter().map(|t| t.id).collect();
        let mut expected: Vec<Hash> = envelopes.iter().map(|(_, id)| *id).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn window_boundary_is_exact() {
        let p = params();
        let crypto = fixed_crypto();
        let open_phase = p.epoch_length - p.ticket_tail - 1;

        let mut state = small_state();
        state.timeslot = open_phase;
        let wire = vec![sorted_envelopes(1)[0].0.clone()];
        assert!(apply_tickets(&mut state, &wire, &p, &crypto).is_ok());

        let mut state = small_state();
        state.timeslot = open_phase + 1;
        assert_eq!(
            apply_tickets(&mut state, &wire, &p, &crypto).unwrap_err(),
            TransitionError::UnexpectedTicket
        );
    }

    #[test]
    fn duplicate_against_accumulator_is_rejected() {
        let mut state = small_state();
        let crypto = fixed_crypto();
        let (env, id) = envelope(1, 0);
        state.safrole.ticket_accumulator = vec![Ticket { id, attempt: 0 }];
        let before = state.clone();
        assert_eq!(
            apply_tickets(&mut state, &[env], &params(), &crypto).unwrap_err(),
            TransitionError::DuplicateTicket
        );
        assert_eq!(state, before);
    }

    #[test]
    fn bad_attempt_and_bad_proof() {
        let mut state = small_state();
        let crypto = fixed_crypto();
        let (env, _) = envelope(1, 5);
        assert_eq!(
            apply_tickets(&mut state, &[env], &params(), &crypto).unwrap_err(),
            TransitionError::BadTicketAttempt
        );
        let mut bad = sorted_envelopes(1)[0].0.clone();
        bad.signature[0] = BAD_SIG_MARKER;
        assert_eq!(
            apply_tickets(&mut state, &[bad], &params(), &crypto).unwrap_err(),
            TransitionError::BadTicketProof
        );
    }

    #[test]
    fn unsorted_submission_is_rejected() {
        let mut state = small_state();
        let crypto = fixed_crypto();
        let envelopes = sorted_envelopes(2);
        let wire = vec![envelopes[1].0.clone(), envelopes[0].0.clone()];
        assert_eq!(
            apply_tickets(&mut state, &wire, &params(), &crypto).unwrap_err(),
            TransitionError::BadTicketOrder
        );
    }

    #[test]
    fn accumulator_truncates_to_epoch_length() {
        let p = params();
        let mut state = small_state();
        let crypto = fixed_crypto();
        state.safrole.ticket_accumulator = (0..p.epoch_length as usize)
            .map(|i| Ticket { id: [i as u8 + 100; 32], attempt: 0 })
            .collect();
        state.safrole.ticket_accumulator.sort();
        let envelopes = sorted_envelopes(2);
        let wire: Vec<TicketEnvelope> = envelopes.iter().map(|(e, _)| e.clone()).collect();
        apply_tickets(&mut state, &wire, &p, &crypto).unwrap();
        assert_eq!(
            state.safrole.ticket_accumulator.len(),
            p.epoch_length as usize
        );
        let ids: Vec<Hash> = state.safrole.ticket_accumulator.iter().map(|t| t.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
