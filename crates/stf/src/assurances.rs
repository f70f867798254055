// Path: crates/stf/src/assurances.rs
//! Availability assurances (ρ‡) and the selection of available reports.

use jam_crypto::verify_ed25519;
use jam_state::State;
use jam_types::block::Header;
use jam_types::codec::Encode;
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::work::{Assurance, WorkReport};

fn bad(reason: impl Into<String>) -> TransitionError {
    TransitionError::BadAssurance(reason.into())
}

/// Processes the assurance extrinsic.
///
/// Per core, assurances from distinct validators are counted; a pending
/// report reaching the super-majority threshold becomes *available* and is
/// returned for accumulation. Reports that neither became available nor
/// were assured within the timeout window are dropped.
pub fn apply(
    state: &mut State,
    assurances: &[Assurance],
    header: &Header,
    params: &ChainParams,
) -> Result<Vec<WorkReport>, TransitionError> {
    let cores = usize::from(params.core_count);
    let mut counts = vec![0usize; cores];

    let mut prev_index: Option<u16> = None;
    for assurance in assurances {
        if let Some(p) = prev_index {
            if assurance.validator_index <= p {
                return Err(bad("assurances not sorted by validator"));
            }
        }
        prev_index = Some(assurance.validator_index);
        if assurance.anchor != header.parent_hash {
            return Err(bad("assurance anchored to a different parent"));
        }
        let validator = state
            .current_set
            .get(usize::from(assurance.validator_index))
            .ok_or_else(|| bad("assurance validator out of range"))?;
        if assurance.bitfield.len() != cores {
            return Err(bad("assurance bitfield has wrong width"));
        }
        let mut message = assurance.anchor.to_vec();
        assurance.bitfield.encode_to(&mut message);
        verify_ed25519(
            &validator.ed25519,
            domains::AVAILABLE,
            &message,
            &assurance.signature,
        )
        .map_err(|e| bad(format!("assurance signature: {e}")))?;

        for (core, count) in counts.iter_mut().enumerate() {
            if assurance.bitfield.get(core) {
                if state.reports[core].is_none() {
                    return Err(bad("assurance for an empty core"));
                }
                *count += 1;
            }
        }
    }

    let threshold = params.availability_threshold();
    let now = header.timeslot;
    let mut available = Vec::new();
    for core in 0..cores {
        let Some(pending) = state.reports[core].take() else {
            continue;
        };
        if counts[core] >= threshold {
            available.push(pending.report);
        } else if now >= pending.admitted_at.saturating_add(params.report_timeout) {
            tracing::debug!(core, "pending report timed out");
        } else {
            state.reports[core] = Some(pending);
        }
    }
    Ok(available)
}
