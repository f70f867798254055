// Path: crates/stf/src/disputes.rs
//! Dispute processing (ψ′) and the disputed-report purge (ρ†).

use crate::report_hash;
use jam_crypto::verify_ed25519;
use jam_state::State;
use jam_types::block::Block;
use jam_types::disputes::{Culprit, Fault, Verdict};
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::validator::ValidatorKey;
use jam_types::{Ed25519Key, Hash};
use std::collections::BTreeSet;

fn bad(reason: impl Into<String>) -> TransitionError {
    TransitionError::BadDispute(reason.into())
}

/// The validator set a verdict's judgments were signed by: the active set
/// for the current epoch, the previous set for the one before. Older
/// verdicts are inadmissible.
fn judging_set<'a>(
    state: &'a State,
    age: u32,
    now_epoch: u32,
) -> Result<&'a [ValidatorKey], TransitionError> {
    if age == now_epoch {
        Ok(&state.current_set)
    } else if age.checked_add(1) == Some(now_epoch) {
        Ok(&state.previous_set)
    } else {
        Err(bad(format!("verdict epoch {age} out of range")))
    }
}

fn check_verdict(
    state: &State,
    verdict: &Verdict,
    now_epoch: u32,
) -> Result<bool, TransitionError> {
    let set = judging_set(state, verdict.age, now_epoch)?;
    if verdict.judgments.is_empty() {
        return Err(bad("empty verdict"));
    }
    let mut prev_index: Option<u16> = None;
    let mut guilty = 0usize;
    for judgment in &verdict.judgments {
        if let Some(p) = prev_index {
            if judgment.validator_index <= p {
                return Err(bad("judgments not sorted by validator"));
            }
        }
        prev_index = Some(judgment.validator_index);
        let key = set
            .get(usize::from(judgment.validator_index))
            .ok_or_else(|| bad("judgment validator out of range"))?;
        let domain = if judgment.vote {
            domains::VALID
        } else {
            domains::INVALID
        };
        verify_ed25519(&key.ed25519, domain, &verdict.target, &judgment.signature)
            .map_err(|e| bad(format!("judgment signature: {e}")))?;
        if !judgment.vote {
            guilty += 1;
        }
    }
    Ok(guilty * 2 > verdict.judgments.len())
}

fn known_ed25519(state: &State, key: &Ed25519Key) -> bool {
    state
        .current_set
        .iter()
        .chain(state.previous_set.iter())
        .any(|v| v.ed25519 == *key)
}

fn check_culprit(state: &State, culprit: &Culprit) -> Result<(), TransitionError> {
    if !state.judgments.bad.contains(&culprit.target) {
        return Err(bad("culprit for a report not judged bad"));
    }
    if !known_ed25519(state, &culprit.key) {
        return Err(bad("culprit key unknown"));
    }
    verify_ed25519(
        &culprit.key,
        domains::GUARANTEE,
        &culprit.target,
        &culprit.signature,
    )
    .map_err(|e| bad(format!("culprit signature: {e}")))
}

fn check_fault(state: &State, fault: &Fault) -> Result<(), TransitionError> {
    // A fault proves a vote contradicting the final judgment.
    let contradicted = if fault.vote {
        state.judgments.bad.contains(&fault.target)
    } else {
        state.judgments.good.contains(&fault.target)
    };
    if !contradicted {
        return Err(bad("fault does not contradict the verdict"));
    }
    if !known_ed25519(state, &fault.key) {
        return Err(bad("fault key unknown"));
    }
    let domain = if fault.vote {
        domains::VALID
    } else {
        domains::INVALID
    };
    verify_ed25519(&fault.key, domain, &fault.target, &fault.signature)
        .map_err(|e| bad(format!("fault signature: {e}")))
}

/// Applies the dispute extrinsic: verdicts classify reports good or bad,
/// culprits and faults register offenders, and pending reports judged bad
/// are purged from their cores. The header's offender marker must list
/// exactly the keys registered here.
pub fn apply(state: &mut State, block: &Block, params: &ChainParams) -> Result<(), TransitionError> {
    let disputes = &block.extrinsic.disputes;
    let now_epoch = params.epoch_of(block.header.timeslot);

    let mut prev_target: Option<Hash> = None;
    for verdict in &disputes.verdicts {
        if let Some(p) = prev_target {
            if verdict.target <= p {
                return Err(bad("verdicts not sorted by target"));
            }
        }
        prev_target = Some(verdict.target);
        let judged = &state.judgments;
        if judged.good.contains(&verdict.target)
            || judged.bad.contains(&verdict.target)
            || judged.wonky.contains(&verdict.target)
        {
            return Err(bad("target already judged"));
        }
        let is_bad = check_verdict(state, verdict, now_epoch)?;
        if is_bad {
            state.judgments.bad.insert(verdict.target);
        } else {
            state.judgments.good.insert(verdict.target);
        }
    }

    let mut new_offenders: BTreeSet<Ed25519Key> = BTreeSet::new();
    let mut prev_key: Option<Ed25519Key> = None;
    for culprit in &disputes.culprits {
        if let Some(p) = prev_key {
            if culprit.key <= p {
                return Err(bad("culprits not sorted by key"));
            }
        }
        prev_key = Some(culprit.key);
        if state.judgments.offenders.contains(&culprit.key) {
            return Err(bad("culprit already an offender"));
        }
        check_culprit(state, culprit)?;
        new_offenders.insert(culprit.key);
    }

    let mut prev_key: Option<Ed25519Key> = None;
    for fault in &disputes.faults {
        if let Some(p) = prev_key {
            if fault.key <= p {
                return Err(bad("faults not sorted by key"));
            }
        }
        prev_key = Some(fault.key);
        if state.judgments.offenders.contains(&fault.key) {
            return Err(bad("fault already an offender"));
        }
        check_fault(state, fault)?;
        state.judgments.wonky.insert(fault.target);
        new_offenders.insert(fault.key);
    }

    let marker: BTreeSet<Ed25519Key> = block.header.offenders.iter().copied().collect();
    if marker != new_offenders || marker.len() != block.header.offenders.len() {
        return Err(TransitionError::BadHeader(
            "offender marker does not match dispute extrinsic".into(),
        ));
    }

    state.judgments.offenders.extend(new_offenders.iter().copied());
    state.judgments.punish_set.extend(new_offenders);

    // ρ†: purge pending reports now judged bad.
    for slot in state.reports.iter_mut() {
        if let Some(pending) = slot {
            if state.judgments.bad.contains(&report_hash(&pending.report)) {
                *slot = None;
            }
        }
    }
    Ok(())
}
