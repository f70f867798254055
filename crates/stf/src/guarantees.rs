// Path: crates/stf/src/guarantees.rs
//! Guarantee admission (ρ′).

use crate::{package_hash, report_hash};
use jam_crypto::verify_ed25519;
use jam_state::State;
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::work::{Guarantee, PendingReport};
use jam_types::{Hash, TimeSlot};
use std::collections::BTreeSet;

fn bad(reason: impl Into<String>) -> TransitionError {
    TransitionError::BadGuarantee(reason.into())
}

fn check_report_structure(
    state: &State,
    guarantee: &Guarantee,
    params: &ChainParams,
    now: TimeSlot,
    seen_packages: &BTreeSet<Hash>,
) -> Result<(), TransitionError> {
    let report = &guarantee.report;
    if report.digests.is_empty() || report.digests.len() > params.max_work_items {
        return Err(bad("digest count out of range"));
    }
    if report.context.prerequisites.len() > params.max_dependencies {
        return Err(bad("too many prerequisites"));
    }
    if !state.recent.contains_header(&report.context.anchor) {
        return Err(bad("anchor not in recent history"));
    }
    if report.context.lookup_slot.saturating_add(params.lookup_anchor_age) < now {
        return Err(bad("lookup anchor too old"));
    }
    let package = package_hash(report);
    if seen_packages.contains(&package) {
        return Err(bad("package reported twice in one block"));
    }
    if state.recent.contains_package(&package) || state.accumulated_union().contains(&package) {
        return Err(bad("package already reported"));
    }
    let pending_duplicate = state
        .reports
        .iter()
        .flatten()
        .any(|p| package_hash(&p.report) == package);
    if pending_duplicate {
        return Err(bad("package already pending"));
    }
    Ok(())
}

/// Admits guaranteed reports to their cores.
///
/// Guarantees arrive sorted by core; each needs a free core, an authorizer
/// from the core's pool (consumed on admission), and two or three
/// credentials from distinct validators over the report hash.
pub fn apply(
    state: &mut State,
    guarantees: &[Guarantee],
    params: &ChainParams,
    now: TimeSlot,
) -> Result<(), TransitionError> {
    let mut seen_packages = BTreeSet::new();
    let mut prev_core: Option<u16> = None;

    for guarantee in guarantees {
        let core = guarantee.report.core_index;
        if let Some(p) = prev_core {
            if core <= p {
                return Err(bad("guarantees not sorted by core"));
            }
        }
        prev_core = Some(core);
        if core >= params.core_count {
            return Err(bad("core index out of range"));
        }
        let core = usize::from(core);
        if state.reports[core].is_some() {
            return Err(bad("core is occupied"));
        }
        if guarantee.slot > now {
            return Err(bad("guarantee from the future"));
        }
        if !state.auth_pools[core].contains(&guarantee.report.authorizer_hash) {
            return Err(bad("authorizer not in the core's pool"));
        }

        if !(2..=3).contains(&guarantee.credentials.len()) {
            return Err(bad("credential count must be two or three"));
        }
        let message = report_hash(&guarantee.report);
        let mut prev_index: Option<u16> = None;
        for credential in &guarantee.credentials {
            if let Some(p) = prev_index {
                if credential.validator_index <= p {
                    return Err(bad("credentials not sorted by validator"));
                }
            }
            prev_index = Some(credential.validator_index);
            let validator = state
                .current_set
                .get(usize::from(credential.validator_index))
                .ok_or_else(|| bad("credential validator out of range"))?;
            verify_ed25519(
                &validator.ed25519,
                domains::GUARANTEE,
                &message,
                &credential.signature,
            )
            .map_err(|e| bad(format!("credential signature: {e}")))?;
        }

        check_report_structure(state, guarantee, params, now, &seen_packages)?;
        seen_packages.insert(package_hash(&guarantee.report));

        // Consume the authorizer and occupy the core.
        let pool = &mut state.auth_pools[core];
        if let Some(pos) = pool.iter().position(|h| *h == guarantee.report.authorizer_hash) {
            pool.remove(pos);
        }
        state.reports[core] = Some(PendingReport {
            report: guarantee.report.clone(),
            admitted_at: now,
        });
    }
    Ok(())
}
