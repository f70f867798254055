// Path: crates/stf/src/history.rs
//! Recent-history updates (β† at block start, β′ at block end).

use crate::{header_hash, package_hash};
use jam_state::State;
use jam_types::block::Header;
use jam_types::params::ChainParams;
use jam_types::work::Guarantee;
use jam_state::history::RecentBlock;
use jam_types::ServiceId;
use jam_types::Hash;
use std::collections::BTreeSet;

/// Patches the parent entry's state root from the header and opens this
/// block's entry. The new entry's accumulation root snapshots the belt
/// before this block's outputs land; its own state root stays zero until
/// the child block reports it.
pub fn pre_update(state: &mut State, header: &Header, params: &ChainParams) {
    if let Some(parent) = state.recent.last_mut() {
        parent.state_root = header.state_root;
    }
    let entry = RecentBlock {
        header_hash: header_hash(header),
        state_root: [0; 32],
        accumulation_root: state.recent.belt.root(),
        reported: BTreeSet::new(),
        seal: header.seal,
    };
    state.recent.push(entry, params.history_depth);
}

/// Records the block's reported packages into its history entry and appends
/// the accumulation outputs to the belt.
pub fn finalize(
    state: &mut State,
    guarantees: &[Guarantee],
    outputs: &[crate::accumulate::AccumulateOutcome],
) {
    let reported: BTreeSet<Hash> = guarantees
        .iter()
        .map(|g| package_hash(&g.report))
        .collect();
    if let Some(entry) = state.recent.last_mut() {
        entry.reported = reported;
    }
    for outcome in outputs {
        state.recent.belt.append(outcome.service, &outcome.output);
    }
    state.last_outputs = outputs
        .iter()
        .map(|o| (o.service, o.output))
        .collect::<Vec<(ServiceId, Hash)>>();
}
