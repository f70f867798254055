// Path: crates/stf/src/statistics.rs
//! Activity statistics update (π′).

use crate::accumulate::AccumulateOutcome;
use jam_state::State;
use jam_types::block::Block;
use jam_types::statistics::ServiceStats;

/// Updates the counters for this block: authorship, extrinsic activity,
/// per-core report throughput and per-service accumulation work.
pub fn update(state: &mut State, block: &Block, outcomes: &[AccumulateOutcome]) {
    let stats = &mut state.statistics;
    let author = usize::from(block.header.author_index);
    if let Some(entry) = stats.current.get_mut(author) {
        entry.blocks += 1;
        entry.tickets += block.extrinsic.tickets.len() as u32;
        entry.preimages += block.extrinsic.preimages.len() as u32;
        entry.preimage_octets += block
            .extrinsic
            .preimages
            .iter()
            .map(|p| p.blob.len() as u32)
            .sum::<u32>();
    }
    for assurance in &block.extrinsic.assurances {
        if let Some(entry) = stats.current.get_mut(usize::from(assurance.validator_index)) {
            entry.assurances += 1;
        }
    }
    for guarantee in &block.extrinsic.guarantees {
        for credential in &guarantee.credentials {
            if let Some(entry) = stats
                .current
                .get_mut(usize::from(credential.validator_index))
            {
                entry.guarantees += 1;
            }
        }
        if let Some(core) = stats.cores.get_mut(usize::from(guarantee.report.core_index)) {
            core.reports += 1;
            core.gas_used += guarantee.report.gas_used.max(0) as u64;
        }
    }
    for outcome in outcomes {
        let entry = stats
            .services
            .entry(outcome.service)
            .or_insert_with(ServiceStats::default);
        entry.accumulate_count += 1;
        entry.accumulate_gas += outcome.gas_used.max(0) as u64;
    }
}
