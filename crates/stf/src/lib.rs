// Path: crates/stf/src/lib.rs
#![forbid(unsafe_code)]

//! The block state-transition function.
//!
//! A single public operation: [`apply`] takes the prior state and a block
//! and yields the posterior state or a typed error. Sub-transitions are free
//! functions over the minimal slice of state they need, composed here in the
//! protocol's dependency order. Everything works on a clone of the state, so
//! a failing block leaves the caller's state untouched;
//! [`apply_and_commit`] extends that atomicity through a storage backend.

pub mod accumulate;
pub mod assurances;
pub mod authorizations;
pub mod disputes;
pub mod guarantees;
pub mod header;
pub mod history;
pub mod preimages;
pub mod safrole;
pub mod statistics;
pub mod validators;

#[cfg(test)]
pub(crate) mod tests_support;

use jam_crypto::{blake2b, blake2b_pair, CryptoCtx};
use jam_state::persist::save_state;
use jam_state::State;
use jam_storage::Backend;
use jam_types::block::{Block, Header};
use jam_types::codec::Encode;
use jam_types::error::TransitionError;
use jam_types::params::ChainParams;
use jam_types::work::WorkReport;
use jam_types::Hash;

/// Hash identifying a block header.
pub fn header_hash(header: &Header) -> Hash {
    blake2b(&header.encode())
}

/// Hash identifying a work report.
pub fn report_hash(report: &WorkReport) -> Hash {
    blake2b(&report.encode())
}

/// Hash identifying a work report's package.
pub fn package_hash(report: &WorkReport) -> Hash {
    blake2b(&report.specification.encode())
}

/// Applies one block to `state`, returning the posterior state.
///
/// `wall_clock` is the local UNIX time used only for the not-from-the-future
/// header check; everything else is a pure function of `(state, block)`.
pub fn apply(
    state: &State,
    block: &Block,
    params: &ChainParams,
    crypto: &CryptoCtx<'_>,
    wall_clock: u64,
) -> Result<State, TransitionError> {
    header::check_structure(state, block, params, wall_clock)?;

    let mut next = state.clone();
    let now = block.header.timeslot;
    let crossing = params.crosses_epoch(state.timeslot, now);

    if crossing {
        validators::rotate_epoch(&mut next, params, crypto)?;
    }
    header::check_markers(state, &next, &block.header, params, crossing)?;
    let entropy_output = header::verify_seal(&next, &block.header, params, crypto)?;

    next.timeslot = now;
    history::pre_update(&mut next, &block.header, params);
    next.entropy[0] = blake2b_pair(&next.entropy[0], &entropy_output);

    disputes::apply(&mut next, block, params)?;
    let available = assurances::apply(&mut next, &block.extrinsic.assurances, &block.header, params)?;
    guarantees::apply(&mut next, &block.extrinsic.guarantees, params, now)?;
    let outcomes = accumulate::apply(&mut next, &available, params, now)?;
    preimages::apply(&mut next, &block.extrinsic.preimages, now)?;
    authorizations::rotate(&mut next, params, now);
    safrole::apply_tickets(&mut next, &block.extrinsic.tickets, params, crypto)?;
    statistics::update(&mut next, block, &outcomes);
    history::finalize(&mut next, &block.extrinsic.guarantees, &outcomes);

    tracing::debug!(
        slot = now,
        reports = available.len(),
        accumulated = outcomes.len(),
        "block applied"
    );
    Ok(next)
}

/// Applies a block and persists the result: the backend buffer is committed
/// on success and rolled back on any failure, so observers never see a
/// partially applied block.
pub fn apply_and_commit(
    state: &State,
    block: &Block,
    params: &ChainParams,
    crypto: &CryptoCtx<'_>,
    wall_clock: u64,
    backend: &mut dyn Backend,
) -> Result<State, TransitionError> {
    let next = apply(state, block, params, crypto, wall_clock)?;
    if let Err(e) = save_state(&next, backend) {
        backend.rollback();
        return Err(TransitionError::StateBackend(e.to_string()));
    }
    if let Err(e) = backend.commit() {
        backend.rollback();
        return Err(TransitionError::StateBackend(e.to_string()));
    }
    Ok(next)
}
