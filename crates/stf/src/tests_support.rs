// Path: crates/stf/src/tests_support.rs
//! Shared fixtures for the unit tests in this crate.

use jam_state::State;
use jam_test_utils::{genesis_state, tiny_params, TestValidators};
use jam_types::params::ChainParams;
use jam_types::work::WorkReport;

pub(crate) fn params() -> ChainParams {
    tiny_params()
}

pub(crate) fn validators() -> TestValidators {
    TestValidators::new(usize::from(params().validator_count))
}

pub(crate) fn small_state() -> State {
    genesis_state(&params(), &validators())
}

pub(crate) fn sample_report(core: u16) -> WorkReport {
    jam_test_utils::report_for(core, 1, [1; 32], b"refined output")
}
