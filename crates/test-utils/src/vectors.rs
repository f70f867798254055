// Path: crates/test-utils/src/vectors.rs
//! JSON test vectors: load, execute, diff.

use jam_state::State;
use jam_types::block::Block;
use jam_types::error::ErrorCode;
use jam_types::params::ChainParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One state-transition vector.
#[derive(Debug, Serialize, Deserialize)]
pub struct TestVector {
    /// Parameters the vector runs under.
    pub params: ChainParams,
    /// The state before the block.
    pub pre_state: State,
    /// The block to apply.
    pub block: Block,
    /// The expected result.
    pub expected: Expected,
}

/// Expected outcome of a vector.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    /// The transition succeeds with this posterior state.
    PostState(Box<State>),
    /// The transition fails with this stable error code.
    Error(String),
}

/// Loads a vector from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<TestVector> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Runs `apply` on the vector and checks the outcome, returning a list of
/// human-readable mismatches. Empty means the vector passed.
pub fn run<F>(vector: &TestVector, apply: F) -> Vec<String>
where
    F: FnOnce(&State, &Block, &ChainParams) -> Result<State, jam_types::error::TransitionError>,
{
    match (
        apply(&vector.pre_state, &vector.block, &vector.params),
        &vector.expected,
    ) {
        (Ok(actual), Expected::PostState(expected)) => diff_states(expected, &actual),
        (Ok(_), Expected::Error(code)) => {
            vec![format!("expected error `{code}`, transition succeeded")]
        }
        (Err(e), Expected::PostState(_)) => {
            vec![format!("unexpected error `{}`: {e}", e.code())]
        }
        (Err(e), Expected::Error(code)) => {
            if e.code() == code {
                vec![]
            } else {
                vec![format!("expected error `{code}`, got `{}`", e.code())]
            }
        }
    }
}

/// Compares two states component by component, naming each divergence.
pub fn diff_states(expected: &State, actual: &State) -> Vec<String> {
    let mut diffs = Vec::new();
    let mut check = |name: &str, equal: bool| {
        if !equal {
            diffs.push(format!("state component `{name}` differs"));
        }
    };
    check("auth_pools", expected.auth_pools == actual.auth_pools);
    check("recent", expected.recent == actual.recent);
    check("safrole", expected.safrole == actual.safrole);
    check("services", expected.services == actual.services);
    check("entropy", expected.entropy == actual.entropy);
    check("staging_set", expected.staging_set == actual.staging_set);
    check("current_set", expected.current_set == actual.current_set);
    check("previous_set", expected.previous_set == actual.previous_set);
    check("reports", expected.reports == actual.reports);
    check("timeslot", expected.timeslot == actual.timeslot);
    check("auth_queues", expected.auth_queues == actual.auth_queues);
    check("privileges", expected.privileges == actual.privileges);
    check("statistics", expected.statistics == actual.statistics);
    check("ready", expected.ready == actual.ready);
    check("accumulated", expected.accumulated == actual.accumulated);
    check("last_outputs", expected.last_outputs == actual.last_outputs);
    check("judgments", expected.judgments == actual.judgments);
    diffs
}
