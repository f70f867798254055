// Path: crates/stf/tests/accumulation.rs
//! Accumulation: ordering, dependency resolution, the belt, and host-call
//! effects on service state.

use jam_crypto::{blake2b, keccak256};
use jam_pvm::host_id;
use jam_state::State;
use jam_stf::accumulate::{self, AccumulateOutcome};
use jam_stf::{history, package_hash};
use jam_test_utils::asm::{accumulate_service, echo_service};
use jam_test_utils::{genesis_state, tiny_params, TestValidators};
use jam_types::params::ChainParams;
use jam_types::service::ServiceAccount;
use jam_pvm::memory::RW_BASE;
use jam_types::work::WorkReport;
use jam_types::Hash;

fn setup() -> (ChainParams, State) {
    let params = tiny_params();
    let validators = TestValidators::new(usize::from(params.validator_count));
    (params.clone(), genesis_state(&params, &validators))
}

/// Registers `code` as the service's executable.
fn install_service(state: &mut State, id: u32, code: Vec<u8>, balance: u64) {
    let code_hash = blake2b(&code);
    let mut account = ServiceAccount::new(code_hash, balance, 0, id);
    account.preimages.insert(code_hash, code);
    account.refresh_footprint();
    state.services.insert(id, account);
}

fn report(core: u16, service: u32, output: &[u8]) -> WorkReport {
    jam_test_utils::report_for(core, service, [1; 32], output)
}

fn belt_leaf(service: u32, output: &Hash) -> Hash {
    let mut data = Vec::new();
    data.extend_from_slice(b"accout");
    data.extend_from_slice(&service.to_be_bytes());
    data.extend_from_slice(output);
    keccak256(&data)
}

#[test]
fn dependency_orders_execution_and_belt_appends() {
    let (params, mut state) = setup();
    install_service(&mut state, 1, echo_service(), 10_000);

    let r1 = report(0, 1, b"out-1");
    let mut r2 = report(1, 1, b"out-2");
    r2.context.prerequisites = vec![package_hash(&r1)];
    r2.specification.context.prerequisites = vec![package_hash(&r1)];

    // Present dependent-first: the engine must still run R1 before R2.
    let available = vec![r2.clone(), r1.clone()];
    let outcomes = accumulate::apply(&mut state, &available, &params, 7).unwrap();

    let expected_outputs = [blake2b(b"out-1"), blake2b(b"out-2")];
    let actual: Vec<Hash> = outcomes.iter().map(|o| o.output).collect();
    assert_eq!(actual, expected_outputs);

    history::finalize(&mut state, &[], &outcomes);
    // Two appends carry into a single peak: keccak(leaf1 ++ leaf2).
    let mut pair = Vec::new();
    pair.extend_from_slice(&belt_leaf(1, &expected_outputs[0]));
    pair.extend_from_slice(&belt_leaf(1, &expected_outputs[1]));
    assert_eq!(state.recent.belt.root(), keccak256(&pair));

    assert_eq!(state.services[&1].last_acc_slot, 7);
    assert_eq!(state.last_outputs.len(), 2);
    assert!(state.ready.is_empty());
    assert_eq!(state.accumulated.last().unwrap().len(), 2);
}

#[test]
fn unresolved_dependencies_park_in_the_ready_queue() {
    let (params, mut state) = setup();
    install_service(&mut state, 1, echo_service(), 10_000);

    let mut r2 = report(1, 1, b"out-2");
    r2.context.prerequisites = vec![[0xAB; 32]];

    let outcomes = accumulate::apply(&mut state, &[r2.clone()], &params, 7).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(state.ready.len(), 1);
    assert_eq!(state.ready[0].deps.len(), 1);

    // The missing prerequisite arrives in a later block.
    let mut r1 = report(0, 1, b"out-1");
    // Give R1 the package hash R2 waits for by matching its payload.
    r1.specification.items[0].payload = b"the-prereq".to_vec();
    let r1_pkg = package_hash(&r1);
    state.ready[0].deps = [r1_pkg].into_iter().collect();

    let outcomes = accumulate::apply(&mut state, &[r1], &params, 9).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].output, blake2b(b"out-1"));
    assert_eq!(outcomes[1].output, blake2b(b"out-2"));
    assert!(state.ready.is_empty());
}

#[test]
fn ready_queue_expires_after_an_epoch() {
    let (params, mut state) = setup();
    install_service(&mut state, 1, echo_service(), 10_000);

    let mut r2 = report(1, 1, b"out-2");
    r2.context.prerequisites = vec![[0xAB; 32]];
    accumulate::apply(&mut state, &[r2], &params, 7).unwrap();
    assert_eq!(state.ready.len(), 1);

    let late = 7 + params.epoch_length;
    accumulate::apply(&mut state, &[], &params, late).unwrap();
    assert!(state.ready.is_empty());
}

#[test]
fn error_digests_and_missing_services_are_skipped() {
    let (params, mut state) = setup();
    install_service(&mut state, 1, echo_service(), 10_000);

    let mut failed = report(0, 1, b"ignored");
    failed.digests[0].result = jam_types::work::WorkResult::Panic;
    let unknown_service = report(1, 99, b"nobody");

    let outcomes =
        accumulate::apply(&mut state, &[failed, unknown_service], &params, 7).unwrap();
    assert!(outcomes.is_empty());
    assert!(state.last_outputs.is_empty());
}

#[test]
fn transfer_host_call_moves_balance_after_the_pass() {
    let (params, mut state) = setup();
    // Sender runs code that transfers 500 to service 2.
    let code = accumulate_service(|asm| {
        asm.load_imm(7, 2); // destination service
        asm.load_imm(8, 500); // amount
        asm.load_imm(9, 0); // notification gas
        asm.load_imm(10, RW_BASE); // memo bytes
        asm.ecalli(host_id::TRANSFER as u8);
        asm.jump_ind(0, 0);
    });
    install_service(&mut state, 1, code, 10_000);
    install_service(&mut state, 2, echo_service(), 1_000);

    let sender_before = state.services[&1].balance;
    let receiver_before = state.services[&2].balance;

    let outcomes = accumulate::apply(&mut state, &[report(0, 1, b"x")], &params, 7).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(state.services[&1].balance, sender_before - 500);
    assert_eq!(state.services[&2].balance, receiver_before + 500);
}

#[test]
fn storage_write_host_call_lands_in_state() {
    let (params, mut state) = setup();
    let code = accumulate_service(|asm| {
        // memory[RW_BASE] = 'k', memory[RW_BASE+1] = 0x7A
        asm.load_imm(3, u32::from(b'k'));
        asm.store_u8(3, RW_BASE);
        asm.load_imm(3, 0x7A);
        asm.store_u8(3, RW_BASE + 1);
        asm.load_imm(7, RW_BASE); // key address
        asm.load_imm(8, 1); // key length
        asm.load_imm(9, RW_BASE + 1); // value address
        asm.load_imm(10, 1); // value length
        asm.ecalli(host_id::WRITE as u8);
        asm.jump_ind(0, 0);
    });
    install_service(&mut state, 1, code, 10_000);

    accumulate::apply(&mut state, &[report(0, 1, b"x")], &params, 7).unwrap();
    assert_eq!(state.services[&1].storage[b"k".as_slice()], vec![0x7A]);
    assert!(state.services[&1].storage_items > 0);
}

#[test]
fn trapped_guest_rolls_back_to_checkpoint() {
    let (params, mut state) = setup();
    let code = accumulate_service(|asm| {
        asm.load_imm(7, 2);
        asm.load_imm(8, 500);
        asm.load_imm(9, 0);
        asm.load_imm(10, RW_BASE);
        asm.ecalli(host_id::TRANSFER as u8);
        asm.trap();
    });
    install_service(&mut state, 1, code, 10_000);
    install_service(&mut state, 2, echo_service(), 1_000);
    let balances_before = (state.services[&1].balance, state.services[&2].balance);

    let outcomes = accumulate::apply(&mut state, &[report(0, 1, b"x")], &params, 7).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(
        (state.services[&1].balance, state.services[&2].balance),
        balances_before
    );
    // A failed invocation contributes nothing to the outputs.
    assert!(state.last_outputs.is_empty());
}

#[test]
fn gas_accounting_respects_digest_budgets() {
    let (params, mut state) = setup();
    install_service(&mut state, 1, echo_service(), 10_000);
    let available = vec![report(0, 1, b"a"), report(1, 1, b"b")];
    let outcomes: Vec<AccumulateOutcome> =
        accumulate::apply(&mut state, &available, &params, 7).unwrap();
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(outcome.gas_used > 0);
        assert!(outcome.gas_used <= 10_000);
    }
    let total: i64 = outcomes.iter().map(|o| o.gas_used).sum();
    assert!(total <= params.gas_accumulate_total);
}
