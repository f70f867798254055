// Path: crates/stf/tests/pipeline.rs
//! The report pipeline: guarantee admission, availability assurances and
//! dispute resolution, driven with real Ed25519 attestations.

use jam_crypto::blake2b;
use jam_state::history::RecentBlock;
use jam_state::State;
use jam_stf::{assurances, disputes, guarantees, report_hash};
use jam_test_utils::{genesis_state, tiny_params, TestValidators};
use jam_types::block::{Block, Extrinsic, Header};
use jam_types::codec::{Bits, Encode};
use jam_types::disputes::{Culprit, Judgment, Verdict};
use jam_types::error::TransitionError;
use jam_types::params::{domains, ChainParams};
use jam_types::work::{Assurance, Credential, Guarantee, PendingReport, WorkReport};
use jam_types::{Hash, TimeSlot};
use std::collections::BTreeSet;

const ANCHOR: Hash = [1; 32];
const PARENT: Hash = [2; 32];

fn setup() -> (ChainParams, TestValidators, State) {
    let params = tiny_params();
    let validators = TestValidators::new(usize::from(params.validator_count));
    let mut state = genesis_state(&params, &validators);
    // Remember the anchor block and the parent the assurances bind to.
    for hash in [ANCHOR, PARENT] {
        state.recent.push(
            RecentBlock {
                header_hash: hash,
                state_root: [0; 32],
                accumulation_root: [0; 32],
                reported: BTreeSet::new(),
                seal: [0; 96],
            },
            params.history_depth,
        );
    }
    (params, validators, state)
}

fn guaranteed(
    validators: &TestValidators,
    report: WorkReport,
    slot: TimeSlot,
    signers: &[usize],
) -> Guarantee {
    let hash = report_hash(&report);
    let credentials = signers
        .iter()
        .map(|&index| Credential {
            validator_index: index as u16,
            signature: validators.sign(index, domains::GUARANTEE, &hash),
        })
        .collect();
    Guarantee {
        report,
        slot,
        credentials,
    }
}

fn assurance_from(
    validators: &TestValidators,
    index: usize,
    cores: usize,
    assured: &[usize],
) -> Assurance {
    let mut bitfield = Bits::zeroed(cores);
    for &core in assured {
        bitfield.set(core, true);
    }
    let mut message = PARENT.to_vec();
    bitfield.encode_to(&mut message);
    Assurance {
        anchor: PARENT,
        bitfield,
        validator_index: index as u16,
        signature: validators.sign(index, domains::AVAILABLE, &message),
    }
}

fn header_at(slot: TimeSlot) -> Header {
    Header {
        parent_hash: PARENT,
        state_root: [0; 32],
        extrinsic_hash: [0; 32],
        timeslot: slot,
        epoch_mark: None,
        winning_tickets: None,
        offenders: vec![],
        author_index: 0,
        vrf_signature: [0; 96],
        seal: [0; 96],
    }
}

#[test]
fn guarantee_admission_consumes_the_authorizer() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    state.auth_pools[0] = vec![[9; 32], report.authorizer_hash];

    let guarantee = guaranteed(&validators, report.clone(), 4, &[0, 2]);
    guarantees::apply(&mut state, &[guarantee], &params, 5).unwrap();

    let pending = state.reports[0].as_ref().expect("admitted");
    assert_eq!(pending.admitted_at, 5);
    assert_eq!(report_hash(&pending.report), report_hash(&report));
    // Only the consumed authorizer left the pool.
    assert_eq!(state.auth_pools[0], vec![[9; 32]]);
}

#[test]
fn guarantee_needs_a_pooled_authorizer_and_valid_signatures() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");

    // No authorizer in the pool.
    let guarantee = guaranteed(&validators, report.clone(), 4, &[0, 2]);
    let err = guarantees::apply(&mut state, &[guarantee], &params, 5).unwrap_err();
    assert!(matches!(err, TransitionError::BadGuarantee(_)));

    // Wrong signer: credential claims validator 1 but validator 0 signed.
    state.auth_pools[0] = vec![report.authorizer_hash];
    let hash = report_hash(&report);
    let forged = Guarantee {
        report: report.clone(),
        slot: 4,
        credentials: vec![
            Credential {
                validator_index: 1,
                signature: validators.sign(0, domains::GUARANTEE, &hash),
            },
            Credential {
                validator_index: 2,
                signature: validators.sign(2, domains::GUARANTEE, &hash),
            },
        ],
    };
    let err = guarantees::apply(&mut state, &[forged], &params, 5).unwrap_err();
    assert!(matches!(err, TransitionError::BadGuarantee(_)));

    // One credential is not enough.
    let lonely = guaranteed(&validators, report, 4, &[0]);
    let err = guarantees::apply(&mut state, &[lonely], &params, 5).unwrap_err();
    assert!(matches!(err, TransitionError::BadGuarantee(_)));
}

#[test]
fn duplicate_package_is_rejected() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    state.auth_pools[0] = vec![report.authorizer_hash];
    state.auth_pools[1] = vec![report.authorizer_hash];

    let guarantee = guaranteed(&validators, report.clone(), 4, &[0, 2]);
    guarantees::apply(&mut state, &[guarantee], &params, 5).unwrap();

    // The same package on another core in a later block.
    let mut relocated = report;
    relocated.core_index = 1;
    let guarantee = guaranteed(&validators, relocated, 5, &[1, 3]);
    let err = guarantees::apply(&mut state, &[guarantee], &params, 6).unwrap_err();
    assert!(matches!(err, TransitionError::BadGuarantee(_)));
}

#[test]
fn super_majority_assurance_releases_the_report() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    state.reports[0] = Some(PendingReport {
        report: report.clone(),
        admitted_at: 5,
    });

    let cores = usize::from(params.core_count);
    let threshold = params.availability_threshold();
    let wire: Vec<Assurance> = (0..threshold)
        .map(|i| assurance_from(&validators, i, cores, &[0]))
        .collect();

    let header = header_at(6);
    let available = assurances::apply(&mut state, &wire, &header, &params).unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(report_hash(&available[0]), report_hash(&report));
    assert!(state.reports[0].is_none());
}

#[test]
fn below_threshold_keeps_the_report_pending() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    state.reports[0] = Some(PendingReport {
        report,
        admitted_at: 5,
    });

    let cores = usize::from(params.core_count);
    let wire: Vec<Assurance> = (0..params.availability_threshold() - 1)
        .map(|i| assurance_from(&validators, i, cores, &[0]))
        .collect();

    let header = header_at(6);
    let available = assurances::apply(&mut state, &wire, &header, &params).unwrap();
    assert!(available.is_empty());
    assert!(state.reports[0].is_some());
}

#[test]
fn forged_assurance_signature_rejected() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    state.reports[0] = Some(PendingReport {
        report,
        admitted_at: 5,
    });
    let cores = usize::from(params.core_count);
    let mut assurance = assurance_from(&validators, 0, cores, &[0]);
    assurance.validator_index = 1;
    let header = header_at(6);
    let err = assurances::apply(&mut state, &[assurance], &header, &params).unwrap_err();
    assert!(matches!(err, TransitionError::BadAssurance(_)));
}

#[test]
fn guilty_verdict_purges_the_core_and_registers_offenders() {
    let (params, validators, mut state) = setup();
    let report = jam_test_utils::report_for(0, 1, ANCHOR, b"out");
    let target = report_hash(&report);
    state.reports[0] = Some(PendingReport {
        report,
        admitted_at: 5,
    });

    // Four of six judge the report invalid.
    let judgments: Vec<Judgment> = (0..6)
        .map(|i| {
            let vote = i >= 4; // validators 4,5 vote valid
            let domain = if vote { domains::VALID } else { domains::INVALID };
            Judgment {
                vote,
                validator_index: i as u16,
                signature: validators.sign(i, domain, &target),
            }
        })
        .collect();
    let culprit_key = validators.keys[3].ed25519;
    let culprit = Culprit {
        target,
        key: culprit_key,
        signature: validators.sign(3, domains::GUARANTEE, &target),
    };

    let mut header = header_at(6);
    header.offenders = vec![culprit_key];
    let block = Block {
        header,
        extrinsic: Extrinsic {
            disputes: jam_types::disputes::DisputesExtrinsic {
                verdicts: vec![Verdict {
                    target,
                    age: 0,
                    judgments,
                }],
                culprits: vec![culprit],
                faults: vec![],
            },
            ..Extrinsic::default()
        },
    };

    disputes::apply(&mut state, &block, &params).unwrap();
    assert!(state.judgments.bad.contains(&target));
    assert!(state.judgments.offenders.contains(&culprit_key));
    assert!(state.judgments.punish_set.contains(&culprit_key));
    assert!(state.reports[0].is_none());
}

#[test]
fn offender_marker_must_match() {
    let (params, validators, mut state) = setup();
    let target = blake2b(b"some report");

    let judgments: Vec<Judgment> = (0..6)
        .map(|i| {
            let domain = domains::INVALID;
            Judgment {
                vote: false,
                validator_index: i as u16,
                signature: validators.sign(i, domain, &target),
            }
        })
        .collect();
    let culprit_key = validators.keys[3].ed25519;
    let culprit = Culprit {
        target,
        key: culprit_key,
        signature: validators.sign(3, domains::GUARANTEE, &target),
    };

    // Header forgets to announce the offender.
    let block = Block {
        header: header_at(6),
        extrinsic: Extrinsic {
            disputes: jam_types::disputes::DisputesExtrinsic {
                verdicts: vec![Verdict {
                    target,
                    age: 0,
                    judgments,
                }],
                culprits: vec![culprit],
                faults: vec![],
            },
            ..Extrinsic::default()
        },
    };
    let err = disputes::apply(&mut state, &block, &params).unwrap_err();
    assert!(matches!(err, TransitionError::BadHeader(_)));
}
