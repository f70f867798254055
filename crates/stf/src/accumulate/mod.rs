// Path: crates/stf/src/accumulate/mod.rs
//! Accumulation: dependency-resolved execution of available work reports.

pub mod host;

use crate::package_hash;
use host::AccumulateHost;
use jam_crypto::blake2b;
use jam_pvm::{drive, Entry, Machine, Outcome};
use jam_state::{ReadyRecord, State};
use jam_types::error::TransitionError;
use jam_types::params::ChainParams;
use jam_types::privileges::PrivilegedState;
use jam_types::service::{DeferredTransfer, ServiceAccount};
use jam_types::validator::ValidatorKey;
use jam_types::work::WorkReport;
use jam_types::{Gas, Hash, ServiceId, TimeSlot};
use std::collections::{BTreeMap, BTreeSet};

/// Public service identifiers are allocated from here upward; the space
/// below is reserved to the registrar.
pub const FIRST_PUBLIC_SERVICE_ID: ServiceId = 1 << 16;

/// One successful accumulate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateOutcome {
    /// The accumulating service.
    pub service: ServiceId,
    /// The output hash appended to the belt: the Blake2b hash of the
    /// digest's refinement result.
    pub output: Hash,
    /// Gas the invocation consumed.
    pub gas_used: Gas,
}

/// The slice of state an accumulate invocation may read and mutate,
/// detached from the live state so a trapped guest can be rolled back to
/// its checkpoint wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialState {
    /// Service accounts.
    pub services: BTreeMap<ServiceId, ServiceAccount>,
    /// Privileged assignments (χ).
    pub privileges: PrivilegedState,
    /// The staging validator set (ι).
    pub staging_set: Vec<ValidatorKey>,
    /// Per-core authorization queues (φ).
    pub auth_queues: Vec<Vec<Hash>>,
    /// Next public service identifier to try.
    pub next_free_id: ServiceId,
    /// Transfers queued by `transfer` host calls, settled after the pass.
    pub transfers: Vec<DeferredTransfer>,
}

impl PartialState {
    fn from_state(state: &State) -> Self {
        let next_free_id = state
            .services
            .keys()
            .next_back()
            .map_or(FIRST_PUBLIC_SERVICE_ID, |max| {
                (*max + 1).max(FIRST_PUBLIC_SERVICE_ID)
            });
        Self {
            services: state.services.clone(),
            privileges: state.privileges.clone(),
            staging_set: state.staging_set.clone(),
            auth_queues: state.auth_queues.clone(),
            next_free_id,
            transfers: Vec::new(),
        }
    }

    fn empty() -> Self {
        Self {
            services: BTreeMap::new(),
            privileges: PrivilegedState::default(),
            staging_set: Vec::new(),
            auth_queues: Vec::new(),
            next_free_id: FIRST_PUBLIC_SERVICE_ID,
            transfers: Vec::new(),
        }
    }

    fn write_back(mut self, state: &mut State) {
        // Settle deferred transfers: credit existing receivers, refund the
        // sender when the receiver vanished.
        for transfer in std::mem::take(&mut self.transfers) {
            if self.services.contains_key(&transfer.to) {
                let to = self.services.get_mut(&transfer.to).expect("checked");
                to.balance = to.balance.saturating_add(transfer.amount);
            } else if let Some(from) = self.services.get_mut(&transfer.from) {
                from.balance = from.balance.saturating_add(transfer.amount);
            }
        }
        state.services = self.services;
        state.privileges = self.privileges;
        state.staging_set = self.staging_set;
        state.auth_queues = self.auth_queues;
    }
}

/// Accumulates every newly available report whose prerequisites are met,
/// resolving dependencies to a fixed point and parking the rest in the
/// ready queue. Returns the outputs in execution order.
pub fn apply(
    state: &mut State,
    available: &[WorkReport],
    params: &ChainParams,
    now: TimeSlot,
) -> Result<Vec<AccumulateOutcome>, TransitionError> {
    let history = state.accumulated_union();

    // Re-arm the ready queue: drop entries past the epoch-length window and
    // deps that accumulated in the meantime.
    let mut queue: Vec<ReadyRecord> = std::mem::take(&mut state.ready)
        .into_iter()
        .filter(|record| now < record.queued_at.saturating_add(params.epoch_length))
        .collect();
    for record in &mut queue {
        record.deps.retain(|dep| !history.contains(dep));
    }

    // Partition the new arrivals.
    let mut run_list: Vec<WorkReport> = Vec::new();
    for report in available {
        let deps: BTreeSet<Hash> = report
            .context
            .prerequisites
            .iter()
            .filter(|dep| !history.contains(*dep))
            .copied()
            .collect();
        if deps.is_empty() {
            run_list.push(report.clone());
        } else {
            queue.push(ReadyRecord {
                report: report.clone(),
                deps,
                queued_at: now,
            });
        }
    }

    let mut ctx = PartialState::from_state(state);
    let mut outcomes: Vec<AccumulateOutcome> = Vec::new();
    let mut accumulated_now: BTreeSet<Hash> = BTreeSet::new();
    let mut gas_used_total: Gas = 0;
    let mut belt_scratch = state.recent.belt.clone();

    loop {
        for report in &run_list {
            execute_report(
                &mut ctx,
                report,
                params,
                now,
                state.entropy[0],
                &mut gas_used_total,
                &mut belt_scratch,
                &mut outcomes,
            );
            accumulated_now.insert(package_hash(report));
        }
        // Promote queue entries whose remaining deps just accumulated.
        for record in &mut queue {
            record.deps.retain(|dep| !accumulated_now.contains(dep));
        }
        run_list = Vec::new();
        let mut still_queued = Vec::with_capacity(queue.len());
        for record in queue {
            if record.deps.is_empty() {
                run_list.push(record.report);
            } else {
                still_queued.push(record);
            }
        }
        queue = still_queued;
        if run_list.is_empty() {
            break;
        }
    }

    ctx.write_back(state);
    state.ready = queue;
    state.accumulated.push(accumulated_now);
    let window = params.epoch_length as usize;
    if state.accumulated.len() > window {
        let excess = state.accumulated.len() - window;
        state.accumulated.drain(..excess);
    }
    Ok(outcomes)
}

#[allow(clippy::too_many_arguments)]
fn execute_report(
    ctx: &mut PartialState,
    report: &WorkReport,
    params: &ChainParams,
    now: TimeSlot,
    entropy: Hash,
    gas_used_total: &mut Gas,
    belt_scratch: &mut jam_state::mmr::MountainBelt,
    outcomes: &mut Vec<AccumulateOutcome>,
) {
    for digest in &report.digests {
        let Some(result) = digest.result.output() else {
            continue;
        };
        let Some(account) = ctx.services.get(&digest.service) else {
            tracing::debug!(service = digest.service, "digest for unknown service");
            continue;
        };
        let budget = digest
            .accumulate_gas
            .min(params.gas_accumulate_total - *gas_used_total);
        if budget <= 0 {
            tracing::warn!(service = digest.service, "block accumulation gas exhausted");
            continue;
        }
        let Some(code) = account.preimages.get(&account.code_hash).cloned() else {
            continue;
        };
        if code.len() > params.max_service_code {
            continue;
        }

        // Invocation input: the belt commitment so far, then the result.
        let mut input = belt_scratch.root().to_vec();
        input.extend_from_slice(result);

        let program = match jam_pvm::Program::parse(&code) {
            Ok(program) => program,
            Err(_) => continue,
        };
        let mut machine = Machine::standard(program, &input, Entry::Accumulate.pc(), budget);
        let mut hosted = AccumulateHost::new(
            std::mem::replace(ctx, PartialState::empty()),
            digest.service,
            now,
            params,
            entropy,
        );
        let outcome = drive(&mut machine, &mut hosted);
        let gas_used = budget - machine.gas_remaining();
        *gas_used_total += gas_used;

        *ctx = match outcome {
            Outcome::Ok(_) => hosted.into_regular(),
            _ => hosted.into_checkpoint(),
        };
        if matches!(outcome, Outcome::Ok(_)) {
            if let Some(account) = ctx.services.get_mut(&digest.service) {
                account.last_acc_slot = now;
            }
            let output = blake2b(result);
            belt_scratch.append(digest.service, &output);
            outcomes.push(AccumulateOutcome {
                service: digest.service,
                output,
                gas_used,
            });
        }
    }
}
