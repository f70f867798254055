// Path: crates/stf/src/accumulate/host.rs
//! The accumulate-phase host-call handler.
//!
//! Register conventions: arguments arrive in ω7..ω12, the result replaces
//! ω7. A handler that faults on guest memory terminates the invocation
//! exactly as the faulting instruction would have. Refine-only identifiers
//! fall through the unknown-id rule and yield zero.

use super::PartialState;
use jam_crypto::blake2b;
use jam_pvm::hostcall::{hostret, id};
use jam_pvm::{HostHandler, Machine, Status};
use jam_types::codec::{encode_natural, Decode};
use jam_types::params::ChainParams;
use jam_types::service::{DeferredTransfer, PreimageRequest, ServiceAccount};
use jam_types::validator::ValidatorKey;
use jam_types::{Gas, Hash, ServiceId, TimeSlot};

/// Flat gas surcharge per host call.
pub const HOST_CALL_GAS: Gas = 10;

/// Sentinel meaning "this service" in service-id arguments.
const SELF_SERVICE: u64 = u64::MAX;

/// A handler step that must terminate the invocation (memory fault or gas
/// exhaustion inside the call).
struct Terminate(Status);

/// The accumulate host environment for a single invocation.
pub struct AccumulateHost<'a> {
    regular: PartialState,
    checkpoint: PartialState,
    service: ServiceId,
    now: TimeSlot,
    params: &'a ChainParams,
    entropy: Hash,
    yielded: Option<Hash>,
}

impl<'a> AccumulateHost<'a> {
    /// Builds the environment; the checkpoint starts as a copy of the
    /// incoming state, so a trap before any `checkpoint` call reverts the
    /// whole invocation.
    pub fn new(
        state: PartialState,
        service: ServiceId,
        now: TimeSlot,
        params: &'a ChainParams,
        entropy: Hash,
    ) -> Self {
        Self {
            checkpoint: state.clone(),
            regular: state,
            service,
            now,
            params,
            entropy,
            yielded: None,
        }
    }

    /// The committed state of a successful invocation.
    pub fn into_regular(self) -> PartialState {
        self.regular
    }

    /// The rollback state of a failed invocation.
    pub fn into_checkpoint(self) -> PartialState {
        self.checkpoint
    }

    /// The hash set by `yield`, if any.
    pub fn yielded(&self) -> Option<Hash> {
        self.yielded
    }

    fn resolve_service(&self, raw: u64) -> ServiceId {
        if raw == SELF_SERVICE {
            self.service
        } else {
            raw as ServiceId
        }
    }

    fn own_account_mut(&mut self) -> &mut ServiceAccount {
        self.regular
            .services
            .get_mut(&self.service)
            .expect("accumulating service exists")
    }

    fn read_mem(machine: &mut Machine, addr: u64, len: u64) -> Result<Vec<u8>, Terminate> {
        machine.memory.read(addr as u32, len as u32).map_err(|fault| {
            if fault.reserved {
                Terminate(Status::Panic)
            } else {
                Terminate(Status::PageFault(fault.address))
            }
        })
    }

    fn write_mem(machine: &mut Machine, addr: u64, data: &[u8]) -> Result<(), Terminate> {
        machine.memory.write(addr as u32, data).map_err(|fault| {
            if fault.reserved {
                Terminate(Status::Panic)
            } else {
                Terminate(Status::PageFault(fault.address))
            }
        })
    }

    fn read_hash(machine: &mut Machine, addr: u64) -> Result<Hash, Terminate> {
        let bytes = Self::read_mem(machine, addr, 32)?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(hash)
    }

    fn dispatch(&mut self, call: u64, machine: &mut Machine) -> Result<(), Terminate> {
        let regs = machine.regs;
        match call {
            id::GAS => {
                machine.regs[7] = machine.gas_remaining() as u64;
            }
            id::FETCH => {
                let blob: Option<Vec<u8>> = match regs[10] {
                    0 => Some(encode_params(self.params)),
                    1 => Some(self.entropy.to_vec()),
                    _ => None,
                };
                match blob {
                    None => machine.regs[7] = hostret::NONE,
                    Some(blob) => {
                        let offset = (regs[8] as usize).min(blob.len());
                        let take = (regs[9] as usize).min(blob.len() - offset);
                        Self::write_mem(machine, regs[7], &blob[offset..offset + take])?;
                        machine.regs[7] = blob.len() as u64;
                    }
                }
            }
            id::LOOKUP => {
                let service = self.resolve_service(regs[7]);
                let hash = Self::read_hash(machine, regs[8])?;
                let blob = self
                    .regular
                    .services
                    .get(&service)
                    .and_then(|account| account.preimages.get(&hash))
                    .cloned();
                match blob {
                    Some(blob) => {
                        Self::write_mem(machine, regs[9], &blob)?;
                        machine.regs[7] = blob.len() as u64;
                    }
                    None => machine.regs[7] = hostret::NONE,
                }
            }
            id::READ => {
                let service = self.resolve_service(regs[7]);
                let key = Self::read_mem(machine, regs[8], regs[9])?;
                let value = self
                    .regular
                    .services
                    .get(&service)
                    .and_then(|account| account.storage.get(&key))
                    .cloned();
                match value {
                    Some(value) => {
                        Self::write_mem(machine, regs[10], &value)?;
                        machine.regs[7] = value.len() as u64;
                    }
                    None => machine.regs[7] = hostret::NONE,
                }
            }
            id::WRITE => self.write(machine, regs)?,
            id::INFO => {
                let service = self.resolve_service(regs[7]);
                match self.regular.services.get(&service) {
                    Some(account) => {
                        let header = account.encode_header();
                        Self::write_mem(machine, regs[8], &header)?;
                        machine.regs[7] = hostret::OK;
                    }
                    None => machine.regs[7] = hostret::NONE,
                }
            }
            id::HISTORICAL_LOOKUP => {
                let service = self.resolve_service(regs[7]);
                let hash = Self::read_hash(machine, regs[8])?;
                let slot = regs[10] as TimeSlot;
                let blob = self.regular.services.get(&service).and_then(|account| {
                    let blob = account.preimages.get(&hash)?;
                    let available = account.requests.iter().any(|((h, len), req)| {
                        *h == hash && *len as usize == blob.len() && available_at(req, slot)
                    });
                    available.then(|| blob.clone())
                });
                match blob {
                    Some(blob) => {
                        Self::write_mem(machine, regs[9], &blob)?;
                        machine.regs[7] = blob.len() as u64;
                    }
                    None => machine.regs[7] = hostret::NONE,
                }
            }
            id::BLESS => self.bless(machine, regs)?,
            id::ASSIGN => self.assign(machine, regs)?,
            id::DESIGNATE => self.designate(machine, regs)?,
            id::CHECKPOINT => {
                self.checkpoint = self.regular.clone();
                machine.regs[7] = machine.gas_remaining() as u64;
            }
            id::NEW => self.new_service(machine, regs)?,
            id::UPGRADE => {
                let code_hash = Self::read_hash(machine, regs[7])?;
                let account = self.own_account_mut();
                account.code_hash = code_hash;
                account.min_acc_gas = regs[8] as Gas;
                account.min_memo_gas = regs[9] as Gas;
                machine.regs[7] = hostret::OK;
            }
            id::TRANSFER => self.transfer(machine, regs)?,
            id::EJECT => self.eject(machine, regs)?,
            id::QUERY => {
                let hash = Self::read_hash(machine, regs[7])?;
                let len = regs[8] as u32;
                let request = self
                    .regular
                    .services
                    .get(&self.service)
                    .and_then(|account| account.requests.get(&(hash, len)));
                match request {
                    Some(request) => {
                        machine.regs[7] = request.appearances.len() as u64;
                        let first = request.appearances.first().copied().unwrap_or(0) as u64;
                        let second = request.appearances.get(1).copied().unwrap_or(0) as u64;
                        machine.regs[8] = first | (second << 32);
                    }
                    None => machine.regs[7] = hostret::NONE,
                }
            }
            id::SOLICIT => self.solicit(machine, regs)?,
            id::FORGET => self.forget(machine, regs)?,
            id::YIELD => {
                let hash = Self::read_hash(machine, regs[7])?;
                self.yielded = Some(hash);
                machine.regs[7] = hostret::OK;
            }
            id::PROVIDE => self.provide(machine, regs)?,
            id::LOG => {
                let len = regs[9].min(4096);
                if let Ok(bytes) = machine.memory.read(regs[8] as u32, len as u32) {
                    tracing::debug!(
                        service = self.service,
                        msg = %String::from_utf8_lossy(&bytes),
                        "guest log"
                    );
                }
            }
            _ => {
                // Unknown (and refine-only) identifiers yield zero.
                machine.regs[7] = 0;
            }
        }
        Ok(())
    }

    fn write(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let key = Self::read_mem(machine, regs[7], regs[8])?;
        let value = if regs[10] == 0 {
            None
        } else {
            Some(Self::read_mem(machine, regs[9], regs[10])?)
        };
        let params = self.params;
        let account = self.own_account_mut();
        let rollback = account.storage.clone();
        let previous_len = match value {
            Some(value) => account.storage.insert(key, value).map(|v| v.len()),
            None => account.storage.remove(&key).map(|v| v.len()),
        };
        account.refresh_footprint();
        if account.balance < account.threshold_balance(params) {
            account.storage = rollback;
            account.refresh_footprint();
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }
        machine.regs[7] = previous_len.map_or(hostret::NONE, |len| len as u64);
        Ok(())
    }

    fn bless(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        if self.service != self.regular.privileges.manager {
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }
        let cores = self.params.core_count as u64;
        let assigners_raw = Self::read_mem(machine, regs[8], 4 * cores)?;
        let count = regs[12].min(1024);
        let always_raw = Self::read_mem(machine, regs[11], 12 * count)?;

        let privileges = &mut self.regular.privileges;
        privileges.manager = regs[7] as ServiceId;
        privileges.assigners = assigners_raw
            .chunks_exact(4)
            .map(|c| ServiceId::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        privileges.delegator = regs[9] as ServiceId;
        privileges.registrar = regs[10] as ServiceId;
        privileges.always_access = always_raw
            .chunks_exact(12)
            .map(|c| {
                let id = ServiceId::from_le_bytes([c[0], c[1], c[2], c[3]]);
                let gas = i64::from_le_bytes(c[4..12].try_into().expect("8 bytes"));
                (id, gas)
            })
            .collect();
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn assign(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let core = regs[7] as usize;
        if core >= self.params.core_count as usize {
            machine.regs[7] = hostret::WHO;
            return Ok(());
        }
        if self.regular.privileges.assigners.get(core) != Some(&self.service) {
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }
        let raw = Self::read_mem(machine, regs[8], 32 * self.params.auth_queue_size as u64)?;
        self.regular.auth_queues[core] = raw
            .chunks_exact(32)
            .map(|c| {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(c);
                hash
            })
            .collect();
        self.regular.privileges.assigners[core] = regs[9] as ServiceId;
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn designate(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        if self.service != self.regular.privileges.delegator {
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }
        let count = self.regular.staging_set.len();
        let raw = Self::read_mem(machine, regs[7], 336 * count as u64)?;
        let mut staging = Vec::with_capacity(count);
        let mut slice = raw.as_slice();
        for _ in 0..count {
            match ValidatorKey::decode(&mut slice) {
                Ok(key) => staging.push(key),
                Err(_) => {
                    machine.regs[7] = hostret::HUH;
                    return Ok(());
                }
            }
        }
        self.regular.staging_set = staging;
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn new_service(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let code_hash = Self::read_hash(machine, regs[7])?;
        let gratis = regs[11];
        if gratis != 0 && self.service != self.regular.privileges.manager {
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }

        let mut id = self.regular.next_free_id;
        while self.regular.services.contains_key(&id) {
            id = id.wrapping_add(1).max(super::FIRST_PUBLIC_SERVICE_ID);
        }

        let mut created = ServiceAccount::new(code_hash, 0, self.now, self.service);
        created.min_acc_gas = regs[9] as Gas;
        created.min_memo_gas = regs[10] as Gas;
        created.gratis = gratis;
        created
            .requests
            .insert((code_hash, regs[8] as u32), PreimageRequest::solicited());
        created.refresh_footprint();
        let endowment = created.threshold_balance(self.params);
        created.balance = endowment;

        let params = self.params;
        let payer = self.own_account_mut();
        let rest = match payer.balance.checked_sub(endowment) {
            Some(rest) if rest >= payer.threshold_balance(params) => rest,
            _ => {
                machine.regs[7] = hostret::CASH;
                return Ok(());
            }
        };
        payer.balance = rest;
        self.regular.services.insert(id, created);
        self.regular.next_free_id = id.wrapping_add(1).max(super::FIRST_PUBLIC_SERVICE_ID);
        machine.regs[7] = u64::from(id);
        Ok(())
    }

    fn transfer(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let to = regs[7] as ServiceId;
        let amount = regs[8];
        let gas = regs[9] as Gas;
        let memo = Self::read_mem(machine, regs[10], self.params.memo_size as u64)?;
        let Some(receiver) = self.regular.services.get(&to) else {
            machine.regs[7] = hostret::WHO;
            return Ok(());
        };
        if gas < receiver.min_memo_gas {
            machine.regs[7] = hostret::LOW;
            return Ok(());
        }
        let params = self.params;
        let sender = self.own_account_mut();
        let rest = match sender.balance.checked_sub(amount) {
            Some(rest) if rest >= sender.threshold_balance(params) => rest,
            _ => {
                machine.regs[7] = hostret::CASH;
                return Ok(());
            }
        };
        // The notification gas rides with the transfer and is charged now.
        machine.gas -= gas;
        if machine.gas < 0 {
            return Err(Terminate(Status::OutOfGas));
        }
        self.own_account_mut().balance = rest;
        let from = self.service;
        self.regular.transfers.push(DeferredTransfer {
            from,
            to,
            amount,
            memo,
            gas,
        });
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn eject(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let target = regs[7] as ServiceId;
        let expected_hash = Self::read_hash(machine, regs[8])?;
        // The target must carry the caller's tombstone as its code hash.
        let mut tombstone = [0u8; 32];
        tombstone[..4].copy_from_slice(&self.service.to_le_bytes());
        let ejectable = target != self.service
            && expected_hash == tombstone
            && self
                .regular
                .services
                .get(&target)
                .is_some_and(|account| account.code_hash == tombstone);
        if !ejectable {
            machine.regs[7] = hostret::WHO;
            return Ok(());
        }
        let removed = self.regular.services.remove(&target).expect("checked");
        let payer = self.own_account_mut();
        payer.balance = payer.balance.saturating_add(removed.balance);
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn solicit(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let hash = Self::read_hash(machine, regs[7])?;
        let len = regs[8] as u32;
        let now = self.now;
        let params = self.params;
        let account = self.own_account_mut();
        let rollback = account.clone();
        match account.requests.get_mut(&(hash, len)) {
            None => {
                account
                    .requests
                    .insert((hash, len), PreimageRequest::solicited());
            }
            Some(request) if request.appearances.len() == 2 => {
                request.appearances.push(now);
            }
            Some(_) => {
                machine.regs[7] = hostret::HUH;
                return Ok(());
            }
        }
        account.refresh_footprint();
        if account.balance < account.threshold_balance(params) {
            *self.own_account_mut() = rollback;
            machine.regs[7] = hostret::FULL;
            return Ok(());
        }
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn forget(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let hash = Self::read_hash(machine, regs[7])?;
        let len = regs[8] as u32;
        let now = self.now;
        let expiry = self.params.preimage_expiry;
        let account = self.own_account_mut();
        let Some(request) = account.requests.get_mut(&(hash, len)) else {
            machine.regs[7] = hostret::NONE;
            return Ok(());
        };
        match request.appearances.clone().as_slice() {
            [] => {
                account.requests.remove(&(hash, len));
            }
            [_] => request.appearances.push(now),
            [_, y] if y.saturating_add(expiry) < now => {
                account.requests.remove(&(hash, len));
                account.preimages.remove(&hash);
            }
            [_, y, z] if y.saturating_add(expiry) < now => {
                request.appearances = vec![*z, now];
            }
            _ => {
                machine.regs[7] = hostret::HUH;
                return Ok(());
            }
        }
        account.refresh_footprint();
        machine.regs[7] = hostret::OK;
        Ok(())
    }

    fn provide(&mut self, machine: &mut Machine, regs: [u64; 13]) -> Result<(), Terminate> {
        let target = self.resolve_service(regs[7]);
        let blob = Self::read_mem(machine, regs[8], regs[9])?;
        let hash = blake2b(&blob);
        let len = blob.len() as u32;
        let now = self.now;
        let Some(account) = self.regular.services.get_mut(&target) else {
            machine.regs[7] = hostret::WHO;
            return Ok(());
        };
        let open = account
            .requests
            .get(&(hash, len))
            .is_some_and(|req| req.appearances.is_empty());
        if !open || account.preimages.contains_key(&hash) {
            machine.regs[7] = hostret::HUH;
            return Ok(());
        }
        account.preimages.insert(hash, blob);
        account
            .requests
            .get_mut(&(hash, len))
            .expect("checked")
            .appearances
            .push(now);
        machine.regs[7] = hostret::OK;
        Ok(())
    }
}

impl HostHandler for AccumulateHost<'_> {
    fn host_call(&mut self, call: u64, machine: &mut Machine) -> Option<Status> {
        machine.gas -= HOST_CALL_GAS;
        if machine.gas < 0 {
            return Some(Status::OutOfGas);
        }
        match self.dispatch(call, machine) {
            Ok(()) => None,
            Err(Terminate(status)) => Some(status),
        }
    }
}

/// True when the request's appearance history makes the preimage available
/// at `slot`.
fn available_at(request: &PreimageRequest, slot: TimeSlot) -> bool {
    match request.appearances.as_slice() {
        [x] => *x <= slot,
        [x, y] => *x <= slot && slot < *y,
        [x, y, z] => (*x <= slot && slot < *y) || *z <= slot,
        _ => false,
    }
}

/// A stable binary rendering of the chain parameters for `fetch` selector
/// zero: every numeric field, declaration order, natural-number encoded.
fn encode_params(params: &ChainParams) -> Vec<u8> {
    let mut out = Vec::new();
    for value in [
        u64::from(params.slot_period),
        u64::from(params.epoch_length),
        u64::from(params.ticket_tail),
        u64::from(params.core_count),
        u64::from(params.validator_count),
        params.history_depth as u64,
        u64::from(params.lookup_anchor_age),
        u64::from(params.preimage_expiry),
        params.gas_accumulate_report as u64,
        params.gas_is_authorized as u64,
        params.gas_refine as u64,
        params.gas_accumulate_total as u64,
        params.max_work_items as u64,
        params.max_dependencies as u64,
        params.max_tickets_per_block as u64,
        u64::from(params.ticket_attempts),
        params.auth_pool_size as u64,
        params.auth_queue_size as u64,
        u64::from(params.rotation_period),
        u64::from(params.report_timeout),
        params.balance_per_item,
        params.balance_per_octet,
        params.balance_base,
    ] {
        encode_natural(value, &mut out);
    }
    out
}
