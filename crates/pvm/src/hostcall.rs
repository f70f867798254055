// Path: crates/pvm/src/hostcall.rs
//! Host-call identifiers and the inner-PVM (guest machine) registry.
//!
//! The interpreter only suspends on `ecalli`; everything behind a call id is
//! the dispatcher's business. The identifiers are consensus constants. The
//! guest-machine registry backs the refine-phase calls that let service code
//! run nested PVM instances.

use crate::interp::{Machine, Status};
use crate::memory::{Access, Memory};
use crate::program::{Program, ProgramError};
use std::collections::BTreeMap;

/// Host-call identifiers.
pub mod id {
    /// Remaining gas.
    pub const GAS: u64 = 0;
    /// Read an invocation argument blob, selector in ω10.
    pub const FETCH: u64 = 1;
    /// Look up a preimage held by a service.
    pub const LOOKUP: u64 = 2;
    /// Read a service storage key.
    pub const READ: u64 = 3;
    /// Write a service storage key.
    pub const WRITE: u64 = 4;
    /// Inspect a service account's metadata.
    pub const INFO: u64 = 5;
    /// Look up a preimage as of the lookup anchor.
    pub const HISTORICAL_LOOKUP: u64 = 6;
    /// Push an export segment.
    pub const EXPORT: u64 = 7;
    /// Instantiate a guest machine.
    pub const MACHINE: u64 = 8;
    /// Read guest memory.
    pub const PEEK: u64 = 9;
    /// Write guest memory.
    pub const POKE: u64 = 10;
    /// Change guest page permissions.
    pub const PAGES: u64 = 11;
    /// Run a guest machine.
    pub const INVOKE: u64 = 12;
    /// Destroy a guest machine.
    pub const EXPUNGE: u64 = 13;
    /// Set privileged assignments (accumulate only).
    pub const BLESS: u64 = 14;
    /// Assign a core's authorization queue (accumulate only).
    pub const ASSIGN: u64 = 15;
    /// Designate the next validator set (accumulate only).
    pub const DESIGNATE: u64 = 16;
    /// Snapshot the partial state (accumulate only).
    pub const CHECKPOINT: u64 = 17;
    /// Create a service (accumulate only).
    pub const NEW: u64 = 18;
    /// Upgrade this service's code (accumulate only).
    pub const UPGRADE: u64 = 19;
    /// Queue a deferred balance transfer (accumulate only).
    pub const TRANSFER: u64 = 20;
    /// Remove a defunct service (accumulate only).
    pub const EJECT: u64 = 21;
    /// Query a preimage request (accumulate only).
    pub const QUERY: u64 = 22;
    /// Solicit a preimage (accumulate only).
    pub const SOLICIT: u64 = 23;
    /// Drop a preimage request (accumulate only).
    pub const FORGET: u64 = 24;
    /// Set the accumulation output hash (accumulate only).
    pub const YIELD: u64 = 25;
    /// Provide a preimage for another service (accumulate only).
    pub const PROVIDE: u64 = 26;
    /// Debug logging; no consensus effect.
    pub const LOG: u64 = 100;
}

/// Return-register codes written by host handlers.
pub mod hostret {
    /// Success.
    pub const OK: u64 = 0;
    /// Referenced item absent.
    pub const NONE: u64 = u64::MAX;
    /// Referenced entity unknown.
    pub const WHO: u64 = u64::MAX - 1;
    /// Insufficient funds.
    pub const CASH: u64 = u64::MAX - 2;
    /// Gas below the required minimum.
    pub const LOW: u64 = u64::MAX - 3;
    /// Item already solicited or provided.
    pub const HUH: u64 = u64::MAX - 4;
    /// The operation is not permitted for the caller.
    pub const FULL: u64 = u64::MAX - 5;
}

/// Errors from guest-machine management.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GuestError {
    /// No guest registered under the handle.
    #[error("Unknown guest machine handle {0}")]
    UnknownHandle(u64),
    /// The supplied code blob failed to parse.
    #[error("Guest code rejected: {0}")]
    BadCode(#[from] ProgramError),
}

/// Registry of nested PVM instances owned by one refine invocation.
#[derive(Debug, Default)]
pub struct GuestMachines {
    machines: BTreeMap<u64, Machine>,
    next_handle: u64,
}

impl GuestMachines {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates a guest from a bare code blob with an empty memory and
    /// returns its handle.
    pub fn create(&mut self, code_blob: &[u8], pc: u32) -> Result<u64, GuestError> {
        let program = Program::parse_code_blob(code_blob)?;
        let machine = Machine::new(program, Memory::new(), pc, 0);
        let handle = self.next_handle;
        self.next_handle += 1;
        self.machines.insert(handle, machine);
        Ok(handle)
    }

    /// Reads `len` octets of guest memory.
    pub fn peek(&self, handle: u64, addr: u32, len: u32) -> Result<Option<Vec<u8>>, GuestError> {
        let machine = self
            .machines
            .get(&handle)
            .ok_or(GuestError::UnknownHandle(handle))?;
        Ok(machine.memory.read(addr, len).ok())
    }

    /// Writes guest memory, mapping the pages writable first if absent.
    pub fn poke(&mut self, handle: u64, addr: u32, data: &[u8]) -> Result<bool, GuestError> {
        let machine = self
            .machines
            .get_mut(&handle)
            .ok_or(GuestError::UnknownHandle(handle))?;
        Ok(machine.memory.write(addr, data).is_ok())
    }

    /// Re-permissions a page range in the guest.
    pub fn pages(
        &mut self,
        handle: u64,
        addr: u32,
        len: u32,
        access: Access,
    ) -> Result<(), GuestError> {
        let machine = self
            .machines
            .get_mut(&handle)
            .ok_or(GuestError::UnknownHandle(handle))?;
        machine.memory.map_region(addr, len, access);
        Ok(())
    }

    /// Runs a guest with the given registers and gas; returns the terminal
    /// status, the gas consumed and the registers afterward.
    pub fn invoke(
        &mut self,
        handle: u64,
        regs: [u64; 13],
        gas: i64,
    ) -> Result<(Status, i64, [u64; 13]), GuestError> {
        let machine = self
            .machines
            .get_mut(&handle)
            .ok_or(GuestError::UnknownHandle(handle))?;
        machine.regs = regs;
        machine.gas = gas;
        machine.status = Status::Continue;
        let status = machine.run();
        let used = gas - machine.gas_remaining();
        Ok((status, used, machine.regs))
    }

    /// Destroys a guest, returning its final program counter.
    pub fn expunge(&mut self, handle: u64) -> Result<u32, GuestError> {
        let machine = self
            .machines
            .remove(&handle)
            .ok_or(GuestError::UnknownHandle(handle))?;
        Ok(machine.pc)
    }

    /// Number of live guests.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// True when no guests are registered.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
