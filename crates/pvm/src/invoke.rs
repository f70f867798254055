// Path: crates/pvm/src/invoke.rs
//! Invocation entry points and the host-call dispatch loop.

use crate::interp::{Machine, Status};
use crate::program::{Program, ProgramError};

/// Well-known entry points of service code. The value is the initial
/// program counter: service blobs begin with a dispatch table of jumps at
/// these fixed offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Authorizer entry.
    IsAuthorized,
    /// Refine entry.
    Refine,
    /// Accumulate entry.
    Accumulate,
    /// Transfer-notification entry.
    OnTransfer,
    /// An explicit program counter.
    At(u32),
}

impl Entry {
    /// The initial program counter for this entry point.
    pub fn pc(self) -> u32 {
        match self {
            Entry::IsAuthorized | Entry::Refine => 0,
            Entry::Accumulate => 5,
            Entry::OnTransfer => 10,
            Entry::At(pc) => pc,
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Halted normally with this output blob.
    Ok(Vec<u8>),
    /// Gas exhausted.
    OutOfGas,
    /// Guest trapped or the handler terminated it.
    Panic,
    /// Unresolved page fault at this address.
    Fault(u32),
    /// The program blob failed to parse.
    BadCode(ProgramError),
}

/// Result of one complete invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResult {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Gas consumed, never exceeding the budget.
    pub gas_used: i64,
}

/// A handler invoked while the machine is suspended on `ecalli`.
///
/// The handler reads and writes registers and memory directly on the
/// machine, charges any per-call gas surcharge itself, and either resumes
/// or terminates the invocation.
pub trait HostHandler {
    /// Handles host call `id`. Returning `None` resumes execution; a status
    /// terminates the run with it.
    fn host_call(&mut self, id: u64, machine: &mut Machine) -> Option<Status>;
}

/// A handler for pure programs: every call returns zero, per the unknown-id
/// rule.
pub struct NoHost;

impl HostHandler for NoHost {
    fn host_call(&mut self, _id: u64, machine: &mut Machine) -> Option<Status> {
        machine.regs[7] = 0;
        None
    }
}

/// Parses `blob`, lays out memory, and drives the machine to a terminal
/// status, routing host calls through `handler`.
pub fn invoke(
    blob: &[u8],
    entry: Entry,
    input: &[u8],
    gas: i64,
    handler: &mut dyn HostHandler,
) -> InvokeResult {
    let program = match Program::parse(blob) {
        Ok(program) => program,
        Err(e) => {
            return InvokeResult {
                outcome: Outcome::BadCode(e),
                gas_used: 0,
            }
        }
    };
    let mut machine = Machine::standard(program, input, entry.pc(), gas);
    let outcome = drive(&mut machine, handler);
    InvokeResult {
        outcome,
        gas_used: gas - machine.gas_remaining(),
    }
}

/// The dispatcher loop over an already-built machine.
pub fn drive(machine: &mut Machine, handler: &mut dyn HostHandler) -> Outcome {
    loop {
        match machine.run() {
            Status::Host(call) => {
                if let Some(terminal) = handler.host_call(call, machine) {
                    machine.status = terminal;
                    return outcome_of(machine);
                }
                machine.status = Status::Continue;
            }
            _ => return outcome_of(machine),
        }
    }
}

fn outcome_of(machine: &Machine) -> Outcome {
    match machine.status {
        Status::Halt => Outcome::Ok(machine.output()),
        Status::OutOfGas => Outcome::OutOfGas,
        Status::PageFault(addr) => Outcome::Fault(addr),
        _ => Outcome::Panic,
    }
}
