// Path: crates/pvm/src/lib.rs
#![forbid(unsafe_code)]

//! The PVM: a deterministic, gas-metered interpreter for service code.
//!
//! The crate is pure computation over explicit inputs: a program blob, a
//! register file, paged memory and a gas budget. Host calls suspend the
//! machine; whoever drives the invocation supplies the handler. Nothing in
//! here touches chain state, which is what keeps the interpreter reusable
//! for refine, accumulate, authorization and nested guests alike.

pub mod hostcall;
pub mod instructions;
pub mod interp;
pub mod invoke;
pub mod memory;
pub mod program;

pub use hostcall::{GuestMachines, id as host_id};
pub use interp::{Machine, Status, REG_COUNT, STEP_CAP};
pub use invoke::{drive, invoke, Entry, HostHandler, InvokeResult, NoHost, Outcome};
pub use memory::{Access, MemFault, Memory, HALT_ADDRESS, PAGE_SIZE, ZONE_SIZE};
pub use program::{build_blob, Program, ProgramError};
