// Path: crates/pvm/src/interp.rs
//! The interpreter: a plain state machine stepped until a terminal status.
//!
//! Host calls are modeled as a suspension, not a callback: `step` returns
//! [`Status::Host`] with the call id latched and the program counter already
//! advanced, and the enclosing dispatcher resumes the machine after handling
//! the call. Nothing here performs I/O.

use crate::instructions::{opcode, reg, sext_imm, uimm};
use crate::memory::{standard_layout, MemFault, Memory, HALT_ADDRESS, INPUT_BASE, STACK_TOP};
use crate::program::Program;

/// Number of general-purpose registers.
pub const REG_COUNT: usize = 13;

/// Safety bound on interpreter steps regardless of gas.
pub const STEP_CAP: u64 = 100_000_000;

/// The machine status after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ready for the next instruction.
    Continue,
    /// Normal termination.
    Halt,
    /// Irrecoverable guest misbehavior.
    Panic,
    /// The gas counter went negative.
    OutOfGas,
    /// Access to an unmapped or protected page; carries the page base.
    PageFault(u32),
    /// Suspended on a host call with this identifier.
    Host(u64),
}

impl Status {
    /// True for statuses that end the invocation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Continue | Status::Host(_))
    }
}

/// A PVM instance.
#[derive(Debug, Clone)]
pub struct Machine {
    /// General-purpose registers.
    pub regs: [u64; REG_COUNT],
    /// Program counter, an octet offset into the code.
    pub pc: u32,
    /// Remaining gas; signed so the overrunning step is observable.
    pub gas: i64,
    /// Current status.
    pub status: Status,
    /// Guest memory.
    pub memory: Memory,
    /// The program under execution.
    pub program: Program,
    /// Identifier latched by the most recent `ecalli`.
    pub host_call_id: u64,
}

impl Machine {
    /// A machine over an explicit memory image, starting at `pc`.
    pub fn new(program: Program, memory: Memory, pc: u32, gas: i64) -> Self {
        Self {
            regs: [0; REG_COUNT],
            pc,
            gas,
            status: Status::Continue,
            memory,
            program,
            host_call_id: 0,
        }
    }

    /// A machine with the standard region layout and register conventions:
    /// the return-address register holds the halt sentinel, the stack
    /// pointer sits at the stack top, and registers 7/8 carry the input
    /// blob's address and length.
    pub fn standard(program: Program, input: &[u8], pc: u32, gas: i64) -> Self {
        let memory = standard_layout(
            &program.ro_data,
            &program.rw_data,
            program.stack_reservation(),
            input,
        );
        let mut machine = Self::new(program, memory, pc, gas);
        machine.regs[0] = u64::from(HALT_ADDRESS);
        machine.regs[1] = u64::from(STACK_TOP);
        machine.regs[7] = u64::from(INPUT_BASE);
        machine.regs[8] = input.len() as u64;
        machine
    }

    /// On a halted machine, the output blob `memory[ω7 .. ω7+ω8)`; empty on
    /// any other terminal status or when the range is unreadable.
    pub fn output(&self) -> Vec<u8> {
        if self.status != Status::Halt {
            return Vec::new();
        }
        let addr = self.regs[7] as u32;
        let len = self.regs[8] as u32;
        self.memory.read(addr, len).unwrap_or_default()
    }

    /// Gas left, clamped at zero for reporting.
    pub fn gas_remaining(&self) -> i64 {
        self.gas.max(0)
    }

    fn set32(&mut self, d: usize, value: u32) {
        self.regs[d] = value as i32 as i64 as u64;
    }

    fn fault(&mut self, fault: MemFault) -> Status {
        if fault.reserved {
            self.status = Status::Panic;
        } else {
            self.status = Status::PageFault(fault.address);
            self.pc = fault.address;
        }
        self.status
    }

    fn branch_to(&mut self, target: i64) -> Status {
        if target < 0
            || target as usize >= self.program.code.len()
            || !self.program.is_instruction_start(target as u32)
        {
            self.status = Status::Panic;
            return self.status;
        }
        self.pc = target as u32;
        Status::Continue
    }

    fn dynamic_jump(&mut self, addr: u32) -> Status {
        if addr == HALT_ADDRESS {
            self.status = Status::Halt;
            return self.status;
        }
        if addr == 0 || addr % 2 != 0 {
            self.status = Status::Panic;
            return self.status;
        }
        let index = (addr / 2 - 1) as usize;
        match self.program.jump_table.get(index) {
            Some(&target)
                if (target as usize) < self.program.code.len()
                    && self.program.is_instruction_start(target) =>
            {
                self.pc = target;
                Status::Continue
            }
            _ => {
                self.status = Status::Panic;
                self.status
            }
        }
    }

    fn load(&mut self, d: usize, addr: u32, width: u32, signed: bool) -> Status {
        let bytes = match self.memory.read(addr, width) {
            Ok(bytes) => bytes,
            Err(fault) => return self.fault(fault),
        };
        let mut buf = [0u8; 8];
        buf[..width as usize].copy_from_slice(&bytes);
        let raw = u64::from_le_bytes(buf);
        self.regs[d] = if signed {
            sext_imm(&bytes, width as usize)
        } else {
            raw
        };
        Status::Continue
    }

    fn store(&mut self, addr: u32, value: u64, width: u32) -> Status {
        let bytes = value.to_le_bytes();
        match self.memory.write(addr, &bytes[..width as usize]) {
            Ok(()) => Status::Continue,
            Err(fault) => self.fault(fault),
        }
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> Status {
        if self.status != Status::Continue {
            return self.status;
        }
        self.gas -= 1;
        if self.gas < 0 {
            self.status = Status::OutOfGas;
            return self.status;
        }

        let pc = self.pc;
        if pc as usize >= self.program.code.len() {
            self.status = Status::Panic;
            return self.status;
        }
        let op = if self.program.is_instruction_start(pc) {
            self.program.code[pc as usize]
        } else {
            opcode::TRAP
        };
        let skip = self.program.skip(pc) as usize;
        let mut ops = [0u8; 24];
        let start = pc as usize + 1;
        let avail = skip.min(self.program.code.len().saturating_sub(start));
        ops[..avail].copy_from_slice(&self.program.code[start..start + avail]);
        // Pre-advance; jumps, branches and faults overwrite this.
        self.pc = pc + 1 + skip as u32;

        use opcode::*;
        let status = match op {
            TRAP => {
                self.status = Status::Panic;
                self.status
            }
            FALLTHROUGH => Status::Continue,

            ECALLI => {
                let id = uimm(&ops, skip.min(4));
                self.host_call_id = id;
                self.status = Status::Host(id);
                return self.status;
            }

            LOAD_IMM_64 => {
                let d = reg(ops[0]);
                self.regs[d] = u64::from_le_bytes(ops[1..9].try_into().expect("8 bytes"));
                Status::Continue
            }

            STORE_IMM_U8 | STORE_IMM_U16 | STORE_IMM_U32 | STORE_IMM_U64 => {
                let lx = (ops[0] as usize % 8).min(4);
                let addr = sext_imm(&ops[1..], lx) as u32;
                let ly = skip.saturating_sub(1 + lx).min(4);
                let value = sext_imm(&ops[1 + lx..], ly);
                let width = 1u32 << (op - STORE_IMM_U8);
                self.store(addr, value, width)
            }

            JUMP => {
                let offset = sext_imm(&ops, skip.min(4)) as i64;
                self.branch_to(pc as i64 + offset)
            }

            JUMP_IND => {
                let a = reg(ops[0]);
                let imm = sext_imm(&ops[1..], skip.saturating_sub(1).min(4));
                let addr = (self.regs[a].wrapping_add(imm)) as u32;
                self.dynamic_jump(addr)
            }
            LOAD_IMM => {
                let a = reg(ops[0]);
                self.regs[a] = sext_imm(&ops[1..], skip.saturating_sub(1).min(4));
                Status::Continue
            }
            LOAD_U8 | LOAD_I8 | LOAD_U16 | LOAD_I16 | LOAD_U32 | LOAD_I32 | LOAD_U64 => {
                let a = reg(ops[0]);
                let addr = sext_imm(&ops[1..], skip.saturating_sub(1).min(4)) as u32;
                let (width, signed) = match op {
                    LOAD_U8 => (1, false),
                    LOAD_I8 => (1, true),
                    LOAD_U16 => (2, false),
                    LOAD_I16 => (2, true),
                    LOAD_U32 => (4, false),
                    LOAD_I32 => (4, true),
                    _ => (8, false),
                };
                self.load(a, addr, width, signed)
            }
            STORE_U8 | STORE_U16 | STORE_U32 | STORE_U64 => {
                let a = reg(ops[0]);
                let addr = sext_imm(&ops[1..], skip.saturating_sub(1).min(4)) as u32;
                let width = 1u32 << (op - STORE_U8);
                self.store(addr, self.regs[a], width)
            }

            STORE_IMM_IND_U8 | STORE_IMM_IND_U16 | STORE_IMM_IND_U32 | STORE_IMM_IND_U64 => {
                let a = reg(ops[0]);
                let lx = ((ops[0] >> 4) as usize % 8).min(4);
                let offset = sext_imm(&ops[1..], lx);
                let ly = skip.saturating_sub(1 + lx).min(4);
                let value = sext_imm(&ops[1 + lx..], ly);
                let addr = (self.regs[a].wrapping_add(offset)) as u32;
                let width = 1u32 << (op - STORE_IMM_IND_U8);
                self.store(addr, value, width)
            }

            LOAD_IMM_JUMP => {
                let a = reg(ops[0]);
                let lx = ((ops[0] >> 4) as usize % 8).min(4);
                let imm = sext_imm(&ops[1..], lx);
                let ly = skip.saturating_sub(1 + lx).min(4);
                let offset = sext_imm(&ops[1 + lx..], ly) as i64;
                self.regs[a] = imm;
                self.branch_to(pc as i64 + offset)
            }
            BRANCH_EQ_IMM | BRANCH_NE_IMM | BRANCH_LT_U_IMM | BRANCH_LE_U_IMM
            | BRANCH_GE_U_IMM | BRANCH_GT_U_IMM | BRANCH_LT_S_IMM | BRANCH_LE_S_IMM
            | BRANCH_GE_S_IMM | BRANCH_GT_S_IMM => {
                let a = reg(ops[0]);
                let lx = ((ops[0] >> 4) as usize % 8).min(4);
                let imm = sext_imm(&ops[1..], lx);
                let ly = skip.saturating_sub(1 + lx).min(4);
                let offset = sext_imm(&ops[1 + lx..], ly) as i64;
                let lhs = self.regs[a];
                let taken = match op {
                    BRANCH_EQ_IMM => lhs == imm,
                    BRANCH_NE_IMM => lhs != imm,
                    BRANCH_LT_U_IMM => lhs < imm,
                    BRANCH_LE_U_IMM => lhs <= imm,
                    BRANCH_GE_U_IMM => lhs >= imm,
                    BRANCH_GT_U_IMM => lhs > imm,
                    BRANCH_LT_S_IMM => (lhs as i64) < imm as i64,
                    BRANCH_LE_S_IMM => (lhs as i64) <= imm as i64,
                    BRANCH_GE_S_IMM => (lhs as i64) >= imm as i64,
                    _ => (lhs as i64) > imm as i64,
                };
                if taken {
                    self.branch_to(pc as i64 + offset)
                } else {
                    Status::Continue
                }
            }

            MOVE_REG | SBRK | COUNT_SET_BITS_64 | COUNT_SET_BITS_32 | LEADING_ZERO_BITS_64
            | LEADING_ZERO_BITS_32 | TRAILING_ZERO_BITS_64 | TRAILING_ZERO_BITS_32
            | SIGN_EXTEND_8 | SIGN_EXTEND_16 | ZERO_EXTEND_16 | REVERSE_BYTES => {
                let d = reg(ops[0]);
                let a = reg(ops[0] >> 4);
                let value = self.regs[a];
                match op {
                    MOVE_REG => self.regs[d] = value,
                    SBRK => match self.memory.sbrk(value as u32) {
                        Ok(old) => self.regs[d] = u64::from(old),
                        Err(fault) => return self.fault(fault),
                    },
                    COUNT_SET_BITS_64 => self.regs[d] = u64::from(value.count_ones()),
                    COUNT_SET_BITS_32 => self.regs[d] = u64::from((value as u32).count_ones()),
                    LEADING_ZERO_BITS_64 => self.regs[d] = u64::from(value.leading_zeros()),
                    LEADING_ZERO_BITS_32 => {
                        self.regs[d] = u64::from((value as u32).leading_zeros())
                    }
                    TRAILING_ZERO_BITS_64 => self.regs[d] = u64::from(value.trailing_zeros()),
                    TRAILING_ZERO_BITS_32 => {
                        self.regs[d] = u64::from((value as u32).trailing_zeros())
                    }
                    SIGN_EXTEND_8 => self.regs[d] = value as u8 as i8 as i64 as u64,
                    SIGN_EXTEND_16 => self.regs[d] = value as u16 as i16 as i64 as u64,
                    ZERO_EXTEND_16 => self.regs[d] = value & 0xFFFF,
                    _ => self.regs[d] = value.swap_bytes(),
                }
                Status::Continue
            }

            STORE_IND_U8 | STORE_IND_U16 | STORE_IND_U32 | STORE_IND_U64 => {
                let a = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let imm = sext_imm(&ops[1..], skip.saturating_sub(1).min(4));
                let addr = (self.regs[b].wrapping_add(imm)) as u32;
                let width = 1u32 << (op - STORE_IND_U8);
                self.store(addr, self.regs[a], width)
            }
            LOAD_IND_U8 | LOAD_IND_I8 | LOAD_IND_U16 | LOAD_IND_I16 | LOAD_IND_U32
            | LOAD_IND_I32 | LOAD_IND_U64 => {
                let a = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let imm = sext_imm(&ops[1..], skip.saturating_sub(1).min(4));
                let addr = (self.regs[b].wrapping_add(imm)) as u32;
                let (width, signed) = match op {
                    LOAD_IND_U8 => (1, false),
                    LOAD_IND_I8 => (1, true),
                    LOAD_IND_U16 => (2, false),
                    LOAD_IND_I16 => (2, true),
                    LOAD_IND_U32 => (4, false),
                    LOAD_IND_I32 => (4, true),
                    _ => (8, false),
                };
                self.load(a, addr, width, signed)
            }
            ADD_IMM_32 | AND_IMM | XOR_IMM | OR_IMM | MUL_IMM_32 | SET_LT_U_IMM
            | SET_LT_S_IMM | SHLO_L_IMM_32 | SHLO_R_IMM_32 | SHAR_R_IMM_32 | NEG_ADD_IMM_32
            | SET_GT_U_IMM | SET_GT_S_IMM | SHLO_L_IMM_ALT_32 | SHLO_R_IMM_ALT_32
            | SHAR_R_IMM_ALT_32 | CMOV_IZ_IMM | CMOV_NZ_IMM | ADD_IMM_64 | MUL_IMM_64
            | SHLO_L_IMM_64 | SHLO_R_IMM_64 | SHAR_R_IMM_64 | NEG_ADD_IMM_64
            | SHLO_L_IMM_ALT_64 | SHLO_R_IMM_ALT_64 | SHAR_R_IMM_ALT_64 | ROT_R_64_IMM
            | ROT_R_64_IMM_ALT | ROT_R_32_IMM | ROT_R_32_IMM_ALT => {
                let d = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let imm = sext_imm(&ops[1..], skip.saturating_sub(1).min(4));
                let value = self.regs[b];
                match op {
                    ADD_IMM_32 => self.set32(d, (value as u32).wrapping_add(imm as u32)),
                    AND_IMM => self.regs[d] = value & imm,
                    XOR_IMM => self.regs[d] = value ^ imm,
                    OR_IMM => self.regs[d] = value | imm,
                    MUL_IMM_32 => self.set32(d, (value as u32).wrapping_mul(imm as u32)),
                    SET_LT_U_IMM => self.regs[d] = u64::from(value < imm),
                    SET_LT_S_IMM => self.regs[d] = u64::from((value as i64) < imm as i64),
                    SHLO_L_IMM_32 => self.set32(d, (value as u32) << (imm as u32 & 31)),
                    SHLO_R_IMM_32 => self.set32(d, (value as u32) >> (imm as u32 & 31)),
                    SHAR_R_IMM_32 => self.set32(d, ((value as i32) >> (imm as u32 & 31)) as u32),
                    NEG_ADD_IMM_32 => self.set32(d, (imm as u32).wrapping_sub(value as u32)),
                    SET_GT_U_IMM => self.regs[d] = u64::from(value > imm),
                    SET_GT_S_IMM => self.regs[d] = u64::from(value as i64 > imm as i64),
                    SHLO_L_IMM_ALT_32 => self.set32(d, (imm as u32) << (value as u32 & 31)),
                    SHLO_R_IMM_ALT_32 => self.set32(d, (imm as u32) >> (value as u32 & 31)),
                    SHAR_R_IMM_ALT_32 => {
                        self.set32(d, ((imm as i32) >> (value as u32 & 31)) as u32)
                    }
                    CMOV_IZ_IMM => {
                        if value == 0 {
                            self.regs[d] = imm;
                        }
                    }
                    CMOV_NZ_IMM => {
                        if value != 0 {
                            self.regs[d] = imm;
                        }
                    }
                    ADD_IMM_64 => self.regs[d] = value.wrapping_add(imm),
                    MUL_IMM_64 => self.regs[d] = value.wrapping_mul(imm),
                    SHLO_L_IMM_64 => self.regs[d] = value << (imm & 63),
                    SHLO_R_IMM_64 => self.regs[d] = value >> (imm & 63),
                    SHAR_R_IMM_64 => self.regs[d] = ((value as i64) >> (imm & 63)) as u64,
                    NEG_ADD_IMM_64 => self.regs[d] = imm.wrapping_sub(value),
                    SHLO_L_IMM_ALT_64 => self.regs[d] = imm << (value & 63),
                    SHLO_R_IMM_ALT_64 => self.regs[d] = imm >> (value & 63),
                    SHAR_R_IMM_ALT_64 => self.regs[d] = ((imm as i64) >> (value & 63)) as u64,
                    ROT_R_64_IMM => self.regs[d] = value.rotate_right(imm as u32 & 63),
                    ROT_R_64_IMM_ALT => self.regs[d] = imm.rotate_right(value as u32 & 63),
                    ROT_R_32_IMM => {
                        self.set32(d, (value as u32).rotate_right(imm as u32 & 31))
                    }
                    _ => self.set32(d, (imm as u32).rotate_right(value as u32 & 31)),
                }
                Status::Continue
            }

            BRANCH_EQ | BRANCH_NE | BRANCH_LT_U | BRANCH_LT_S | BRANCH_GE_U | BRANCH_GE_S => {
                let a = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let offset = sext_imm(&ops[1..], skip.saturating_sub(1).min(4)) as i64;
                let (lhs, rhs) = (self.regs[a], self.regs[b]);
                let taken = match op {
                    BRANCH_EQ => lhs == rhs,
                    BRANCH_NE => lhs != rhs,
                    BRANCH_LT_U => lhs < rhs,
                    BRANCH_LT_S => (lhs as i64) < rhs as i64,
                    BRANCH_GE_U => lhs >= rhs,
                    _ => (lhs as i64) >= rhs as i64,
                };
                if taken {
                    self.branch_to(pc as i64 + offset)
                } else {
                    Status::Continue
                }
            }

            LOAD_IMM_JUMP_IND => {
                let a = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let lx = (ops[1] as usize % 8).min(4);
                let imm = sext_imm(&ops[2..], lx);
                let ly = skip.saturating_sub(2 + lx).min(4);
                let offset = sext_imm(&ops[2 + lx..], ly);
                let base = self.regs[b];
                self.regs[a] = imm;
                self.dynamic_jump(base.wrapping_add(offset) as u32)
            }

            ADD_32 | SUB_32 | MUL_32 | DIV_U_32 | DIV_S_32 | REM_U_32 | REM_S_32 | SHLO_L_32
            | SHLO_R_32 | SHAR_R_32 | ADD_64 | SUB_64 | MUL_64 | DIV_U_64 | DIV_S_64
            | REM_U_64 | REM_S_64 | SHLO_L_64 | SHLO_R_64 | SHAR_R_64 | AND | XOR | OR
            | MUL_UPPER_S_S | MUL_UPPER_U_U | MUL_UPPER_S_U | SET_LT_U | SET_LT_S | CMOV_IZ
            | CMOV_NZ | ROT_L_64 | ROT_L_32 | ROT_R_64 | ROT_R_32 | AND_INV | OR_INV | XNOR
            | MAX | MAX_U | MIN | MIN_U => {
                let a = reg(ops[0]);
                let b = reg(ops[0] >> 4);
                let d = reg(ops[1]);
                let (x, y) = (self.regs[a], self.regs[b]);
                match op {
                    ADD_32 => self.set32(d, (x as u32).wrapping_add(y as u32)),
                    SUB_32 => self.set32(d, (x as u32).wrapping_sub(y as u32)),
                    MUL_32 => self.set32(d, (x as u32).wrapping_mul(y as u32)),
                    DIV_U_32 => {
                        if y as u32 == 0 {
                            self.regs[d] = u64::MAX;
                        } else {
                            self.set32(d, (x as u32) / (y as u32));
                        }
                    }
                    DIV_S_32 => {
                        let (xs, ys) = (x as i32, y as i32);
                        if ys == 0 {
                            self.regs[d] = u64::MAX;
                        } else if xs == i32::MIN && ys == -1 {
                            self.set32(d, xs as u32);
                        } else {
                            self.set32(d, (xs / ys) as u32);
                        }
                    }
                    REM_U_32 => {
                        if y as u32 == 0 {
                            self.set32(d, x as u32);
                        } else {
                            self.set32(d, (x as u32) % (y as u32));
                        }
                    }
                    REM_S_32 => {
                        let (xs, ys) = (x as i32, y as i32);
                        if ys == 0 {
                            self.set32(d, xs as u32);
                        } else if xs == i32::MIN && ys == -1 {
                            self.set32(d, 0);
                        } else {
                            self.set32(d, (xs % ys) as u32);
                        }
                    }
                    SHLO_L_32 => self.set32(d, (x as u32) << (y as u32 & 31)),
                    SHLO_R_32 => self.set32(d, (x as u32) >> (y as u32 & 31)),
                    SHAR_R_32 => self.set32(d, ((x as i32) >> (y as u32 & 31)) as u32),
                    ADD_64 => self.regs[d] = x.wrapping_add(y),
                    SUB_64 => self.regs[d] = x.wrapping_sub(y),
                    MUL_64 => self.regs[d] = x.wrapping_mul(y),
                    DIV_U_64 => {
                        self.regs[d] = if y == 0 { u64::MAX } else { x / y };
                    }
                    DIV_S_64 => {
                        let (xs, ys) = (x as i64, y as i64);
                        self.regs[d] = if ys == 0 {
                            u64::MAX
                        } else if xs == i64::MIN && ys == -1 {
                            x
                        } else {
                            (xs / ys) as u64
                        };
                    }
                    REM_U_64 => {
                        self.regs[d] = if y == 0 { x } else { x % y };
                    }
                    REM_S_64 => {
                        let (xs, ys) = (x as i64, y as i64);
                        self.regs[d] = if ys == 0 {
                            x
                        } else if xs == i64::MIN && ys == -1 {
                            0
                        } else {
                            (xs % ys) as u64
                        };
                    }
                    SHLO_L_64 => self.regs[d] = x << (y & 63),
                    SHLO_R_64 => self.regs[d] = x >> (y & 63),
                    SHAR_R_64 => self.regs[d] = ((x as i64) >> (y & 63)) as u64,
                    AND => self.regs[d] = x & y,
                    XOR => self.regs[d] = x ^ y,
                    OR => self.regs[d] = x | y,
                    MUL_UPPER_S_S => {
                        self.regs[d] = ((x as i64 as i128 * y as i64 as i128) >> 64) as u64;
                    }
                    MUL_UPPER_U_U => {
                        self.regs[d] = ((x as u128 * y as u128) >> 64) as u64;
                    }
                    MUL_UPPER_S_U => {
                        self.regs[d] = ((x as i64 as i128 * y as i128) >> 64) as u64;
                    }
                    SET_LT_U => self.regs[d] = u64::from(x < y),
                    SET_LT_S => self.regs[d] = u64::from((x as i64) < y as i64),
                    CMOV_IZ => {
                        if y == 0 {
                            self.regs[d] = x;
                        }
                    }
                    CMOV_NZ => {
                        if y != 0 {
                            self.regs[d] = x;
                        }
                    }
                    ROT_L_64 => self.regs[d] = x.rotate_left(y as u32 & 63),
                    ROT_L_32 => self.set32(d, (x as u32).rotate_left(y as u32 & 31)),
                    ROT_R_64 => self.regs[d] = x.rotate_right(y as u32 & 63),
                    ROT_R_32 => self.set32(d, (x as u32).rotate_right(y as u32 & 31)),
                    AND_INV => self.regs[d] = x & !y,
                    OR_INV => self.regs[d] = x | !y,
                    XNOR => self.regs[d] = !(x ^ y),
                    MAX => self.regs[d] = (x as i64).max(y as i64) as u64,
                    MAX_U => self.regs[d] = x.max(y),
                    MIN => self.regs[d] = (x as i64).min(y as i64) as u64,
                    _ => self.regs[d] = x.min(y),
                }
                Status::Continue
            }

            // Unassigned opcodes trap.
            _ => {
                self.status = Status::Panic;
                self.status
            }
        };
        status
    }

    /// Steps until a non-`Continue` status, bounding the loop by the gas
    /// counter and the global step cap.
    pub fn run(&mut self) -> Status {
        let cap = (self.gas.max(0) as u64 + 1).min(STEP_CAP);
        for _ in 0..cap {
            let status = self.step();
            if status != Status::Continue {
                return status;
            }
        }
        self.status = Status::OutOfGas;
        self.status
    }
}
