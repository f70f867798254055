// Path: crates/pvm/tests/interpreter.rs
//! End-to-end interpreter tests over assembled guest programs.

use jam_pvm::instructions::opcode;
use jam_pvm::memory::{HEAP_BASE, RW_BASE};
use jam_pvm::{invoke, Entry, HostHandler, Machine, NoHost, Outcome, Status};
use jam_test_utils::asm::Asm;

/// Runs a program that leaves its result in r2, returning the register.
fn run_r2(asm: &Asm, gas: i64) -> u64 {
    let program = asm.program();
    let mut machine = Machine::standard(program, &[], 0, gas);
    let status = machine.run();
    assert_eq!(status, Status::Halt, "program should halt, got {status:?}");
    machine.regs[2]
}

fn halting(asm: &mut Asm) {
    asm.jump_ind(0, 0);
}

#[test]
fn add_32_truncates_and_sign_extends() {
    let mut asm = Asm::new();
    asm.load_imm64(3, 0xFFFF_FFFF);
    asm.load_imm(4, 1);
    asm.alu(opcode::ADD_32, 2, 3, 4);
    halting(&mut asm);
    // 0xFFFFFFFF + 1 wraps to 0, sign-extends to 0.
    assert_eq!(run_r2(&asm, 100), 0);

    let mut asm = Asm::new();
    asm.load_imm64(3, 0x7FFF_FFFF);
    asm.load_imm(4, 1);
    asm.alu(opcode::ADD_32, 2, 3, 4);
    halting(&mut asm);
    // 0x80000000 sign-extends to the negative half.
    assert_eq!(run_r2(&asm, 100), 0xFFFF_FFFF_8000_0000);
}

#[test]
fn division_edge_cases() {
    // Division by zero yields all ones.
    let mut asm = Asm::new();
    asm.load_imm(3, 1234);
    asm.load_imm(4, 0);
    asm.alu(opcode::DIV_U_64, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), u64::MAX);

    // INT_MIN / -1 yields the dividend.
    let mut asm = Asm::new();
    asm.load_imm64(3, i64::MIN as u64);
    asm.load_imm64(4, u64::MAX); // -1
    asm.alu(opcode::DIV_S_64, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), i64::MIN as u64);

    // INT_MIN % -1 yields zero.
    let mut asm = Asm::new();
    asm.load_imm64(3, i64::MIN as u64);
    asm.load_imm64(4, u64::MAX);
    asm.alu(opcode::REM_S_64, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 0);

    // 32-bit: INT_MIN/-1 keeps the dividend, sign-extended.
    let mut asm = Asm::new();
    asm.load_imm64(3, i32::MIN as u32 as u64);
    asm.load_imm64(4, 0xFFFF_FFFF);
    asm.alu(opcode::DIV_S_32, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), i32::MIN as i64 as u64);
}

#[test]
fn mul_upper_variants() {
    let mut asm = Asm::new();
    asm.load_imm64(3, u64::MAX);
    asm.load_imm64(4, u64::MAX);
    asm.alu(opcode::MUL_UPPER_U_U, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), u64::MAX - 1);

    let mut asm = Asm::new();
    asm.load_imm64(3, u64::MAX); // -1 signed
    asm.load_imm64(4, u64::MAX);
    asm.alu(opcode::MUL_UPPER_S_S, 2, 3, 4);
    halting(&mut asm);
    // (-1) * (-1) = 1; upper 64 bits are zero.
    assert_eq!(run_r2(&asm, 100), 0);
}

#[test]
fn bit_counting_and_byte_reversal() {
    let mut asm = Asm::new();
    asm.load_imm64(3, 0x0123_4567_89AB_CDEF);
    asm.op(opcode::COUNT_SET_BITS_64, &[2 | (3 << 4)]);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 32);

    let mut asm = Asm::new();
    asm.load_imm64(3, 0x0123_4567_89AB_CDEF);
    asm.op(opcode::REVERSE_BYTES, &[2 | (3 << 4)]);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 0xEFCD_AB89_6745_2301);

    let mut asm = Asm::new();
    asm.load_imm64(3, 0x0000_0000_0000_FF00);
    asm.op(opcode::LEADING_ZERO_BITS_32, &[2 | (3 << 4)]);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 16);
}

#[test]
fn rotates_and_shifts() {
    let mut asm = Asm::new();
    asm.load_imm64(3, 0x8000_0000_0000_0001);
    asm.load_imm(4, 1);
    asm.alu(opcode::ROT_L_64, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 3);

    // Shift amounts wrap at the width.
    let mut asm = Asm::new();
    asm.load_imm(3, 1);
    asm.load_imm(4, 65);
    asm.alu(opcode::SHLO_L_64, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 2);
}

#[test]
fn memory_store_load_round_trip() {
    let mut asm = Asm::new();
    asm.load_imm(3, 0xAB);
    asm.store_u8(3, RW_BASE);
    asm.load_u8(2, RW_BASE);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 0xAB);
}

#[test]
fn unmapped_store_faults_with_page_base() {
    let mut asm = Asm::new();
    asm.load_imm(3, 1);
    asm.store_u8(3, 0x0009_1234);
    halting(&mut asm);
    let mut machine = Machine::standard(asm.program(), &[], 0, 100);
    assert_eq!(machine.run(), Status::PageFault(0x0009_1000));
    assert!(machine.output().is_empty());
}

#[test]
fn reserved_zone_access_panics() {
    let mut asm = Asm::new();
    asm.load_u8(2, 0x100);
    halting(&mut asm);
    let mut machine = Machine::standard(asm.program(), &[], 0, 100);
    assert_eq!(machine.run(), Status::Panic);
}

#[test]
fn sbrk_returns_heap_and_grows() {
    let mut asm = Asm::new();
    asm.load_imm(3, 0);
    asm.op(opcode::SBRK, &[2 | (3 << 4)]); // r2 = sbrk(0)
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), u64::from(HEAP_BASE));

    let mut asm = Asm::new();
    asm.load_imm(3, 100_000);
    asm.op(opcode::SBRK, &[2 | (3 << 4)]); // r2 = sbrk(100_000)
    asm.load_imm(4, 1);
    // The newly mapped pages are writable well past the initial heap zone.
    asm.alu_imm(opcode::ADD_IMM_64, 5, 2, 99_999);
    asm.op(opcode::STORE_IND_U8, &[4 | (5 << 4)]);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), u64::from(HEAP_BASE));
}

#[test]
fn halt_semantics_return_output_window() {
    // Scenario: place 0x41,0x42,0x43 in readable memory, point ω7/ω8 at it,
    // jump to the halt sentinel.
    let mut asm = Asm::new();
    asm.load_imm(3, 0x41);
    asm.store_u8(3, RW_BASE);
    asm.load_imm(3, 0x42);
    asm.store_u8(3, RW_BASE + 1);
    asm.load_imm(3, 0x43);
    asm.store_u8(3, RW_BASE + 2);
    asm.load_imm(7, RW_BASE);
    asm.load_imm(8, 3);
    asm.jump_ind(0, 0);
    let mut machine = Machine::standard(asm.program(), &[], 0, 1_000);
    assert_eq!(machine.run(), Status::Halt);
    assert_eq!(machine.output(), vec![0x41, 0x42, 0x43]);
}

#[test]
fn tight_loop_runs_out_of_gas() {
    // and r0,r0,r0 / jump back, forever.
    let mut asm = Asm::new();
    asm.alu(opcode::AND, 0, 0, 0);
    let mut ops = Vec::new();
    ops.extend_from_slice(&(-3i32).to_le_bytes());
    asm.op(opcode::JUMP, &ops);
    let mut machine = Machine::standard(asm.program(), &[], 0, 100);
    assert_eq!(machine.run(), Status::OutOfGas);
    assert_eq!(machine.gas_remaining(), 0);
    assert!(machine.output().is_empty());
}

#[test]
fn jump_ind_alignment_rules() {
    // Unaligned target panics.
    let mut asm = Asm::new();
    asm.load_imm(3, 0);
    asm.jump_ind(3, 3);
    let mut machine = Machine::standard(asm.program(), &[], 0, 100);
    assert_eq!(machine.run(), Status::Panic);

    // Jump-table dispatch reaches the landing pad.
    let mut asm = Asm::new();
    let entry = asm.jump_target(11); // the landing instruction below
    asm.load_imm(3, 0); // pc 0, 5 bytes
    asm.jump_ind(3, entry); // pc 5, 6 bytes
    assert_eq!(asm.here(), 11);
    asm.load_imm(2, 7);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 7);
}

#[test]
fn branch_targets_must_be_instruction_starts() {
    let mut asm = Asm::new();
    asm.load_imm(3, 1);
    // rA = 3, one-byte immediate 1, offset -4: lands inside the operands of
    // the load_imm above.
    asm.op(opcode::BRANCH_EQ_IMM, &[3 | (1 << 4), 1, 0xFC]);
    let mut machine = Machine::standard(asm.program(), &[], 0, 100);
    assert_eq!(machine.run(), Status::Panic);
}

#[test]
fn conditional_branches_select_paths() {
    // if r3 == 5 skip the trap.
    let mut asm = Asm::new();
    asm.load_imm(3, 5); // pc 0, size 5
    // branch_eq_imm r3, 5, +7 -> target pc 5+7=12
    asm.op(opcode::BRANCH_EQ_IMM, &[3 | (1 << 4), 5, 7]); // pc 5, size 4
    asm.trap(); // pc 9, size 1... padding below keeps targets aligned
    asm.nop(); // pc 10
    asm.nop(); // pc 11
    asm.load_imm(2, 1); // pc 12
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 1);
}

#[test]
fn host_call_suspends_and_resumes() {
    struct Recorder {
        calls: Vec<u64>,
    }
    impl HostHandler for Recorder {
        fn host_call(&mut self, id: u64, machine: &mut Machine) -> Option<Status> {
            self.calls.push(id);
            machine.regs[2] = 99;
            None
        }
    }
    let mut asm = Asm::new();
    asm.ecalli(42);
    halting(&mut asm);
    let mut handler = Recorder { calls: vec![] };
    let result = invoke(&asm.blob(), Entry::At(0), &[], 100, &mut handler);
    assert!(matches!(result.outcome, Outcome::Ok(_)));
    assert_eq!(handler.calls, vec![42]);
}

#[test]
fn unknown_host_ids_return_zero_and_continue() {
    let mut asm = Asm::new();
    asm.load_imm(7, 1234);
    asm.ecalli(200);
    asm.move_reg(2, 7);
    halting(&mut asm);
    let program = asm.program();
    let mut machine = Machine::standard(program, &[], 0, 100);
    let status = machine.run();
    assert_eq!(status, Status::Host(200));
    // The dispatcher (NoHost) zeroes the return register and resumes.
    let mut handler = NoHost;
    let outcome = jam_pvm::drive(&mut machine, &mut handler);
    assert!(matches!(outcome, Outcome::Ok(_)));
    assert_eq!(machine.regs[2], 0);
}

#[test]
fn cmov_and_minmax() {
    let mut asm = Asm::new();
    asm.load_imm(3, 10);
    asm.load_imm(4, 0);
    asm.load_imm(2, 1);
    asm.alu(opcode::CMOV_IZ, 2, 3, 4); // r4 == 0, so r2 = r3
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 10);

    let mut asm = Asm::new();
    asm.load_imm64(3, u64::MAX); // -1 signed
    asm.load_imm(4, 1);
    asm.alu(opcode::MAX, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), 1);

    let mut asm = Asm::new();
    asm.load_imm64(3, u64::MAX);
    asm.load_imm(4, 1);
    asm.alu(opcode::MAX_U, 2, 3, 4);
    halting(&mut asm);
    assert_eq!(run_r2(&asm, 100), u64::MAX);
}

#[test]
fn skipped_opcode_traps() {
    // Executing at a position whose mask bit is clear traps.
    let mut asm = Asm::new();
    asm.load_imm(2, 1);
    halting(&mut asm);
    let program = asm.program();
    let mut machine = Machine::standard(program, &[], 1, 100); // pc 1: operand byte
    assert_eq!(machine.run(), Status::Panic);
}
