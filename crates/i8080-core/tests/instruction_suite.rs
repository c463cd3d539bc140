//! End-to-end instruction behavior through `step_one` and `run_until_halt`.

#![allow(clippy::pedantic, clippy::nursery, clippy::cast_possible_truncation)]

use i8080_core::{
    run_until_halt, step_one, CoreConfig, CoreState, Fault, FaultCode, HaltReason, NullPorts,
    NullTrace, Register, RegisterPair, RunOutcome, RunState, StepOutcome, TraceEvent,
    FLAGS_ACTIVE_MASK, FLAG_AUX_CARRY, FLAG_CARRY, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO,
};
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn core_with(program: &[u8]) -> CoreState {
    let mut state = CoreState::default();
    state.load_program(program).expect("program fits");
    state
}

fn step(state: &mut CoreState) -> StepOutcome {
    step_one(state, &mut NullPorts, &mut NullTrace)
}

fn run_with(state: &mut CoreState, config: &CoreConfig) -> RunOutcome {
    run_until_halt(state, &mut NullPorts, config, &mut NullTrace)
}

fn run(program: &[u8]) -> (CoreState, RunOutcome) {
    let mut state = core_with(program);
    let outcome = run_with(&mut state, &CoreConfig::default());
    (state, outcome)
}

#[test]
fn push_pop_pair_round_trip_restores_registers_and_sp() {
    let program = [
        0x31, 0x00, 0x20, // LXI SP,0x2000
        0x01, 0x34, 0x12, // LXI B,0x1234
        0xC5, // PUSH B
        0x01, 0x00, 0x00, // LXI B,0x0000
        0xC1, // POP B
    ];
    let mut state = core_with(&program);

    for _ in 0..3 {
        step(&mut state);
    }
    assert_eq!(state.arch.sp(), 0x1FFE);
    assert_eq!(state.memory.read(0x1FFF), Ok(0x12));
    assert_eq!(state.memory.read(0x1FFE), Ok(0x34));

    step(&mut state);
    step(&mut state);
    assert_eq!(state.arch.reg(Register::B), 0x12);
    assert_eq!(state.arch.reg(Register::C), 0x34);
    assert_eq!(state.arch.sp(), 0x2000);
}

#[test]
fn psw_round_trip_preserves_every_flag_combination() {
    let program = [
        0x31, 0x00, 0x20, // LXI SP,0x2000
        0xF5, // PUSH PSW
        0xAF, // XRA A
        0xF1, // POP PSW
    ];
    let active = [FLAG_SIGN, FLAG_ZERO, FLAG_AUX_CARRY, FLAG_PARITY, FLAG_CARRY];

    for combination in 0_u8..32 {
        let flags = active
            .iter()
            .enumerate()
            .filter(|(bit, _)| combination & (1 << bit) != 0)
            .fold(0, |acc, (_, flag)| acc | flag);

        let mut state = core_with(&program);
        state.arch.set_a(0xA5);
        state.arch.set_flags(flags);

        for _ in 0..4 {
            step(&mut state);
        }

        assert_eq!(state.arch.flags(), flags, "combination {combination:05b}");
        assert_eq!(state.arch.a(), 0xA5);
        assert_eq!(state.arch.sp(), 0x2000);
    }
}

#[test]
fn call_then_return_resumes_after_call() {
    let mut program = vec![0_u8; 0x21];
    program[..3].copy_from_slice(&[0x31, 0x00, 0x30]); // LXI SP,0x3000
    program[3..6].copy_from_slice(&[0xCD, 0x20, 0x00]); // CALL 0x0020
    program[6] = 0x76; // HLT
    program[0x20] = 0xC9; // RET
    let mut state = core_with(&program);

    step(&mut state);
    step(&mut state);
    assert_eq!(state.arch.pc(), 0x0020);
    assert_eq!(state.arch.sp(), 0x2FFE);
    assert_eq!(state.memory.read_u16_le(0x2FFE), Ok(0x0006));

    step(&mut state);
    assert_eq!(state.arch.pc(), 0x0006);
    assert_eq!(state.arch.sp(), 0x3000);
}

#[test]
fn restart_pushes_return_address_and_jumps_to_vector() {
    let mut program = vec![0_u8; 0x40];
    program[0x10] = 0xEF; // RST 5
    let mut state = core_with(&program);
    state.arch.set_pc(0x0010);
    state.arch.set_sp(0x1000);

    step(&mut state);

    assert_eq!(state.arch.pc(), 0x0028);
    assert_eq!(state.memory.read_u16_le(0x0FFE), Ok(0x0011));
}

#[test]
fn jump_targets_little_endian_operand() {
    let mut state = core_with(&[0xC3, 0x34, 0x12]);

    assert_eq!(
        step(&mut state),
        StepOutcome::Retired {
            pc: 0,
            next_pc: 0x1234
        }
    );
    assert_eq!(state.arch.pc(), 0x1234);
}

#[rstest]
#[case(true, 0x0100)]
#[case(false, 0x0003)]
fn jump_if_zero_follows_zero_flag(#[case] zero: bool, #[case] expected_pc: u16) {
    let mut state = core_with(&[0xCA, 0x00, 0x01]);
    state.arch.set_flag(FLAG_ZERO, zero);

    step(&mut state);

    assert_eq!(state.arch.pc(), expected_pc);
}

#[rstest]
#[case(0xC2, FLAG_ZERO, false)]
#[case(0xD2, FLAG_CARRY, false)]
#[case(0xDA, FLAG_CARRY, true)]
#[case(0xE2, FLAG_PARITY, false)]
#[case(0xEA, FLAG_PARITY, true)]
#[case(0xF2, FLAG_SIGN, false)]
#[case(0xFA, FLAG_SIGN, true)]
fn conditional_jumps_test_their_flag(#[case] opcode: u8, #[case] flag: u8, #[case] when_set: bool) {
    for set in [false, true] {
        let mut state = core_with(&[opcode, 0x00, 0x02]);
        state.arch.set_flag(flag, set);

        step(&mut state);

        let expected = if set == when_set { 0x0200 } else { 0x0003 };
        assert_eq!(state.arch.pc(), expected, "opcode 0x{opcode:02X} flag set={set}");
    }
}

#[test]
fn conditional_return_not_taken_leaves_stack() {
    let mut state = core_with(&[0xC8]); // RZ
    state.arch.set_sp(0x2000);

    step(&mut state);

    assert_eq!(state.arch.pc(), 1);
    assert_eq!(state.arch.sp(), 0x2000);
}

#[test]
fn countdown_loop_halts_on_hlt() {
    let program = [
        0x3E, 0x05, // MVI A,5
        0x3D, // loop: DCR A
        0xC2, 0x02, 0x00, // JNZ loop
        0x76, // HLT
    ];
    let (state, outcome) = run(&program);

    assert_eq!(
        outcome.final_step,
        StepOutcome::Halted(HaltReason::HaltInstruction)
    );
    assert_eq!(outcome.steps, 12);
    assert_eq!(state.arch.a(), 0);
    assert!(state.arch.flag_is_set(FLAG_ZERO));
}

#[test]
fn run_stops_at_end_of_program() {
    let (state, outcome) = run(&[0x00, 0x00, 0x00]);

    assert_eq!(outcome.final_step, StepOutcome::Halted(HaltReason::EndOfProgram));
    assert_eq!(outcome.steps, 3);
    assert_eq!(state.arch.pc(), 3);
}

#[test]
fn run_respects_step_limit() {
    let mut state = core_with(&[0xC3, 0x00, 0x00]); // JMP 0
    let config = CoreConfig {
        max_steps: Some(100),
        ..CoreConfig::default()
    };

    let outcome = run_with(&mut state, &config);

    assert_eq!(outcome.final_step, StepOutcome::Halted(HaltReason::StepLimit));
    assert_eq!(outcome.steps, 100);
    assert_eq!(state.run_state, RunState::Halted(HaltReason::StepLimit));
}

#[test]
fn unimplemented_opcode_halts_with_error() {
    let (state, outcome) = run(&[0x00, 0x08, 0x00]);

    assert_eq!(outcome.final_step, StepOutcome::Fault(Fault::unimplemented(1, 0x08)));
    assert_eq!(outcome.steps, 1);
    assert_eq!(state.arch.pc(), 1);
    assert_eq!(
        state.run_state,
        RunState::FaultLatched(FaultCode::UnimplementedOpcode)
    );
}

#[test]
fn load_beyond_reduced_memory_faults_precisely() {
    let config = CoreConfig {
        memory_size: 0x100,
        ..CoreConfig::default()
    };
    let mut state = CoreState::with_config(&config).expect("valid config");
    state
        .load_program(&[0x3E, 0x11, 0x3A, 0x00, 0x02]) // MVI A,0x11 ; LDA 0x0200
        .expect("program fits");

    let outcome = run_with(&mut state, &config);

    let fault = Fault::out_of_bounds(2, Some(0x3A), 0x0200);
    assert_eq!(outcome.fault(), Some(fault));
    assert_eq!(state.latched_fault, Some(fault));
    assert_eq!(state.arch.pc(), 2);
    assert_eq!(state.arch.a(), 0x11);
}

#[test]
fn call_with_stack_outside_memory_commits_nothing() {
    let config = CoreConfig {
        memory_size: 0x100,
        ..CoreConfig::default()
    };
    let mut state = CoreState::with_config(&config).expect("valid config");
    state
        .load_program(&[0xCD, 0x10, 0x00])
        .expect("program fits");
    let before = state.clone();

    let outcome = step(&mut state);

    assert_eq!(
        outcome,
        StepOutcome::Fault(Fault::out_of_bounds(0, Some(0xCD), 0xFFFF))
    );
    assert_eq!(state.arch, before.arch);
    assert_eq!(state.memory, before.memory);
}

#[test]
fn bcd_addition_is_adjusted_by_daa() {
    let (state, _) = run(&[0x3E, 0x19, 0xC6, 0x28, 0x27]); // MVI A,0x19 ; ADI 0x28 ; DAA

    assert_eq!(state.arch.a(), 0x47);
    assert!(!state.arch.flag_is_set(FLAG_CARRY));
}

#[test]
fn subtract_with_borrow_consumes_carry() {
    let (state, _) = run(&[0x37, 0x3E, 0x05, 0xDE, 0x05]); // STC ; MVI A,5 ; SBI 5

    assert_eq!(state.arch.a(), 0xFF);
    assert!(state.arch.flag_is_set(FLAG_CARRY));
    assert!(state.arch.flag_is_set(FLAG_SIGN));
    assert!(!state.arch.flag_is_set(FLAG_ZERO));
}

#[test]
fn logical_and_immediate_sets_aux_carry_from_bit_three() {
    let (state, _) = run(&[0x3E, 0x08, 0xE6, 0xF0]); // MVI A,0x08 ; ANI 0xF0

    assert_eq!(state.arch.a(), 0x00);
    assert_eq!(state.arch.flags(), FLAG_ZERO | FLAG_PARITY | FLAG_AUX_CARRY);
}

#[test]
fn sixteen_bit_transfers_use_little_endian_memory() {
    let program = [
        0x21, 0xCD, 0xAB, // LXI H,0xABCD
        0x22, 0x00, 0x40, // SHLD 0x4000
        0xEB, // XCHG
        0x2A, 0x00, 0x40, // LHLD 0x4000
        0x19, // DAD D
    ];
    let (state, _) = run(&program);

    assert_eq!(state.memory.read(0x4000), Ok(0xCD));
    assert_eq!(state.memory.read(0x4001), Ok(0xAB));
    assert_eq!(state.arch.pair(RegisterPair::De), 0xABCD);
    assert_eq!(state.arch.hl(), 0x579A);
    assert!(state.arch.flag_is_set(FLAG_CARRY));
}

#[test]
fn complement_accumulator_leaves_every_flag_alone() {
    for flags in [0, FLAGS_ACTIVE_MASK, FLAG_ZERO | FLAG_CARRY] {
        let mut state = core_with(&[0x2F]); // CMA
        state.arch.set_a(0x5A);
        state.arch.set_flags(flags);

        assert_eq!(step(&mut state), StepOutcome::Retired { pc: 0, next_pc: 1 });
        assert_eq!(state.arch.a(), !0x5A);
        assert_eq!(state.arch.flags(), flags);
    }
}

#[rstest]
#[case::stc_from_clear(0x37, 0, FLAG_CARRY)]
#[case::stc_when_set(0x37, FLAG_CARRY, FLAG_CARRY)]
#[case::cmc_sets(0x3F, 0, FLAG_CARRY)]
#[case::cmc_clears(0x3F, FLAG_CARRY, 0)]
fn carry_instructions_touch_only_carry(
    #[case] opcode: u8,
    #[case] carry_before: u8,
    #[case] carry_after: u8,
) {
    let others = FLAG_SIGN | FLAG_ZERO | FLAG_AUX_CARRY | FLAG_PARITY;
    let mut state = core_with(&[opcode]);
    state.arch.set_a(0x33);
    state.arch.set_flags(others | carry_before);

    step(&mut state);

    assert_eq!(state.arch.flags(), others | carry_after);
    assert_eq!(state.arch.a(), 0x33);
}

#[rstest]
#[case::rlc(0x07, 0x81, false, 0x03, true)]
#[case::rrc(0x0F, 0x01, false, 0x80, true)]
#[case::ral(0x17, 0x80, false, 0x00, true)]
#[case::ral_carry_in(0x17, 0x01, true, 0x03, false)]
#[case::rar(0x1F, 0x01, false, 0x00, true)]
#[case::rar_carry_in(0x1F, 0x02, true, 0x81, false)]
fn dispatched_rotates_update_only_carry(
    #[case] opcode: u8,
    #[case] a: u8,
    #[case] carry_in: bool,
    #[case] value: u8,
    #[case] carry_out: bool,
) {
    let others = FLAG_SIGN | FLAG_AUX_CARRY | FLAG_PARITY;
    let carry_bit = |set: bool| if set { FLAG_CARRY } else { 0 };
    let mut state = core_with(&[opcode]);
    state.arch.set_a(a);
    state.arch.set_flags(others | carry_bit(carry_in));

    step(&mut state);

    assert_eq!(state.arch.a(), value);
    assert_eq!(state.arch.flags(), others | carry_bit(carry_out));
}

#[test]
fn trace_sink_sees_start_and_retire_for_each_instruction() {
    let mut state = core_with(&[0x00, 0x76]);
    let mut events = Vec::new();

    run_until_halt(&mut state, &mut NullPorts, &CoreConfig::default(), &mut events);

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], TraceEvent::InstructionStart { pc: 0, .. }));
    assert_eq!(events[1], TraceEvent::InstructionRetired { pc: 0, next_pc: 1 });
    assert!(matches!(events[2], TraceEvent::InstructionStart { pc: 1, .. }));
    assert_eq!(events[3], TraceEvent::InstructionRetired { pc: 1, next_pc: 2 });
}

proptest! {
    #[test]
    fn arbitrary_program_never_panics_and_stays_consistent(
        program in proptest::collection::vec(any::<u8>(), 1..64),
        memory_size in 1_usize..=0x200,
    ) {
        let config = CoreConfig {
            memory_size: memory_size.max(program.len()),
            max_steps: Some(256),
            ..CoreConfig::default()
        };
        let mut state = CoreState::with_config(&config).expect("valid config");
        state.load_program(&program).expect("program fits");

        let outcome = run_with(&mut state, &config);

        prop_assert!(state.run_state.is_terminal());
        prop_assert_eq!(state.arch.flags() & !FLAGS_ACTIVE_MASK, 0);
        prop_assert!(outcome.steps <= 256);
        if let StepOutcome::Fault(fault) = outcome.final_step {
            prop_assert_eq!(state.latched_fault, Some(fault));
            prop_assert_eq!(state.arch.pc(), fault.pc);
        }
    }

    #[test]
    fn add_immediate_matches_wide_arithmetic(a in any::<u8>(), b in any::<u8>()) {
        let mut state = core_with(&[0xC6, b]);
        state.arch.set_a(a);

        step(&mut state);

        let wide = u16::from(a) + u16::from(b);
        prop_assert_eq!(state.arch.a(), wide as u8);
        prop_assert_eq!(state.arch.flag_is_set(FLAG_CARRY), wide > 0xFF);
        prop_assert_eq!(state.arch.flag_is_set(FLAG_ZERO), wide as u8 == 0);
        prop_assert_eq!(state.arch.flag_is_set(FLAG_PARITY), (wide as u8).count_ones() % 2 == 0);
    }
}
