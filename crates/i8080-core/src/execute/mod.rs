//! Instruction execution pipeline for the 8080.
//!
//! Every step follows the same commit sequence:
//! 1. Fetch and decode the instruction at `PC`
//! 2. Compute the fallthrough `PC` (`PC + length`)
//! 3. Run the handler selected by the encoding, staging register, flag, and memory effects
//! 4. Commit the staged effects and the next `PC`
//!
//! Faults are precise: a faulting instruction commits nothing.

pub mod alu;
pub mod flags;
mod helpers;

pub use alu::{AluOp, AluOutput, Rotate};
pub use flags::{parity, FlagsUpdate};

use tracing::{debug, trace};

use crate::decoder::{Condition, DecodedInstruction, StackPair};
use crate::encoding::OpcodeEncoding;
use crate::fault::Fault;
use crate::memory::Memory;
use crate::state::{
    ArchitecturalState, HaltReason, RegisterPair, RunState, FLAG_AUX_CARRY, FLAG_CARRY,
    FLAG_PARITY, FLAG_SIGN, FLAG_ZERO,
};
use crate::{CoreConfig, CoreState, Decoder, PortBus, RunOutcome, StepOutcome, TraceEvent, TraceSink};

/// Most memory writes a single instruction performs (`PUSH`, `CALL`, `SHLD`, `XTHL`).
pub const MAX_STAGED_WRITES: usize = 2;

/// Side effects staged by a handler, applied by [`commit_execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Address of the executing instruction.
    pub pc: u16,
    /// Opcode of the executing instruction.
    pub opcode: u8,
    /// Working copy of the registers. Flags here are the pre-instruction
    /// flags; changes go through `flags_update`.
    pub arch: ArchitecturalState,
    /// Next `PC`; starts as the fallthrough address.
    pub next_pc: u16,
    /// Flag change applied at commit.
    pub flags_update: FlagsUpdate,
    /// Validated memory writes in program order.
    pub memory_writes: [Option<(u16, u8)>; MAX_STAGED_WRITES],
    /// `HLT` retired.
    pub halt: bool,
}

impl ExecuteState {
    /// Starts staging for `instr` on top of the current registers.
    #[must_use]
    pub const fn new(arch: ArchitecturalState, instr: &DecodedInstruction) -> Self {
        let pc = arch.pc();
        Self {
            pc,
            opcode: instr.opcode,
            arch,
            next_pc: pc.wrapping_add(instr.len()),
            flags_update: FlagsUpdate::None,
            memory_writes: [None; MAX_STAGED_WRITES],
            halt: false,
        }
    }
}

/// Runs the handler selected by `instr.encoding` against the current state.
///
/// Nothing in `state` changes; the returned [`ExecuteState`] holds the staged
/// effects. `IN`/`OUT` reach the port bus directly.
///
/// # Errors
///
/// Returns the [`Fault`] raised by the handler.
pub fn execute_instruction(
    instr: &DecodedInstruction,
    state: &CoreState,
    ports: &mut dyn PortBus,
) -> Result<ExecuteState, Fault> {
    let memory = &state.memory;
    let mut exec = ExecuteState::new(state.arch, instr);

    match instr.encoding {
        OpcodeEncoding::Nop => {}
        OpcodeEncoding::Mov => execute_mov(instr, memory, &mut exec)?,
        OpcodeEncoding::Mvi => execute_mvi(instr, memory, &mut exec)?,
        OpcodeEncoding::Lxi => exec.arch.set_pair(instr.pair(), instr.imm16()),
        OpcodeEncoding::Lda => execute_lda(instr, memory, &mut exec)?,
        OpcodeEncoding::Sta => execute_sta(instr, memory, &mut exec)?,
        OpcodeEncoding::Lhld => execute_lhld(instr, memory, &mut exec)?,
        OpcodeEncoding::Shld => execute_shld(instr, memory, &mut exec)?,
        OpcodeEncoding::Ldax => execute_ldax(instr, memory, &mut exec)?,
        OpcodeEncoding::Stax => execute_stax(instr, memory, &mut exec)?,
        OpcodeEncoding::Xchg => execute_xchg(&mut exec),
        OpcodeEncoding::Sphl => exec.arch.set_sp(exec.arch.hl()),
        OpcodeEncoding::Inr => execute_step_register(instr, memory, &mut exec, alu::inc)?,
        OpcodeEncoding::Dcr => execute_step_register(instr, memory, &mut exec, alu::dec)?,
        OpcodeEncoding::Inx => execute_step_pair(instr, &mut exec, u16::wrapping_add),
        OpcodeEncoding::Dcx => execute_step_pair(instr, &mut exec, u16::wrapping_sub),
        OpcodeEncoding::Add => execute_alu(instr, memory, &mut exec, AluOp::Add, Operand::Field)?,
        OpcodeEncoding::Adc => execute_alu(instr, memory, &mut exec, AluOp::Adc, Operand::Field)?,
        OpcodeEncoding::Sub => execute_alu(instr, memory, &mut exec, AluOp::Sub, Operand::Field)?,
        OpcodeEncoding::Sbb => execute_alu(instr, memory, &mut exec, AluOp::Sbb, Operand::Field)?,
        OpcodeEncoding::Ana => execute_alu(instr, memory, &mut exec, AluOp::And, Operand::Field)?,
        OpcodeEncoding::Xra => execute_alu(instr, memory, &mut exec, AluOp::Xor, Operand::Field)?,
        OpcodeEncoding::Ora => execute_alu(instr, memory, &mut exec, AluOp::Or, Operand::Field)?,
        OpcodeEncoding::Cmp => execute_alu(instr, memory, &mut exec, AluOp::Cmp, Operand::Field)?,
        OpcodeEncoding::Adi => execute_alu(instr, memory, &mut exec, AluOp::Add, Operand::Imm)?,
        OpcodeEncoding::Aci => execute_alu(instr, memory, &mut exec, AluOp::Adc, Operand::Imm)?,
        OpcodeEncoding::Sui => execute_alu(instr, memory, &mut exec, AluOp::Sub, Operand::Imm)?,
        OpcodeEncoding::Sbi => execute_alu(instr, memory, &mut exec, AluOp::Sbb, Operand::Imm)?,
        OpcodeEncoding::Ani => execute_alu(instr, memory, &mut exec, AluOp::And, Operand::Imm)?,
        OpcodeEncoding::Xri => execute_alu(instr, memory, &mut exec, AluOp::Xor, Operand::Imm)?,
        OpcodeEncoding::Ori => execute_alu(instr, memory, &mut exec, AluOp::Or, Operand::Imm)?,
        OpcodeEncoding::Cpi => execute_alu(instr, memory, &mut exec, AluOp::Cmp, Operand::Imm)?,
        OpcodeEncoding::Dad => execute_dad(instr, &mut exec),
        OpcodeEncoding::Daa => execute_daa(&mut exec),
        OpcodeEncoding::Rlc => execute_rotate(&mut exec, Rotate::Left),
        OpcodeEncoding::Rrc => execute_rotate(&mut exec, Rotate::Right),
        OpcodeEncoding::Ral => execute_rotate(&mut exec, Rotate::LeftThroughCarry),
        OpcodeEncoding::Rar => execute_rotate(&mut exec, Rotate::RightThroughCarry),
        OpcodeEncoding::Cma => exec.arch.set_a(!exec.arch.a()),
        OpcodeEncoding::Stc => exec.flags_update = FlagsUpdate::Carry(true),
        OpcodeEncoding::Cmc => {
            exec.flags_update = FlagsUpdate::Carry(!exec.arch.flag_is_set(FLAG_CARRY));
        }
        OpcodeEncoding::Jmp => execute_jump(instr, &mut exec, None),
        OpcodeEncoding::Jcc => execute_jump(instr, &mut exec, Some(instr.condition())),
        OpcodeEncoding::Pchl => exec.next_pc = exec.arch.hl(),
        OpcodeEncoding::Call => execute_call(instr, memory, &mut exec, None)?,
        OpcodeEncoding::Ccc => execute_call(instr, memory, &mut exec, Some(instr.condition()))?,
        OpcodeEncoding::Rst => execute_rst(instr, memory, &mut exec)?,
        OpcodeEncoding::Ret => execute_ret(memory, &mut exec, None)?,
        OpcodeEncoding::Rcc => execute_ret(memory, &mut exec, Some(instr.condition()))?,
        OpcodeEncoding::Push => execute_push(instr, memory, &mut exec)?,
        OpcodeEncoding::Pop => execute_pop(instr, memory, &mut exec)?,
        OpcodeEncoding::Xthl => execute_xthl(memory, &mut exec)?,
        OpcodeEncoding::In => exec.arch.set_a(ports.input(instr.imm8())),
        OpcodeEncoding::Out => ports.output(instr.imm8(), exec.arch.a()),
        OpcodeEncoding::Ei => exec.arch.set_interrupts_enabled(true),
        OpcodeEncoding::Di => exec.arch.set_interrupts_enabled(false),
        OpcodeEncoding::Hlt => exec.halt = true,
        OpcodeEncoding::Unimplemented => return Err(execute_unimplemented(&exec)),
    }

    Ok(exec)
}

/// Applies staged side effects to the core state.
///
/// Only called with an [`ExecuteState`] returned by a successful
/// [`execute_instruction`].
pub fn commit_execution(state: &mut CoreState, exec: &ExecuteState) {
    let flags = exec.flags_update.apply(exec.arch.flags());

    for (addr, value) in exec.memory_writes.iter().flatten() {
        // Addresses were validated when the write was staged.
        let _ = state.memory.write(*addr, *value);
    }

    state.arch = exec.arch;
    state.arch.set_flags(flags);
    state.arch.set_pc(exec.next_pc);
}

#[derive(Clone, Copy)]
enum Operand {
    /// Source register field (opcode bits 2..0).
    Field,
    /// Immediate byte.
    Imm,
}

fn execute_mov(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = exec.read_operand(instr.src(), memory)?;
    exec.write_operand(instr.dst(), value, memory)
}

fn execute_mvi(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    exec.write_operand(instr.dst(), instr.imm8(), memory)
}

fn execute_lda(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = exec.read(memory, instr.imm16())?;
    exec.arch.set_a(value);
    Ok(())
}

fn execute_sta(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let a = exec.arch.a();
    exec.stage_write(memory, instr.imm16(), a)
}

fn execute_lhld(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = exec.read_u16(memory, instr.imm16())?;
    exec.arch.set_pair(RegisterPair::Hl, value);
    Ok(())
}

fn execute_shld(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let hl = exec.arch.hl();
    exec.stage_write_u16(memory, instr.imm16(), hl)
}

fn execute_ldax(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = exec.read(memory, exec.arch.pair(instr.pair()))?;
    exec.arch.set_a(value);
    Ok(())
}

fn execute_stax(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let addr = exec.arch.pair(instr.pair());
    let a = exec.arch.a();
    exec.stage_write(memory, addr, a)
}

fn execute_xchg(exec: &mut ExecuteState) {
    let de = exec.arch.pair(RegisterPair::De);
    let hl = exec.arch.hl();
    exec.arch.set_pair(RegisterPair::De, hl);
    exec.arch.set_pair(RegisterPair::Hl, de);
}

fn execute_step_register(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
    op: fn(u8) -> AluOutput,
) -> Result<(), Fault> {
    let out = op(exec.read_operand(instr.dst(), memory)?);
    exec.write_operand(instr.dst(), out.value, memory)?;
    exec.flags_update = out.flags;
    Ok(())
}

fn execute_step_pair(instr: &DecodedInstruction, exec: &mut ExecuteState, op: fn(u16, u16) -> u16) {
    let pair = instr.pair();
    exec.arch.set_pair(pair, op(exec.arch.pair(pair), 1));
}

fn execute_alu(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
    op: AluOp,
    operand: Operand,
) -> Result<(), Fault> {
    let value = match operand {
        Operand::Field => exec.read_operand(instr.src(), memory)?,
        Operand::Imm => instr.imm8(),
    };
    let out = op.apply(exec.arch.a(), value, exec.arch.flag_is_set(FLAG_CARRY));
    if op.stores_result() {
        exec.arch.set_a(out.value);
    }
    exec.flags_update = out.flags;
    Ok(())
}

fn execute_dad(instr: &DecodedInstruction, exec: &mut ExecuteState) {
    let (sum, carry) = alu::dad(exec.arch.hl(), exec.arch.pair(instr.pair()));
    exec.arch.set_pair(RegisterPair::Hl, sum);
    exec.flags_update = FlagsUpdate::Carry(carry);
}

fn execute_daa(exec: &mut ExecuteState) {
    let out = alu::daa(
        exec.arch.a(),
        exec.arch.flag_is_set(FLAG_CARRY),
        exec.arch.flag_is_set(FLAG_AUX_CARRY),
    );
    exec.arch.set_a(out.value);
    exec.flags_update = out.flags;
}

fn execute_rotate(exec: &mut ExecuteState, kind: Rotate) {
    let (value, carry) = alu::rotate(exec.arch.a(), exec.arch.flag_is_set(FLAG_CARRY), kind);
    exec.arch.set_a(value);
    exec.flags_update = FlagsUpdate::Carry(carry);
}

fn execute_jump(instr: &DecodedInstruction, exec: &mut ExecuteState, condition: Option<Condition>) {
    if condition_holds(condition, &exec.arch) {
        exec.next_pc = instr.imm16();
    }
}

fn execute_call(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
    condition: Option<Condition>,
) -> Result<(), Fault> {
    if condition_holds(condition, &exec.arch) {
        let return_addr = exec.next_pc;
        exec.push_u16(memory, return_addr)?;
        exec.next_pc = instr.imm16();
    }
    Ok(())
}

fn execute_rst(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let return_addr = exec.next_pc;
    exec.push_u16(memory, return_addr)?;
    exec.next_pc = instr.restart_vector();
    Ok(())
}

fn execute_ret(
    memory: &Memory,
    exec: &mut ExecuteState,
    condition: Option<Condition>,
) -> Result<(), Fault> {
    if condition_holds(condition, &exec.arch) {
        exec.next_pc = exec.pop_u16(memory)?;
    }
    Ok(())
}

fn execute_push(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = match instr.stack_pair() {
        StackPair::Bc => exec.arch.pair(RegisterPair::Bc),
        StackPair::De => exec.arch.pair(RegisterPair::De),
        StackPair::Hl => exec.arch.hl(),
        StackPair::Psw => exec.arch.psw(),
    };
    exec.push_u16(memory, value)
}

fn execute_pop(
    instr: &DecodedInstruction,
    memory: &Memory,
    exec: &mut ExecuteState,
) -> Result<(), Fault> {
    let value = exec.pop_u16(memory)?;
    match instr.stack_pair() {
        StackPair::Bc => exec.arch.set_pair(RegisterPair::Bc, value),
        StackPair::De => exec.arch.set_pair(RegisterPair::De, value),
        StackPair::Hl => exec.arch.set_pair(RegisterPair::Hl, value),
        StackPair::Psw => exec.arch.set_psw(value),
    }
    Ok(())
}

fn execute_xthl(memory: &Memory, exec: &mut ExecuteState) -> Result<(), Fault> {
    let sp = exec.arch.sp();
    let top = exec.read_u16(memory, sp)?;
    let hl = exec.arch.hl();
    exec.stage_write_u16(memory, sp, hl)?;
    exec.arch.set_pair(RegisterPair::Hl, top);
    Ok(())
}

const fn execute_unimplemented(exec: &ExecuteState) -> Fault {
    Fault::unimplemented(exec.pc, exec.opcode)
}

/// Evaluates a branch condition; `None` is unconditional.
#[must_use]
pub const fn condition_holds(condition: Option<Condition>, arch: &ArchitecturalState) -> bool {
    match condition {
        None => true,
        Some(Condition::NotZero) => !arch.flag_is_set(FLAG_ZERO),
        Some(Condition::Zero) => arch.flag_is_set(FLAG_ZERO),
        Some(Condition::NoCarry) => !arch.flag_is_set(FLAG_CARRY),
        Some(Condition::Carry) => arch.flag_is_set(FLAG_CARRY),
        Some(Condition::ParityOdd) => !arch.flag_is_set(FLAG_PARITY),
        Some(Condition::ParityEven) => arch.flag_is_set(FLAG_PARITY),
        Some(Condition::Plus) => !arch.flag_is_set(FLAG_SIGN),
        Some(Condition::Minus) => arch.flag_is_set(FLAG_SIGN),
    }
}

/// Fetches, executes, and commits one instruction.
///
/// Terminal states return their outcome again without executing. Reaching
/// the end of the loaded program halts before any fetch.
pub fn step_one(
    state: &mut CoreState,
    ports: &mut dyn PortBus,
    trace_sink: &mut dyn TraceSink,
) -> StepOutcome {
    match state.run_state {
        RunState::Running => {}
        RunState::Halted(reason) => return StepOutcome::Halted(reason),
        RunState::FaultLatched(code) => {
            let fault = state.latched_fault.unwrap_or(Fault {
                code,
                pc: state.arch.pc(),
                opcode: None,
                address: None,
            });
            return StepOutcome::Fault(fault);
        }
    }

    let pc = state.arch.pc();
    if usize::from(pc) >= state.program_end {
        state.run_state = RunState::Halted(HaltReason::EndOfProgram);
        return StepOutcome::Halted(HaltReason::EndOfProgram);
    }

    let instruction = match Decoder::decode(state.memory.as_slice(), pc) {
        Ok(instr) => instr,
        Err(fault) => return latch_fault(state, fault, trace_sink),
    };
    trace_sink.on_event(TraceEvent::InstructionStart { pc, instruction });

    let exec = match execute_instruction(&instruction, state, ports) {
        Ok(exec) => exec,
        Err(fault) => return latch_fault(state, fault, trace_sink),
    };

    commit_execution(state, &exec);
    state.retired = state.retired.wrapping_add(1);
    trace_sink.on_event(TraceEvent::InstructionRetired {
        pc,
        next_pc: exec.next_pc,
    });

    if exec.halt {
        state.run_state = RunState::Halted(HaltReason::HaltInstruction);
        return StepOutcome::Halted(HaltReason::HaltInstruction);
    }

    StepOutcome::Retired {
        pc,
        next_pc: exec.next_pc,
    }
}

fn latch_fault(state: &mut CoreState, fault: Fault, trace_sink: &mut dyn TraceSink) -> StepOutcome {
    state.run_state = RunState::FaultLatched(fault.code);
    state.latched_fault = Some(fault);
    trace_sink.on_event(TraceEvent::FaultRaised { fault });
    StepOutcome::Fault(fault)
}

/// Steps until the core halts, faults, or retires `config.max_steps`
/// instructions.
pub fn run_until_halt(
    state: &mut CoreState,
    ports: &mut dyn PortBus,
    config: &CoreConfig,
    trace_sink: &mut dyn TraceSink,
) -> RunOutcome {
    let start = state.retired;
    debug!(pc = state.arch.pc(), program_end = state.program_end, "run started");

    let final_step = loop {
        let steps = state.retired.wrapping_sub(start);
        if config.max_steps.is_some_and(|limit| steps >= limit) && !state.is_terminal() {
            state.run_state = RunState::Halted(HaltReason::StepLimit);
        }

        match step_one(state, ports, trace_sink) {
            StepOutcome::Retired { pc, next_pc } => {
                trace!(pc, next_pc, "retired");
            }
            terminal => break terminal,
        }
    };

    let steps = state.retired.wrapping_sub(start);
    match final_step {
        StepOutcome::Fault(fault) => debug!(steps, %fault, "run faulted"),
        StepOutcome::Halted(reason) => debug!(steps, ?reason, "run halted"),
        StepOutcome::Retired { .. } => {}
    }

    RunOutcome { steps, final_step }
}
