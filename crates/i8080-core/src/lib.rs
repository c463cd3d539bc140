//! Intel 8080 instruction execution engine.
//!
//! The core owns a flat memory image and the architectural register state,
//! decodes one opcode at a time through a 256-entry dispatch table, and
//! commits each instruction's effects only after it completes.

/// Flat bounded memory and program loading.
pub mod memory;
pub use memory::{
    read_u16_le, read_u8, validate_address, write_u16_le, LoadError, Memory, MemoryConfigError,
    ADDRESS_SPACE_BYTES, WORD_ACCESS_BYTES,
};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    CoreConfig, CoreState, NullPorts, NullTrace, PortBus, RunOutcome, StepOutcome, TraceEvent,
    TraceSink, FLOATING_BUS_VALUE,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    ArchitecturalState, HaltReason, Register, RegisterPair, RunState, FLAGS_ACTIVE_MASK,
    FLAG_AUX_CARRY, FLAG_CARRY, FLAG_FIXED_ONE, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO, REGISTER_COUNT,
};

/// Opcode classification and the 256-entry dispatch table.
pub mod encoding;
pub use encoding::{
    classify_opcode, lookup_opcode, OpcodeEncoding, OpcodeEntry, OPCODE_TABLE,
    UNDOCUMENTED_OPCODES,
};

/// Instruction fetch and field extraction.
pub mod decoder;
pub use decoder::{Condition, DecodedInstruction, Decoder, RegisterField, StackPair};

/// Fault taxonomy raised by decode and execute.
pub mod fault;
pub use fault::{Fault, FaultCode};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{
    commit_execution, condition_holds, execute_instruction, run_until_halt, step_one,
    ExecuteState, FlagsUpdate,
};

/// Intel-syntax disassembly for traces and listings.
pub mod disasm;
pub use disasm::{disassemble_decoded, disassemble_one, disassemble_range, DisassemblyRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
