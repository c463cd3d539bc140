//! Architectural CPU state model primitives.

/// Architectural register file and condition-flag storage.
pub mod registers;
/// Run-loop state machine.
pub mod run_state;

pub use registers::{
    ArchitecturalState, Register, RegisterPair, FLAGS_ACTIVE_MASK, FLAG_AUX_CARRY, FLAG_CARRY,
    FLAG_FIXED_ONE, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO, REGISTER_COUNT,
};
pub use run_state::{HaltReason, RunState};
