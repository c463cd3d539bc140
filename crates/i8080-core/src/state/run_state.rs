use crate::FaultCode;

/// Why the run loop stopped without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum HaltReason {
    /// `PC` reached or passed the end of the loaded program.
    EndOfProgram,
    /// `HLT` retired.
    HaltInstruction,
    /// The configured step limit was reached.
    StepLimit,
}

/// Execution-state machine for host-observable core control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to fetch the next instruction.
    #[default]
    Running,
    /// Stopped normally; no further instructions execute.
    Halted(HaltReason),
    /// Fault is latched and no further progress is possible.
    FaultLatched(FaultCode),
}

impl RunState {
    /// Returns `true` for the two terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}
