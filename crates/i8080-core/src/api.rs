//! Public host-facing API for embedding the 8080 core.

use crate::decoder::DecodedInstruction;
use crate::fault::Fault;
use crate::memory::{LoadError, Memory, MemoryConfigError, ADDRESS_SPACE_BYTES};
use crate::state::{ArchitecturalState, HaltReason, RunState};

/// Value [`NullPorts`] returns for every `IN`.
pub const FLOATING_BUS_VALUE: u8 = 0xFF;

/// Top-level immutable configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Memory size in bytes (`1..=65536`).
    pub memory_size: usize,
    /// Stack pointer value at power-on.
    pub initial_sp: u16,
    /// Optional cap on retired instructions per [`run_until_halt`] call.
    ///
    /// [`run_until_halt`]: crate::run_until_halt
    pub max_steps: Option<u64>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_size: ADDRESS_SPACE_BYTES,
            initial_sp: 0x0000,
            max_steps: None,
        }
    }
}

/// Complete host-visible core state threaded through the stepping APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreState {
    /// Architectural register file, flags, and interrupt latch.
    pub arch: ArchitecturalState,
    /// Program and data memory.
    pub memory: Memory,
    /// One past the last byte of the loaded program; fetching here halts.
    pub program_end: usize,
    /// Current execution state.
    pub run_state: RunState,
    /// Full context of the latched fault, when present.
    pub latched_fault: Option<Fault>,
    /// Instructions retired since creation.
    pub retired: u64,
}

impl Default for CoreState {
    fn default() -> Self {
        Self {
            arch: ArchitecturalState::default(),
            memory: Memory::default(),
            program_end: 0,
            run_state: RunState::Running,
            latched_fault: None,
            retired: 0,
        }
    }
}

impl CoreState {
    /// Creates a core with zeroed memory of the configured size.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryConfigError`] when `config.memory_size` is invalid.
    pub fn with_config(config: &CoreConfig) -> Result<Self, MemoryConfigError> {
        let mut arch = ArchitecturalState::default();
        arch.set_sp(config.initial_sp);

        Ok(Self {
            arch,
            memory: Memory::new(config.memory_size)?,
            program_end: 0,
            run_state: RunState::Running,
            latched_fault: None,
            retired: 0,
        })
    }

    /// Copies a raw program image to address 0 and marks its end.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ImageTooLarge`] when the image does not fit; the
    /// state is unchanged in that case.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), LoadError> {
        self.memory.load(0x0000, image)?;
        self.program_end = image.len();
        Ok(())
    }

    /// Returns `true` once the core is halted or fault-latched.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.run_state.is_terminal()
    }
}

/// Host transport for the `IN` and `OUT` instructions.
pub trait PortBus {
    /// Reads one byte from an input port.
    fn input(&mut self, port: u8) -> u8;

    /// Writes one byte to an output port.
    fn output(&mut self, port: u8, value: u8);
}

/// Port bus with nothing attached: inputs float high, outputs are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPorts;

impl PortBus for NullPorts {
    fn input(&mut self, _port: u8) -> u8 {
        FLOATING_BUS_VALUE
    }

    fn output(&mut self, _port: u8, _value: u8) {}
}

/// Output status from one instruction retirement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired and the core keeps running.
    Retired {
        /// Address of the retired instruction.
        pc: u16,
        /// Address of the next instruction.
        next_pc: u16,
    },
    /// Core stopped normally.
    Halted(HaltReason),
    /// Fault was raised during fetch, decode, or execute.
    Fault(Fault),
}

/// Aggregated outcome from running until a terminal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Number of instructions retired during this run call.
    pub steps: u64,
    /// Last step-level status observed before returning.
    pub final_step: StepOutcome,
}

impl RunOutcome {
    /// The fault that ended the run, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<Fault> {
        match self.final_step {
            StepOutcome::Fault(fault) => Some(fault),
            StepOutcome::Retired { .. } | StepOutcome::Halted(_) => None,
        }
    }
}

/// Trace events emitted at instruction boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Instruction fetched and decoded, before it executes.
    InstructionStart {
        /// Program counter used for this fetch.
        pc: u16,
        /// Decoded instruction about to execute.
        instruction: DecodedInstruction,
    },
    /// Instruction committed.
    InstructionRetired {
        /// Program counter of the retired instruction.
        pc: u16,
        /// Program counter after commit.
        next_pc: u16,
    },
    /// Fault raised; nothing from the faulting instruction was committed.
    FaultRaised {
        /// Raised fault with its context.
        fault: Fault,
    },
}

/// Sink trait for per-instruction trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Trace sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CoreConfig, CoreState, NullPorts, NullTrace, PortBus, RunOutcome, StepOutcome, TraceEvent,
        TraceSink, FLOATING_BUS_VALUE,
    };
    use crate::fault::Fault;
    use crate::memory::{LoadError, MemoryConfigError, ADDRESS_SPACE_BYTES};
    use crate::state::{HaltReason, RunState};

    #[test]
    fn default_core_config_covers_full_address_space() {
        let config = CoreConfig::default();

        assert_eq!(config.memory_size, ADDRESS_SPACE_BYTES);
        assert_eq!(config.initial_sp, 0x0000);
        assert_eq!(config.max_steps, None);
    }

    #[test]
    fn with_config_applies_memory_size_and_stack_pointer() {
        let config = CoreConfig {
            memory_size: 0x100,
            initial_sp: 0x0100,
            ..CoreConfig::default()
        };
        let state = CoreState::with_config(&config).expect("valid config");

        assert_eq!(state.memory.len(), 0x100);
        assert_eq!(state.arch.sp(), 0x0100);
        assert_eq!(state.arch.pc(), 0x0000);
        assert_eq!(state.run_state, RunState::Running);
        assert!(!state.is_terminal());
    }

    #[test]
    fn with_config_rejects_oversized_memory() {
        let config = CoreConfig {
            memory_size: ADDRESS_SPACE_BYTES + 1,
            ..CoreConfig::default()
        };

        assert_eq!(
            CoreState::with_config(&config),
            Err(MemoryConfigError::InvalidSize(ADDRESS_SPACE_BYTES + 1))
        );
    }

    #[test]
    fn load_program_sets_program_end() {
        let mut state = CoreState::default();
        state.load_program(&[0x3E, 0x42, 0x76]).expect("image fits");

        assert_eq!(state.program_end, 3);
        assert_eq!(state.memory.as_slice()[..3], [0x3E, 0x42, 0x76]);
    }

    #[test]
    fn failed_load_leaves_state_untouched() {
        let config = CoreConfig {
            memory_size: 4,
            ..CoreConfig::default()
        };
        let mut state = CoreState::with_config(&config).expect("valid config");
        let before = state.clone();

        let err = state.load_program(&[0; 5]).expect_err("image too large");
        assert!(matches!(err, LoadError::ImageTooLarge { len: 5, .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn null_ports_float_high() {
        let mut ports = NullPorts;
        ports.output(0x10, 0xAA);
        assert_eq!(ports.input(0x10), FLOATING_BUS_VALUE);
    }

    #[test]
    fn vec_sink_records_events_in_order() {
        let mut sink = Vec::new();
        sink.on_event(TraceEvent::InstructionRetired { pc: 0, next_pc: 1 });
        sink.on_event(TraceEvent::InstructionRetired { pc: 1, next_pc: 2 });
        NullTrace.on_event(TraceEvent::InstructionRetired { pc: 2, next_pc: 3 });

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink[1],
            TraceEvent::InstructionRetired { pc: 1, next_pc: 2 }
        );
    }

    #[test]
    fn run_outcome_exposes_terminal_fault() {
        let fault = Fault::unimplemented(0x0010, 0xDD);
        let faulted = RunOutcome {
            steps: 4,
            final_step: StepOutcome::Fault(fault),
        };
        let halted = RunOutcome {
            steps: 4,
            final_step: StepOutcome::Halted(HaltReason::HaltInstruction),
        };

        assert_eq!(faulted.fault(), Some(fault));
        assert_eq!(halted.fault(), None);
    }
}
