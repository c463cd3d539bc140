#![no_main]

use i8080_core::{
    disassemble_one, run_until_halt, CoreConfig, CoreState, Decoder, NullPorts, NullTrace,
    StepOutcome,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First two bytes pick the memory size and initial SP; the rest is the program.
    let memory_size = usize::from(u16::from_le_bytes([data[0], data[1]])).max(data.len() - 2);
    let image = &data[2..];

    let _ = Decoder::decode(image, 0);
    let _ = disassemble_one(0, image);

    let config = CoreConfig {
        memory_size,
        initial_sp: u16::from_le_bytes([data[1], data[0]]),
        max_steps: Some(4096),
    };
    let Ok(mut state) = CoreState::with_config(&config) else {
        return;
    };
    if state.load_program(image).is_err() {
        return;
    }

    let outcome = run_until_halt(&mut state, &mut NullPorts, &config, &mut NullTrace);
    assert!(state.run_state.is_terminal());
    if let StepOutcome::Fault(fault) = outcome.final_step {
        assert_eq!(state.arch.pc(), fault.pc);
    }
});
