//! Command-line runner for raw 8080 program images.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use i8080_core::{
    disassemble_decoded, disassemble_range, run_until_halt, CoreConfig, CoreState, NullPorts,
    NullTrace, RunOutcome, StepOutcome, TraceEvent, TraceSink, ADDRESS_SPACE_BYTES,
};
use tracing::{debug, error, info, warn, Level};

const EXIT_OK: u8 = 0;
const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_FAULT: u8 = 2;

fn parse_u16_addr(s: &str) -> Result<u16, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u16::from_str_radix(hex, 16).map_err(|e| format!("invalid hex address '{s}': {e}"))
    } else {
        trimmed
            .parse::<u16>()
            .map_err(|e| format!("invalid address '{s}': {e}"))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Intel 8080 program runner", long_about = None)]
struct Cli {
    /// Raw binary program image, loaded at address 0x0000
    program: PathBuf,

    /// Log every executed instruction (address, bytes, disassembly)
    #[arg(short, long)]
    trace: bool,

    /// Stop after this many retired instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the final processor state as JSON on stdout
    #[arg(long)]
    dump_state: bool,

    /// Memory size in bytes (1..=65536)
    #[arg(long, default_value_t = ADDRESS_SPACE_BYTES)]
    memory_size: usize,

    /// Initial stack pointer (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x0000", value_parser = parse_u16_addr)]
    initial_sp: u16,

    /// Print a disassembly listing of the program instead of running it
    #[arg(long)]
    disassemble: bool,
}

/// Logs each instruction as it starts executing.
struct LogTrace;

impl TraceSink for LogTrace {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionStart { pc, instruction } => {
                debug!("{}", disassemble_decoded(pc, &instruction));
            }
            TraceEvent::FaultRaised { fault } => debug!(code = fault.code.as_u8(), "fault raised"),
            TraceEvent::InstructionRetired { .. } => {}
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = CoreConfig {
        memory_size: cli.memory_size,
        initial_sp: cli.initial_sp,
        max_steps: cli.max_steps,
    };

    let mut state = match load(&cli.program, &config) {
        Ok(state) => state,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(EXIT_LOAD_FAILURE);
        }
    };

    if cli.disassemble {
        print_listing(&state.memory.as_slice()[..state.program_end]);
        return ExitCode::from(EXIT_OK);
    }

    let outcome = if cli.trace {
        run_until_halt(&mut state, &mut NullPorts, &config, &mut LogTrace)
    } else {
        run_until_halt(&mut state, &mut NullPorts, &config, &mut NullTrace)
    };

    if cli.dump_state {
        if let Err(e) = dump_state(&state, &outcome) {
            error!("failed to write state dump: {e:#}");
        }
    }

    report(&outcome)
}

fn load(path: &Path, config: &CoreConfig) -> Result<CoreState> {
    let image =
        fs::read(path).with_context(|| format!("failed to read program {}", path.display()))?;
    let mut state = CoreState::with_config(config).context("invalid memory configuration")?;
    state
        .load_program(&image)
        .with_context(|| format!("failed to load program {}", path.display()))?;

    info!(program = %path.display(), bytes = image.len(), "starting");
    Ok(state)
}

fn print_listing(image: &[u8]) {
    let rows = disassemble_range(0x0000, image.len(), image);
    for row in &rows {
        println!("{row}");
    }

    let listed: usize = rows.iter().map(|row| row.bytes.len()).sum();
    if listed < image.len() {
        warn!(offset = listed, "trailing bytes do not form a complete instruction");
    }
}

fn report(outcome: &RunOutcome) -> ExitCode {
    match outcome.final_step {
        StepOutcome::Halted(reason) => {
            info!(steps = outcome.steps, ?reason, "halted");
            ExitCode::from(EXIT_OK)
        }
        StepOutcome::Fault(fault) => {
            error!(steps = outcome.steps, "{fault}");
            ExitCode::from(EXIT_FAULT)
        }
        StepOutcome::Retired { .. } => ExitCode::from(EXIT_OK),
    }
}

fn dump_state(state: &CoreState, outcome: &RunOutcome) -> Result<()> {
    let dump = serde_json::json!({
        "registers": state.arch,
        "run_state": state.run_state,
        "fault": state.latched_fault,
        "steps": outcome.steps,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
