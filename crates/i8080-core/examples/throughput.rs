//! Instruction throughput harness for i8080-core.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p i8080-core --release --example throughput
//! ```
//!
//! Each workload is a tight loop run on several threads, one core per thread,
//! with a step cap per run so the loop restarts from a fresh state.

#![allow(clippy::pedantic)]

use i8080_core::{run_until_halt, CoreConfig, CoreState, NullPorts, NullTrace};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const NUM_THREADS: usize = 4;
const STEPS_PER_RUN: u64 = 100_000;

/// 2 MHz 8080 averages roughly 500k instructions per second.
const REFERENCE_IPS: f64 = 500_000.0;

struct Workload {
    name: &'static str,
    program: &'static [u8],
}

const WORKLOADS: [Workload; 3] = [
    Workload {
        name: "nop_loop",
        // NOP ; NOP ; NOP ; JMP 0
        program: &[0x00, 0x00, 0x00, 0xC3, 0x00, 0x00],
    },
    Workload {
        name: "alu_loop",
        // ADD B ; SUB C ; ANA D ; XRA E ; ORA H ; CMP L ; JMP 0
        program: &[0x80, 0x91, 0xA2, 0xAB, 0xB4, 0xBD, 0xC3, 0x00, 0x00],
    },
    Workload {
        name: "memory_stack_loop",
        // LXI SP,0x8000 ; LXI H,0x4000 ; MOV M,A ; INR M ; PUSH H ; POP D ; CALL 0x0010 ; JMP 0x0006 ; RET
        program: &[
            0x31, 0x00, 0x80, 0x21, 0x00, 0x40, 0x77, 0x34, 0xE5, 0xD1, 0xCD, 0x10, 0x00, 0xC3,
            0x06, 0x00, 0xC9,
        ],
    },
];

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    instructions_per_second: f64,
    reference_multiple: f64,
}

fn benchmark(workload: &Workload, duration: Duration) -> BenchmarkResult {
    let (tx, rx) = mpsc::channel();
    let config = CoreConfig {
        max_steps: Some(STEPS_PER_RUN),
        ..CoreConfig::default()
    };

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let tx = tx.clone();
            let config = config.clone();
            let program = workload.program;
            thread::spawn(move || {
                let mut total_instructions = 0u64;
                let start = Instant::now();

                while start.elapsed() < duration {
                    let Ok(mut state) = CoreState::with_config(&config) else {
                        return;
                    };
                    if state.load_program(program).is_err() {
                        return;
                    }
                    let outcome =
                        run_until_halt(&mut state, &mut NullPorts, &config, &mut NullTrace);
                    total_instructions += outcome.steps;
                }

                tx.send(total_instructions).ok();
            })
        })
        .collect();

    for h in handles {
        h.join().ok();
    }
    drop(tx);

    let total_instructions: u64 = rx.iter().sum();
    let instructions_per_second = total_instructions as f64 / duration.as_secs_f64();

    BenchmarkResult {
        name: workload.name,
        instructions_per_second,
        reference_multiple: instructions_per_second / REFERENCE_IPS,
    }
}

fn main() {
    let duration = Duration::from_secs(2);

    println!("i8080-core throughput ({NUM_THREADS} threads, {duration:?} per workload)");
    println!("{:<20} {:>18} {:>14}", "workload", "instr/s", "x 2 MHz 8080");

    for workload in &WORKLOADS {
        let result = benchmark(workload, duration);
        println!(
            "{:<20} {:>18.0} {:>14.1}",
            result.name, result.instructions_per_second, result.reference_multiple
        );
    }
}
