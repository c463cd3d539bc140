//! Instruction disassembly for the 8080.
//!
//! Converts raw instruction bytes into Intel assembly syntax for traces and
//! listings.

use std::fmt;

use crate::decoder::{DecodedInstruction, Decoder, StackPair};
use crate::encoding::{lookup_opcode, OpcodeEncoding};
use crate::state::RegisterPair;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// The starting address of this instruction.
    pub addr_start: u16,
    /// Instruction bytes, opcode first (1 to 3 bytes).
    pub bytes: Vec<u8>,
    /// The instruction mnemonic (e.g. "MOV", "JNZ", "RST").
    pub mnemonic: String,
    /// The formatted operands (e.g. "A,B" or "0x1234"); empty when none.
    pub operands: String,
    /// Whether the opcode is outside the documented instruction set.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Length in bytes.
    #[must_use]
    pub fn len_bytes(&self) -> u16 {
        u16::try_from(self.bytes.len()).unwrap_or(u16::MAX)
    }

    /// Assembly text without address or raw bytes (e.g. `MVI M,0x12`).
    #[must_use]
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        write!(f, "{:04X}  {:<8}  {}", self.addr_start, raw.join(" "), self.text())
    }
}

/// Disassembles the instruction at `pc`.
///
/// Returns `None` if the opcode or an operand byte lies outside `memory`.
#[must_use]
pub fn disassemble_one(pc: u16, memory: &[u8]) -> Option<DisassemblyRow> {
    let instr = Decoder::decode(memory, pc).ok()?;
    Some(disassemble_decoded(pc, &instr))
}

/// Formats an already decoded instruction fetched from `pc`.
#[must_use]
pub fn disassemble_decoded(pc: u16, instr: &DecodedInstruction) -> DisassemblyRow {
    let mut bytes = vec![instr.opcode];
    bytes.extend_from_slice(&instr.operands[..usize::from(instr.operand_len)]);

    DisassemblyRow {
        addr_start: pc,
        bytes,
        mnemonic: format_mnemonic(instr),
        operands: format_operands(instr),
        is_illegal: !lookup_opcode(instr.opcode).is_implemented(),
    }
}

/// Disassembles up to `count` consecutive instructions starting at `start`.
///
/// Stops early at the first instruction that runs past `memory`.
#[must_use]
pub fn disassemble_range(start: u16, count: usize, memory: &[u8]) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut pc = start;

    for _ in 0..count {
        let Some(row) = disassemble_one(pc, memory) else {
            break;
        };
        pc = pc.wrapping_add(row.len_bytes());
        rows.push(row);
    }

    rows
}

fn format_mnemonic(instr: &DecodedInstruction) -> String {
    let base = instr.encoding.mnemonic();
    match instr.encoding {
        OpcodeEncoding::Jcc | OpcodeEncoding::Ccc | OpcodeEncoding::Rcc => {
            format!("{base}{}", instr.condition().suffix())
        }
        _ => base.to_string(),
    }
}

fn format_operands(instr: &DecodedInstruction) -> String {
    use OpcodeEncoding as E;

    match instr.encoding {
        E::Mov => format!("{},{}", instr.dst().name(), instr.src().name()),
        E::Mvi => format!("{},0x{:02X}", instr.dst().name(), instr.imm8()),
        E::Inr | E::Dcr => instr.dst().name().to_string(),
        E::Add | E::Adc | E::Sub | E::Sbb | E::Ana | E::Xra | E::Ora | E::Cmp => {
            instr.src().name().to_string()
        }
        E::Lxi => format!("{},0x{:04X}", format_pair(instr.pair()), instr.imm16()),
        E::Inx | E::Dcx | E::Dad | E::Ldax | E::Stax => format_pair(instr.pair()).to_string(),
        E::Push | E::Pop => format_stack_pair(instr.stack_pair()).to_string(),
        E::Adi | E::Aci | E::Sui | E::Sbi | E::Ani | E::Xri | E::Ori | E::Cpi | E::In | E::Out => {
            format!("0x{:02X}", instr.imm8())
        }
        E::Shld | E::Lhld | E::Sta | E::Lda | E::Jmp | E::Jcc | E::Call | E::Ccc => {
            format!("0x{:04X}", instr.imm16())
        }
        E::Rst => (instr.restart_vector() / 8).to_string(),
        E::Unimplemented => format!("0x{:02X}", instr.opcode),
        _ => String::new(),
    }
}

const fn format_pair(pair: RegisterPair) -> &'static str {
    match pair {
        RegisterPair::Bc => "B",
        RegisterPair::De => "D",
        RegisterPair::Hl => "H",
        RegisterPair::Sp => "SP",
    }
}

const fn format_stack_pair(pair: StackPair) -> &'static str {
    match pair {
        StackPair::Bc => "B",
        StackPair::De => "D",
        StackPair::Hl => "H",
        StackPair::Psw => "PSW",
    }
}
