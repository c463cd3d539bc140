//! Instruction decoder for the 8080.
//!
//! Fetches the opcode at `PC`, resolves it through [`OPCODE_TABLE`], and
//! fetches the operand bytes the table entry calls for. Register, pair,
//! condition, and restart fields are extracted from the opcode bits on demand.
//!
//! [`OPCODE_TABLE`]: crate::encoding::OPCODE_TABLE

use crate::encoding::{lookup_opcode, OpcodeEncoding};
use crate::fault::Fault;
use crate::memory::read_u8;
use crate::state::{Register, RegisterPair};

/// 3-bit register field in an opcode. `M` is memory addressed by `HL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RegisterField {
    B,
    C,
    D,
    E,
    H,
    L,
    M,
    A,
}

impl RegisterField {
    /// Converts a 3-bit register field value into a register field.
    #[must_use]
    pub const fn from_u3(value: u8) -> Self {
        match value & 0x07 {
            0 => Self::B,
            1 => Self::C,
            2 => Self::D,
            3 => Self::E,
            4 => Self::H,
            5 => Self::L,
            6 => Self::M,
            _ => Self::A,
        }
    }

    /// The register this field names, or `None` for the memory operand.
    #[must_use]
    pub const fn register(self) -> Option<Register> {
        match self {
            Self::B => Some(Register::B),
            Self::C => Some(Register::C),
            Self::D => Some(Register::D),
            Self::E => Some(Register::E),
            Self::H => Some(Register::H),
            Self::L => Some(Register::L),
            Self::M => None,
            Self::A => Some(Register::A),
        }
    }

    /// Assembly name of the operand.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.register() {
            Some(reg) => reg.name(),
            None => "M",
        }
    }
}

/// 2-bit pair field used by `PUSH`/`POP`, where value 3 selects `PSW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StackPair {
    Bc,
    De,
    Hl,
    Psw,
}

/// 3-bit branch condition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Zero clear.
    NotZero,
    /// Zero set.
    Zero,
    /// Carry clear.
    NoCarry,
    /// Carry set.
    Carry,
    /// Parity clear (odd).
    ParityOdd,
    /// Parity set (even).
    ParityEven,
    /// Sign clear.
    Plus,
    /// Sign set.
    Minus,
}

impl Condition {
    /// Converts a 3-bit condition field value into a condition.
    #[must_use]
    pub const fn from_u3(value: u8) -> Self {
        match value & 0x07 {
            0 => Self::NotZero,
            1 => Self::Zero,
            2 => Self::NoCarry,
            3 => Self::Carry,
            4 => Self::ParityOdd,
            5 => Self::ParityEven,
            6 => Self::Plus,
            _ => Self::Minus,
        }
    }

    /// Assembly suffix of the condition.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::NotZero => "NZ",
            Self::Zero => "Z",
            Self::NoCarry => "NC",
            Self::Carry => "C",
            Self::ParityOdd => "PO",
            Self::ParityEven => "PE",
            Self::Plus => "P",
            Self::Minus => "M",
        }
    }
}

/// Decoded instruction: opcode, operand bytes, and the selected handler.
///
/// Built fresh for every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedInstruction {
    /// Raw opcode byte.
    pub opcode: u8,
    /// Instruction family selected by the dispatch table.
    pub encoding: OpcodeEncoding,
    /// Number of operand bytes (0, 1, or 2).
    pub operand_len: u8,
    /// Operand bytes in fetch order; unused bytes are zero.
    pub operands: [u8; 2],
}

impl DecodedInstruction {
    /// Total instruction length in bytes, opcode included.
    #[must_use]
    pub const fn len(&self) -> u16 {
        1 + self.operand_len as u16
    }

    /// Always `false`: every instruction has an opcode byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Destination register field (opcode bits 5..3).
    #[must_use]
    pub const fn dst(&self) -> RegisterField {
        RegisterField::from_u3(self.opcode >> 3)
    }

    /// Source register field (opcode bits 2..0).
    #[must_use]
    pub const fn src(&self) -> RegisterField {
        RegisterField::from_u3(self.opcode)
    }

    /// Register pair field (opcode bits 5..4), with value 3 selecting `SP`.
    #[must_use]
    pub const fn pair(&self) -> RegisterPair {
        match (self.opcode >> 4) & 0x03 {
            0 => RegisterPair::Bc,
            1 => RegisterPair::De,
            2 => RegisterPair::Hl,
            _ => RegisterPair::Sp,
        }
    }

    /// Stack pair field (opcode bits 5..4), with value 3 selecting `PSW`.
    #[must_use]
    pub const fn stack_pair(&self) -> StackPair {
        match (self.opcode >> 4) & 0x03 {
            0 => StackPair::Bc,
            1 => StackPair::De,
            2 => StackPair::Hl,
            _ => StackPair::Psw,
        }
    }

    /// Branch condition field (opcode bits 5..3).
    #[must_use]
    pub const fn condition(&self) -> Condition {
        Condition::from_u3(self.opcode >> 3)
    }

    /// Restart target address for `RST n` (`n * 8`).
    #[must_use]
    pub const fn restart_vector(&self) -> u16 {
        (self.opcode & 0x38) as u16
    }

    /// First operand byte.
    #[must_use]
    pub const fn imm8(&self) -> u8 {
        self.operands[0]
    }

    /// Little-endian 16-bit operand (low byte first).
    #[must_use]
    pub const fn imm16(&self) -> u16 {
        u16::from_le_bytes(self.operands)
    }
}

/// Stateless decoder front-end.
pub struct Decoder;

impl Decoder {
    /// Fetches and decodes the instruction at `pc`.
    ///
    /// Unimplemented opcodes decode successfully to
    /// [`OpcodeEncoding::Unimplemented`]; the fault is raised by its handler.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when the opcode or an operand byte
    /// lies outside `memory`.
    pub fn decode(memory: &[u8], pc: u16) -> Result<DecodedInstruction, Fault> {
        let opcode = read_u8(memory, pc).map_err(|_| Fault::out_of_bounds(pc, None, pc))?;
        let entry = lookup_opcode(opcode);

        let mut operands = [0_u8; 2];
        for (offset, slot) in (1_u16..).zip(operands.iter_mut().take(usize::from(entry.operand_len)))
        {
            let addr = pc.wrapping_add(offset);
            *slot = read_u8(memory, addr)
                .map_err(|_| Fault::out_of_bounds(pc, Some(opcode), addr))?;
        }

        Ok(DecodedInstruction {
            opcode,
            encoding: entry.encoding,
            operand_len: entry.operand_len,
            operands,
        })
    }
}
