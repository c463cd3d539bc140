/// Instruction families of the documented 8080 instruction set.
///
/// Register, pair, condition, and restart operands live in the opcode bits and
/// are extracted by the decoder; the encoding alone selects the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpcodeEncoding {
    Nop,
    Lxi,
    Stax,
    Inx,
    Inr,
    Dcr,
    Mvi,
    Rlc,
    Dad,
    Ldax,
    Dcx,
    Rrc,
    Ral,
    Rar,
    Shld,
    Daa,
    Lhld,
    Cma,
    Sta,
    Stc,
    Lda,
    Cmc,
    Mov,
    Hlt,
    Add,
    Adc,
    Sub,
    Sbb,
    Ana,
    Xra,
    Ora,
    Cmp,
    Rcc,
    Pop,
    Jcc,
    Jmp,
    Ccc,
    Push,
    Adi,
    Aci,
    Sui,
    Sbi,
    Ani,
    Xri,
    Ori,
    Cpi,
    Rst,
    Ret,
    Call,
    Out,
    In,
    Xthl,
    Pchl,
    Xchg,
    Di,
    Sphl,
    Ei,
    /// Opcode slot with no handler; dispatches to the fault handler.
    Unimplemented,
}

impl OpcodeEncoding {
    /// Number of operand bytes following the opcode byte.
    #[must_use]
    pub const fn operand_len(self) -> u8 {
        match self {
            Self::Mvi
            | Self::Adi
            | Self::Aci
            | Self::Sui
            | Self::Sbi
            | Self::Ani
            | Self::Xri
            | Self::Ori
            | Self::Cpi
            | Self::Out
            | Self::In => 1,
            Self::Lxi
            | Self::Shld
            | Self::Lhld
            | Self::Sta
            | Self::Lda
            | Self::Jcc
            | Self::Jmp
            | Self::Ccc
            | Self::Call => 2,
            _ => 0,
        }
    }

    /// Base assembly mnemonic. Conditional families report their prefix
    /// (`J`, `C`, `R`); the disassembler appends the condition.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Lxi => "LXI",
            Self::Stax => "STAX",
            Self::Inx => "INX",
            Self::Inr => "INR",
            Self::Dcr => "DCR",
            Self::Mvi => "MVI",
            Self::Rlc => "RLC",
            Self::Dad => "DAD",
            Self::Ldax => "LDAX",
            Self::Dcx => "DCX",
            Self::Rrc => "RRC",
            Self::Ral => "RAL",
            Self::Rar => "RAR",
            Self::Shld => "SHLD",
            Self::Daa => "DAA",
            Self::Lhld => "LHLD",
            Self::Cma => "CMA",
            Self::Sta => "STA",
            Self::Stc => "STC",
            Self::Lda => "LDA",
            Self::Cmc => "CMC",
            Self::Mov => "MOV",
            Self::Hlt => "HLT",
            Self::Add => "ADD",
            Self::Adc => "ADC",
            Self::Sub => "SUB",
            Self::Sbb => "SBB",
            Self::Ana => "ANA",
            Self::Xra => "XRA",
            Self::Ora => "ORA",
            Self::Cmp => "CMP",
            Self::Rcc => "R",
            Self::Pop => "POP",
            Self::Jcc => "J",
            Self::Jmp => "JMP",
            Self::Ccc => "C",
            Self::Push => "PUSH",
            Self::Adi => "ADI",
            Self::Aci => "ACI",
            Self::Sui => "SUI",
            Self::Sbi => "SBI",
            Self::Ani => "ANI",
            Self::Xri => "XRI",
            Self::Ori => "ORI",
            Self::Cpi => "CPI",
            Self::Rst => "RST",
            Self::Ret => "RET",
            Self::Call => "CALL",
            Self::Out => "OUT",
            Self::In => "IN",
            Self::Xthl => "XTHL",
            Self::Pchl => "PCHL",
            Self::Xchg => "XCHG",
            Self::Di => "DI",
            Self::Sphl => "SPHL",
            Self::Ei => "EI",
            Self::Unimplemented => ".byte",
        }
    }
}

/// Opcode slots left undefined by the documented instruction set.
pub const UNDOCUMENTED_OPCODES: [u8; 12] = [
    0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0xCB, 0xD9, 0xDD, 0xED, 0xFD,
];

/// Returns the instruction family for an opcode byte.
///
/// `None` means the slot is undocumented and has no handler.
#[must_use]
pub const fn classify_opcode(op: u8) -> Option<OpcodeEncoding> {
    use OpcodeEncoding as E;

    let encoding = match op {
        0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 | 0xCB | 0xD9 | 0xDD | 0xED | 0xFD => {
            return None
        }
        0x00 => E::Nop,
        0x02 | 0x12 => E::Stax,
        0x0A | 0x1A => E::Ldax,
        0x07 => E::Rlc,
        0x0F => E::Rrc,
        0x17 => E::Ral,
        0x1F => E::Rar,
        0x22 => E::Shld,
        0x27 => E::Daa,
        0x2A => E::Lhld,
        0x2F => E::Cma,
        0x32 => E::Sta,
        0x37 => E::Stc,
        0x3A => E::Lda,
        0x3F => E::Cmc,
        0x76 => E::Hlt,
        0x40..=0x7F => E::Mov,
        0x80..=0x87 => E::Add,
        0x88..=0x8F => E::Adc,
        0x90..=0x97 => E::Sub,
        0x98..=0x9F => E::Sbb,
        0xA0..=0xA7 => E::Ana,
        0xA8..=0xAF => E::Xra,
        0xB0..=0xB7 => E::Ora,
        0xB8..=0xBF => E::Cmp,
        0xC3 => E::Jmp,
        0xC6 => E::Adi,
        0xC9 => E::Ret,
        0xCD => E::Call,
        0xCE => E::Aci,
        0xD3 => E::Out,
        0xD6 => E::Sui,
        0xDB => E::In,
        0xDE => E::Sbi,
        0xE3 => E::Xthl,
        0xE6 => E::Ani,
        0xE9 => E::Pchl,
        0xEB => E::Xchg,
        0xEE => E::Xri,
        0xF3 => E::Di,
        0xF6 => E::Ori,
        0xF9 => E::Sphl,
        0xFB => E::Ei,
        0xFE => E::Cpi,
        x if x & 0xCF == 0x01 => E::Lxi,
        x if x & 0xCF == 0x03 => E::Inx,
        x if x & 0xCF == 0x09 => E::Dad,
        x if x & 0xCF == 0x0B => E::Dcx,
        x if x & 0xC7 == 0x04 => E::Inr,
        x if x & 0xC7 == 0x05 => E::Dcr,
        x if x & 0xC7 == 0x06 => E::Mvi,
        x if x & 0xC7 == 0xC0 => E::Rcc,
        x if x & 0xCF == 0xC1 => E::Pop,
        x if x & 0xC7 == 0xC2 => E::Jcc,
        x if x & 0xC7 == 0xC4 => E::Ccc,
        x if x & 0xCF == 0xC5 => E::Push,
        x if x & 0xC7 == 0xC7 => E::Rst,
        _ => return None,
    };
    Some(encoding)
}

/// One dispatch-table slot: handler selector and operand length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeEntry {
    /// Instruction family; selects the handler.
    pub encoding: OpcodeEncoding,
    /// Number of operand bytes following the opcode byte.
    pub operand_len: u8,
}

impl OpcodeEntry {
    /// Entry used for every slot without a handler.
    pub const UNIMPLEMENTED: Self = Self {
        encoding: OpcodeEncoding::Unimplemented,
        operand_len: 0,
    };

    /// Returns `true` when this slot has a real handler.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        !matches!(self.encoding, OpcodeEncoding::Unimplemented)
    }
}

/// Single source-of-truth dispatch table indexed by opcode byte.
pub const OPCODE_TABLE: [OpcodeEntry; 256] = build_opcode_table();

#[allow(clippy::cast_possible_truncation)]
const fn build_opcode_table() -> [OpcodeEntry; 256] {
    let mut table = [OpcodeEntry::UNIMPLEMENTED; 256];
    let mut index = 0;
    while index < table.len() {
        if let Some(encoding) = classify_opcode(index as u8) {
            table[index] = OpcodeEntry {
                encoding,
                operand_len: encoding.operand_len(),
            };
        }
        index += 1;
    }
    table
}

/// Returns the dispatch-table entry for `opcode`.
#[must_use]
pub const fn lookup_opcode(opcode: u8) -> OpcodeEntry {
    OPCODE_TABLE[opcode as usize]
}
