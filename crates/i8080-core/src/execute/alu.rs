//! Pure 8-bit arithmetic and logic with flag derivation.
//!
//! Every result is computed with a wide intermediate where carries matter and
//! flags are derived from the truncated 8-bit value.

use super::flags::{result_flags, result_flags_preserving_carry, FlagsUpdate};

/// Result byte and the flag update the operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    /// Truncated 8-bit result.
    pub value: u8,
    /// Flags the instruction commits.
    pub flags: FlagsUpdate,
}

/// Accumulator operations sharing the register/memory/immediate operand forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// `ADD`/`ADI`.
    Add,
    /// `ADC`/`ACI`.
    Adc,
    /// `SUB`/`SUI`.
    Sub,
    /// `SBB`/`SBI`.
    Sbb,
    /// `ANA`/`ANI`.
    And,
    /// `XRA`/`XRI`.
    Xor,
    /// `ORA`/`ORI`.
    Or,
    /// `CMP`/`CPI`.
    Cmp,
}

impl AluOp {
    /// Computes `a op operand` given the current Carry flag.
    #[must_use]
    pub const fn apply(self, a: u8, operand: u8, carry: bool) -> AluOutput {
        match self {
            Self::Add => add(a, operand, false),
            Self::Adc => add(a, operand, carry),
            Self::Sub | Self::Cmp => sub(a, operand, false),
            Self::Sbb => sub(a, operand, carry),
            Self::And => and(a, operand),
            Self::Xor => xor(a, operand),
            Self::Or => or(a, operand),
        }
    }

    /// `CMP` discards the result and keeps only the flags.
    #[must_use]
    pub const fn stores_result(self) -> bool {
        !matches!(self, Self::Cmp)
    }
}

/// `a + b + carry_in`.
#[must_use]
pub const fn add(a: u8, b: u8, carry_in: bool) -> AluOutput {
    let cin = carry_in as u16;
    let wide = a as u16 + b as u16 + cin;
    let value = (wide & 0xFF) as u8;
    let aux_carry = (a as u16 & 0x0F) + (b as u16 & 0x0F) + cin > 0x0F;
    AluOutput {
        value,
        flags: result_flags(value, wide > 0xFF, aux_carry),
    }
}

/// `a - b - borrow_in`. Carry is set when a borrow occurs; auxiliary carry is
/// set on a borrow out of the low nibble.
#[must_use]
pub const fn sub(a: u8, b: u8, borrow_in: bool) -> AluOutput {
    let bin = borrow_in as u16;
    let subtrahend = b as u16 + bin;
    let value = a.wrapping_sub(b).wrapping_sub(borrow_in as u8);
    let borrow = (a as u16) < subtrahend;
    let aux_borrow = (a as u16 & 0x0F) < (b as u16 & 0x0F) + bin;
    AluOutput {
        value,
        flags: result_flags(value, borrow, aux_borrow),
    }
}

/// `a & b`. Carry is cleared; auxiliary carry takes bit 3 of `a | b`.
#[must_use]
pub const fn and(a: u8, b: u8) -> AluOutput {
    let value = a & b;
    AluOutput {
        value,
        flags: result_flags(value, false, ((a | b) & 0x08) != 0),
    }
}

/// `a ^ b`. Carry and auxiliary carry are cleared.
#[must_use]
pub const fn xor(a: u8, b: u8) -> AluOutput {
    let value = a ^ b;
    AluOutput {
        value,
        flags: result_flags(value, false, false),
    }
}

/// `a | b`. Carry and auxiliary carry are cleared.
#[must_use]
pub const fn or(a: u8, b: u8) -> AluOutput {
    let value = a | b;
    AluOutput {
        value,
        flags: result_flags(value, false, false),
    }
}

/// `INR`: increment without touching Carry.
#[must_use]
pub const fn inc(value: u8) -> AluOutput {
    let result = value.wrapping_add(1);
    AluOutput {
        value: result,
        flags: result_flags_preserving_carry(result, (value & 0x0F) == 0x0F),
    }
}

/// `DCR`: decrement without touching Carry.
#[must_use]
pub const fn dec(value: u8) -> AluOutput {
    let result = value.wrapping_sub(1);
    AluOutput {
        value: result,
        flags: result_flags_preserving_carry(result, (value & 0x0F) == 0x00),
    }
}

/// `DAA`: decimal-adjust the accumulator after a BCD addition.
#[must_use]
pub const fn daa(a: u8, carry: bool, aux_carry: bool) -> AluOutput {
    let low = a & 0x0F;
    let high = a >> 4;

    let mut correction = 0_u8;
    let mut carry_out = carry;
    if low > 9 || aux_carry {
        correction |= 0x06;
    }
    if high > 9 || carry || (high >= 9 && low > 9) {
        correction |= 0x60;
        carry_out = true;
    }

    let value = a.wrapping_add(correction);
    AluOutput {
        value,
        flags: result_flags(value, carry_out, low + (correction & 0x0F) > 0x0F),
    }
}

/// `DAD`: 16-bit add into `HL`; returns the sum and the carry out of bit 15.
#[must_use]
pub const fn dad(hl: u16, operand: u16) -> (u16, bool) {
    hl.overflowing_add(operand)
}

/// Accumulator rotate forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotate {
    /// `RLC`: bit 7 to Carry and bit 0.
    Left,
    /// `RRC`: bit 0 to Carry and bit 7.
    Right,
    /// `RAL`: bit 7 to Carry, old Carry to bit 0.
    LeftThroughCarry,
    /// `RAR`: bit 0 to Carry, old Carry to bit 7.
    RightThroughCarry,
}

/// Rotates `a` by one bit; returns the new accumulator and the new Carry.
#[must_use]
pub const fn rotate(a: u8, carry: bool, kind: Rotate) -> (u8, bool) {
    match kind {
        Rotate::Left => (a.rotate_left(1), (a & 0x80) != 0),
        Rotate::Right => (a.rotate_right(1), (a & 0x01) != 0),
        Rotate::LeftThroughCarry => ((a << 1) | carry as u8, (a & 0x80) != 0),
        Rotate::RightThroughCarry => ((a >> 1) | ((carry as u8) << 7), (a & 0x01) != 0),
    }
}
