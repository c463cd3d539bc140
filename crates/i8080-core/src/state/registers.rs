/// Number of architecturally visible 8-bit registers (`B C D E H L A`).
pub const REGISTER_COUNT: usize = 7;

/// `FLAGS` bit for carry/borrow out of bit 7.
pub const FLAG_CARRY: u8 = 1 << 0;
/// `FLAGS` bit that always reads as one in the packed PSW byte.
pub const FLAG_FIXED_ONE: u8 = 1 << 1;
/// `FLAGS` bit for even parity of the result.
pub const FLAG_PARITY: u8 = 1 << 2;
/// `FLAGS` bit for carry/borrow out of bit 3.
pub const FLAG_AUX_CARRY: u8 = 1 << 4;
/// `FLAGS` bit for zero result.
pub const FLAG_ZERO: u8 = 1 << 6;
/// `FLAGS` bit for bit 7 of the result.
pub const FLAG_SIGN: u8 = 1 << 7;
/// Mask of the five condition flags (`S Z AC P CY`).
pub const FLAGS_ACTIVE_MASK: u8 = FLAG_SIGN | FLAG_ZERO | FLAG_AUX_CARRY | FLAG_PARITY | FLAG_CARRY;

/// Architecturally visible 8-bit register.
///
/// Discriminants follow the 3-bit register field encoding; field value 6
/// addresses memory at `HL` and has no register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    A = 7,
}

impl Register {
    /// Ordered list of all registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::H,
        Self::L,
        Self::A,
    ];

    /// Returns the storage index for this register (`0..=6`).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 6,
            other => other as usize,
        }
    }

    /// Assembly name of the register.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::H => "H",
            Self::L => "L",
            Self::A => "A",
        }
    }
}

/// 16-bit register pair. The first register of a pair holds the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RegisterPair {
    Bc,
    De,
    Hl,
    Sp,
}

impl RegisterPair {
    /// High and low registers backing this pair, `None` for `SP`.
    #[must_use]
    pub const fn registers(self) -> Option<(Register, Register)> {
        match self {
            Self::Bc => Some((Register::B, Register::C)),
            Self::De => Some((Register::D, Register::E)),
            Self::Hl => Some((Register::H, Register::L)),
            Self::Sp => None,
        }
    }
}

/// Full architectural register state for the 8080 core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    regs: [u8; REGISTER_COUNT],
    pc: u16,
    sp: u16,
    flags: u8,
    interrupts_enabled: bool,
}

impl Default for ArchitecturalState {
    fn default() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            pc: 0,
            sp: 0,
            flags: 0,
            interrupts_enabled: false,
        }
    }
}

impl ArchitecturalState {
    /// Reads an 8-bit register.
    #[must_use]
    pub const fn reg(&self, reg: Register) -> u8 {
        self.regs[reg.index()]
    }

    /// Writes an 8-bit register.
    pub const fn set_reg(&mut self, reg: Register, value: u8) {
        self.regs[reg.index()] = value;
    }

    /// Reads the accumulator.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.reg(Register::A)
    }

    /// Writes the accumulator.
    pub const fn set_a(&mut self, value: u8) {
        self.set_reg(Register::A, value);
    }

    /// Reads a register pair (high register first) or `SP`.
    #[must_use]
    pub const fn pair(&self, pair: RegisterPair) -> u16 {
        match pair.registers() {
            Some((hi, lo)) => u16::from_be_bytes([self.reg(hi), self.reg(lo)]),
            None => self.sp,
        }
    }

    /// Writes a register pair (high register first) or `SP`.
    pub const fn set_pair(&mut self, pair: RegisterPair, value: u16) {
        match pair.registers() {
            Some((hi, lo)) => {
                let [high, low] = value.to_be_bytes();
                self.set_reg(hi, high);
                self.set_reg(lo, low);
            }
            None => self.sp = value,
        }
    }

    /// Reads the `HL` pair used for memory operands.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        self.pair(RegisterPair::Hl)
    }

    /// Reads the `PC` register.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the `PC` register.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Reads the `SP` register.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.sp
    }

    /// Writes the `SP` register.
    pub const fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    /// Reads the five active condition flags in PSW bit positions.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Writes the condition flags; bits outside [`FLAGS_ACTIVE_MASK`] are dropped.
    pub const fn set_flags(&mut self, value: u8) {
        self.flags = value & FLAGS_ACTIVE_MASK;
    }

    /// Returns `true` when a specific flag bit is set.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }

    /// Sets or clears a specific active flag bit.
    pub const fn set_flag(&mut self, flag: u8, enabled: bool) {
        if enabled {
            self.flags |= flag & FLAGS_ACTIVE_MASK;
        } else {
            self.flags &= !(flag & FLAGS_ACTIVE_MASK);
        }
    }

    /// Packs the flags into the PSW low byte: `S Z 0 AC 0 P 1 CY`.
    #[must_use]
    pub const fn packed_flags(&self) -> u8 {
        self.flags | FLAG_FIXED_ONE
    }

    /// Restores flags from a PSW low byte, ignoring the fixed bits.
    pub const fn unpack_flags(&mut self, packed: u8) {
        self.set_flags(packed);
    }

    /// Reads the processor status word: accumulator high, packed flags low.
    #[must_use]
    pub const fn psw(&self) -> u16 {
        u16::from_be_bytes([self.a(), self.packed_flags()])
    }

    /// Restores accumulator and flags from a processor status word.
    pub const fn set_psw(&mut self, value: u16) {
        let [a, packed] = value.to_be_bytes();
        self.set_a(a);
        self.unpack_flags(packed);
    }

    /// Reads the interrupt-enable latch.
    #[must_use]
    pub const fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// Writes the interrupt-enable latch.
    pub const fn set_interrupts_enabled(&mut self, enabled: bool) {
        self.interrupts_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ArchitecturalState, Register, RegisterPair, FLAGS_ACTIVE_MASK, FLAG_AUX_CARRY,
        FLAG_CARRY, FLAG_FIXED_ONE, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO, REGISTER_COUNT,
    };

    #[test]
    fn register_file_tracks_each_register_independently() {
        let mut state = ArchitecturalState::default();

        for (offset, reg) in (0_u8..).zip(Register::ALL.iter().copied()) {
            state.set_reg(reg, 0x10 + offset);
        }

        for (offset, reg) in (0_u8..).zip(Register::ALL.iter().copied()) {
            assert_eq!(state.reg(reg), 0x10 + offset);
        }
        assert_eq!(Register::ALL.len(), REGISTER_COUNT);
    }

    #[test]
    fn pairs_combine_high_then_low_register() {
        let mut state = ArchitecturalState::default();
        state.set_reg(Register::B, 0x12);
        state.set_reg(Register::C, 0x34);
        assert_eq!(state.pair(RegisterPair::Bc), 0x1234);

        state.set_pair(RegisterPair::De, 0xBEEF);
        assert_eq!(state.reg(Register::D), 0xBE);
        assert_eq!(state.reg(Register::E), 0xEF);

        state.set_pair(RegisterPair::Hl, 0x2000);
        assert_eq!(state.hl(), 0x2000);

        state.set_pair(RegisterPair::Sp, 0xFFF0);
        assert_eq!(state.sp(), 0xFFF0);
        assert_eq!(state.pair(RegisterPair::Sp), 0xFFF0);
    }

    #[test]
    fn flags_only_store_active_bits() {
        let mut state = ArchitecturalState::default();
        state.set_flags(u8::MAX);

        assert_eq!(state.flags(), FLAGS_ACTIVE_MASK);
    }

    #[test]
    fn flags_individual_bits_can_be_set_and_cleared() {
        let mut state = ArchitecturalState::default();
        let all = [FLAG_ZERO, FLAG_SIGN, FLAG_PARITY, FLAG_CARRY, FLAG_AUX_CARRY];

        for flag in all {
            state.set_flag(flag, true);
            assert!(state.flag_is_set(flag));
        }

        for flag in all {
            state.set_flag(flag, false);
            assert!(!state.flag_is_set(flag));
        }

        assert_eq!(state.flags(), 0);
    }

    #[test]
    fn packed_flags_follow_psw_layout() {
        let mut state = ArchitecturalState::default();
        assert_eq!(state.packed_flags(), 0b0000_0010);

        state.set_flag(FLAG_SIGN, true);
        state.set_flag(FLAG_CARRY, true);
        assert_eq!(state.packed_flags(), 0b1000_0011);

        state.unpack_flags(0xFF);
        assert_eq!(state.flags(), FLAGS_ACTIVE_MASK);
        assert_eq!(state.packed_flags(), 0b1101_0111);
        assert_eq!(state.packed_flags() & FLAG_FIXED_ONE, FLAG_FIXED_ONE);
    }

    #[test]
    fn psw_packs_accumulator_high_and_flags_low() {
        let mut state = ArchitecturalState::default();
        state.set_a(0x5A);
        state.set_flag(FLAG_ZERO, true);
        assert_eq!(state.psw(), 0x5A42);

        let mut restored = ArchitecturalState::default();
        restored.set_psw(state.psw());
        assert_eq!(restored.a(), 0x5A);
        assert_eq!(restored.flags(), state.flags());
    }
}
