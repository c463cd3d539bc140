//! FLAGS update behaviors for different instruction classes.

use crate::state::{FLAG_AUX_CARRY, FLAG_CARRY, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO};

/// Describes how FLAGS should be updated after an instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// No change to FLAGS.
    #[default]
    None,
    /// Update all five flags.
    All {
        /// Zero flag.
        zero: bool,
        /// Sign flag.
        sign: bool,
        /// Parity flag.
        parity: bool,
        /// Carry flag.
        carry: bool,
        /// Auxiliary carry flag.
        aux_carry: bool,
    },
    /// Update everything except Carry (`INR`/`DCR`).
    PreserveCarry {
        /// Zero flag.
        zero: bool,
        /// Sign flag.
        sign: bool,
        /// Parity flag.
        parity: bool,
        /// Auxiliary carry flag.
        aux_carry: bool,
    },
    /// Update Carry only.
    Carry(bool),
}

impl FlagsUpdate {
    /// Applies this update to a flags byte and returns the new flags.
    #[must_use]
    pub const fn apply(self, flags: u8) -> u8 {
        match self {
            Self::None => flags,
            Self::All {
                zero,
                sign,
                parity,
                carry,
                aux_carry,
            } => {
                bit(FLAG_ZERO, zero)
                    | bit(FLAG_SIGN, sign)
                    | bit(FLAG_PARITY, parity)
                    | bit(FLAG_CARRY, carry)
                    | bit(FLAG_AUX_CARRY, aux_carry)
            }
            Self::PreserveCarry {
                zero,
                sign,
                parity,
                aux_carry,
            } => {
                (flags & FLAG_CARRY)
                    | bit(FLAG_ZERO, zero)
                    | bit(FLAG_SIGN, sign)
                    | bit(FLAG_PARITY, parity)
                    | bit(FLAG_AUX_CARRY, aux_carry)
            }
            Self::Carry(carry) => (flags & !FLAG_CARRY) | bit(FLAG_CARRY, carry),
        }
    }
}

const fn bit(flag: u8, enabled: bool) -> u8 {
    if enabled {
        flag
    } else {
        0
    }
}

/// Even parity: `true` when the number of set bits is even.
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

/// Full flag update for an 8-bit result with the given carry outcomes.
#[must_use]
pub const fn result_flags(result: u8, carry: bool, aux_carry: bool) -> FlagsUpdate {
    FlagsUpdate::All {
        zero: result == 0,
        sign: (result & 0x80) != 0,
        parity: parity(result),
        carry,
        aux_carry,
    }
}

/// Flag update for `INR`/`DCR`, which leave Carry untouched.
#[must_use]
pub const fn result_flags_preserving_carry(result: u8, aux_carry: bool) -> FlagsUpdate {
    FlagsUpdate::PreserveCarry {
        zero: result == 0,
        sign: (result & 0x80) != 0,
        parity: parity(result),
        aux_carry,
    }
}
