//! Bounds-checked access helpers over a flat byte store.

use crate::FaultCode;

/// Canonical byte width for 16-bit little-endian accesses.
pub const WORD_ACCESS_BYTES: u8 = 2;

/// Validates that `addr` indexes a byte inside a store of `size` bytes.
///
/// # Errors
///
/// Returns [`FaultCode::OutOfBoundsAccess`] when `addr >= size`.
pub const fn validate_address(addr: u16, size: usize) -> Result<(), FaultCode> {
    if (addr as usize) < size {
        Ok(())
    } else {
        Err(FaultCode::OutOfBoundsAccess)
    }
}

/// Reads one byte from `memory`.
///
/// # Errors
///
/// Returns [`FaultCode::OutOfBoundsAccess`] when `addr` is outside `memory`.
pub fn read_u8(memory: &[u8], addr: u16) -> Result<u8, FaultCode> {
    memory
        .get(usize::from(addr))
        .copied()
        .ok_or(FaultCode::OutOfBoundsAccess)
}

/// Reads a little-endian 16-bit value: low byte at `addr`, high byte at
/// `addr + 1` (wrapping at the 16-bit boundary).
///
/// # Errors
///
/// Returns [`FaultCode::OutOfBoundsAccess`] when either byte is outside
/// `memory`.
pub fn read_u16_le(memory: &[u8], addr: u16) -> Result<u16, FaultCode> {
    let lo = read_u8(memory, addr)?;
    let hi = read_u8(memory, addr.wrapping_add(1))?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// Writes a little-endian 16-bit value: low byte at `addr`, high byte at
/// `addr + 1` (wrapping at the 16-bit boundary).
///
/// Both addresses are validated before either byte is written.
///
/// # Errors
///
/// Returns [`FaultCode::OutOfBoundsAccess`] when either byte is outside
/// `memory`.
pub fn write_u16_le(memory: &mut [u8], addr: u16, value: u16) -> Result<(), FaultCode> {
    let hi_addr = addr.wrapping_add(1);
    validate_address(addr, memory.len())?;
    validate_address(hi_addr, memory.len())?;

    let [lo, hi] = value.to_le_bytes();
    memory[usize::from(addr)] = lo;
    memory[usize::from(hi_addr)] = hi;
    Ok(())
}
