//! Operand, memory, and stack helpers shared by the instruction handlers.
//!
//! Reads go straight to memory. Writes are validated and staged on the
//! [`ExecuteState`] so a later fault in the same instruction commits nothing.

use super::{ExecuteState, MAX_STAGED_WRITES};
use crate::decoder::RegisterField;
use crate::fault::Fault;
use crate::memory::Memory;

impl ExecuteState {
    fn out_of_bounds(&self, address: u16) -> Fault {
        Fault::out_of_bounds(self.pc, Some(self.opcode), address)
    }

    /// Reads one byte of memory.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] naming `addr`.
    pub fn read(&self, memory: &Memory, addr: u16) -> Result<u8, Fault> {
        memory.read(addr).map_err(|_| self.out_of_bounds(addr))
    }

    /// Reads a little-endian word; the second byte address wraps at 16 bits.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] naming the first byte that is out of range.
    pub fn read_u16(&self, memory: &Memory, addr: u16) -> Result<u16, Fault> {
        let lo = self.read(memory, addr)?;
        let hi = self.read(memory, addr.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Validates `addr` and records a byte write for commit.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] naming `addr`.
    pub fn stage_write(&mut self, memory: &Memory, addr: u16, value: u8) -> Result<(), Fault> {
        memory.validate(addr).map_err(|_| self.out_of_bounds(addr))?;

        let slot = self.memory_writes.iter_mut().find(|slot| slot.is_none());
        debug_assert!(
            slot.is_some(),
            "instruction staged more than {MAX_STAGED_WRITES} writes"
        );
        if let Some(slot) = slot {
            *slot = Some((addr, value));
        }
        Ok(())
    }

    /// Stages a little-endian word write.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when either byte is out of range.
    pub fn stage_write_u16(&mut self, memory: &Memory, addr: u16, value: u16) -> Result<(), Fault> {
        let [lo, hi] = value.to_le_bytes();
        self.stage_write(memory, addr, lo)?;
        self.stage_write(memory, addr.wrapping_add(1), hi)
    }

    /// Pushes a word: `SP -= 2`, high byte at `SP + 1`, low byte at `SP`.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when the stack slot is out of range.
    pub fn push_u16(&mut self, memory: &Memory, value: u16) -> Result<(), Fault> {
        let sp = self.arch.sp().wrapping_sub(2);
        let [lo, hi] = value.to_le_bytes();
        self.stage_write(memory, sp.wrapping_add(1), hi)?;
        self.stage_write(memory, sp, lo)?;
        self.arch.set_sp(sp);
        Ok(())
    }

    /// Pops a word: low byte from `SP`, high byte from `SP + 1`, `SP += 2`.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when the stack slot is out of range.
    pub fn pop_u16(&mut self, memory: &Memory) -> Result<u16, Fault> {
        let sp = self.arch.sp();
        let value = self.read_u16(memory, sp)?;
        self.arch.set_sp(sp.wrapping_add(2));
        Ok(value)
    }

    /// Reads a register field; `M` reads memory at `HL`.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when `M` addresses past memory.
    pub fn read_operand(&self, field: RegisterField, memory: &Memory) -> Result<u8, Fault> {
        match field.register() {
            Some(reg) => Ok(self.arch.reg(reg)),
            None => self.read(memory, self.arch.hl()),
        }
    }

    /// Writes a register field; `M` stages a write at `HL`.
    ///
    /// # Errors
    ///
    /// Returns an out-of-bounds [`Fault`] when `M` addresses past memory.
    pub fn write_operand(
        &mut self,
        field: RegisterField,
        value: u8,
        memory: &Memory,
    ) -> Result<(), Fault> {
        match field.register() {
            Some(reg) => {
                self.arch.set_reg(reg, value);
                Ok(())
            }
            None => self.stage_write(memory, self.arch.hl(), value),
        }
    }
}
