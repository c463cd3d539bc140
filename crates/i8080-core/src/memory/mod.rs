//! Flat byte-addressable memory owned by one core instance.

/// Bounds-checked byte and word access helpers.
pub mod access;

pub use access::{read_u16_le, read_u8, validate_address, write_u16_le, WORD_ACCESS_BYTES};

use thiserror::Error;

use crate::FaultCode;

/// Size in bytes of the full 8080 address space (64 KiB).
pub const ADDRESS_SPACE_BYTES: usize = u16::MAX as usize + 1;

/// Rejected memory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryConfigError {
    /// Size is zero or larger than the 16-bit address space.
    #[error("memory size {0} is outside 1..={max} bytes", max = ADDRESS_SPACE_BYTES)]
    InvalidSize(usize),
}

/// Program image could not be placed in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The image extends past the end of the configured memory.
    #[error(
        "program image of {len} bytes at 0x{origin:04X} does not fit in {capacity} bytes of memory"
    )]
    ImageTooLarge {
        /// Image length in bytes.
        len: usize,
        /// Requested load address.
        origin: u16,
        /// Configured memory size in bytes.
        capacity: usize,
    },
}

/// Fixed-size memory. Addresses at or beyond the configured size fault with
/// [`FaultCode::OutOfBoundsAccess`]; nothing is masked into range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            bytes: vec![0; ADDRESS_SPACE_BYTES].into_boxed_slice(),
        }
    }
}

impl Memory {
    /// Allocates zeroed memory of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryConfigError::InvalidSize`] unless `1 <= size <= 65536`.
    pub fn new(size: usize) -> Result<Self, MemoryConfigError> {
        if size == 0 || size > ADDRESS_SPACE_BYTES {
            return Err(MemoryConfigError::InvalidSize(size));
        }
        Ok(Self {
            bytes: vec![0; size].into_boxed_slice(),
        })
    }

    /// Configured size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`: memory has at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read-only view of the backing store.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Validates that `addr` is inside memory.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::OutOfBoundsAccess`] when `addr >= len()`.
    pub fn validate(&self, addr: u16) -> Result<(), FaultCode> {
        validate_address(addr, self.bytes.len())
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::OutOfBoundsAccess`] when `addr >= len()`.
    pub fn read(&self, addr: u16) -> Result<u8, FaultCode> {
        read_u8(&self.bytes, addr)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::OutOfBoundsAccess`] when `addr >= len()`.
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), FaultCode> {
        let slot = self
            .bytes
            .get_mut(usize::from(addr))
            .ok_or(FaultCode::OutOfBoundsAccess)?;
        *slot = value;
        Ok(())
    }

    /// Reads a little-endian word (low byte first).
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::OutOfBoundsAccess`] when either byte is outside memory.
    pub fn read_u16_le(&self, addr: u16) -> Result<u16, FaultCode> {
        read_u16_le(&self.bytes, addr)
    }

    /// Writes a little-endian word (low byte first).
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::OutOfBoundsAccess`] when either byte is outside memory.
    pub fn write_u16_le(&mut self, addr: u16, value: u16) -> Result<(), FaultCode> {
        write_u16_le(&mut self.bytes, addr, value)
    }

    /// Copies `image` into memory starting at `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ImageTooLarge`] when the image does not fit; memory
    /// is left untouched in that case.
    pub fn load(&mut self, origin: u16, image: &[u8]) -> Result<(), LoadError> {
        let start = usize::from(origin);
        let end = start
            .checked_add(image.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or(LoadError::ImageTooLarge {
                len: image.len(),
                origin,
                capacity: self.bytes.len(),
            })?;
        self.bytes[start..end].copy_from_slice(image);
        Ok(())
    }
}
