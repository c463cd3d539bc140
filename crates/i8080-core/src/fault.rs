use thiserror::Error;

/// Stable fault taxonomy for the execution engine.
///
/// Every fault is terminal: the run loop latches it and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Fetched opcode resolves to the unimplemented-opcode handler.
    #[error("unimplemented opcode")]
    UnimplementedOpcode = 0x01,
    /// Fetch, load, store, or stack access outside the configured memory.
    #[error("memory access out of bounds")]
    OutOfBoundsAccess = 0x02,
}

impl FaultCode {
    /// Converts a fault code to its stable numeric value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A raised fault together with the context an operator needs to locate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{}", self.report())]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Fault {
    /// Canonical fault code.
    pub code: FaultCode,
    /// Address of the instruction that raised the fault.
    pub pc: u16,
    /// Opcode byte, when the fetch itself succeeded.
    pub opcode: Option<u8>,
    /// Faulting data address for memory faults.
    pub address: Option<u16>,
}

impl Fault {
    /// Builds an unimplemented-opcode fault.
    #[must_use]
    pub const fn unimplemented(pc: u16, opcode: u8) -> Self {
        Self {
            code: FaultCode::UnimplementedOpcode,
            pc,
            opcode: Some(opcode),
            address: None,
        }
    }

    /// Builds an out-of-bounds fault for `address`.
    #[must_use]
    pub const fn out_of_bounds(pc: u16, opcode: Option<u8>, address: u16) -> Self {
        Self {
            code: FaultCode::OutOfBoundsAccess,
            pc,
            opcode,
            address: Some(address),
        }
    }

    fn report(&self) -> String {
        let mut report = match (self.code, self.opcode) {
            (FaultCode::UnimplementedOpcode, Some(opcode)) => {
                format!("{} 0x{opcode:02X} at PC 0x{:04X}", self.code, self.pc)
            }
            _ => format!("{} at PC 0x{:04X}", self.code, self.pc),
        };
        match (self.code, self.opcode, self.address) {
            (FaultCode::OutOfBoundsAccess, Some(opcode), Some(address)) => {
                report.push_str(&format!(" (opcode 0x{opcode:02X}, address 0x{address:04X})"));
            }
            (_, _, Some(address)) => report.push_str(&format!(" (address 0x{address:04X})")),
            _ => {}
        }
        report
    }
}
