//! Sally register file.

use crate::Status;

/// Sally register set.
///
/// - A: accumulator
/// - X, Y: index registers
/// - S: stack pointer into page one ($0100-$01FF)
/// - PC: program counter
/// - P: processor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on register state.
    ///
    /// A, X, Y and S are zeroed and only the reserved flag is set. The
    /// RESET sequence then sets I and Z and loads PC from the vector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            pc: 0,
            p: Status::R,
        }
    }

    /// Address the next push writes to; decrements S afterwards.
    pub fn push(&mut self) -> u16 {
        let addr = 0x0100 | u16::from(self.s);
        self.s = self.s.wrapping_sub(1);
        addr
    }

    /// Increment S and return the address the pop reads from.
    pub fn pop(&mut self) -> u16 {
        self.s = self.s.wrapping_add(1);
        0x0100 | u16::from(self.s)
    }
}
