//! Sally processor status register (P).
//!
//! Bit values match the save-state byte layout and must not change.

use bitflags::bitflags;

bitflags! {
    /// Processor status flags, NV-BDIZC.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry.
        const C = 0x01;
        /// Zero.
        const Z = 0x02;
        /// Interrupt disable.
        const I = 0x04;
        /// Decimal mode.
        const D = 0x08;
        /// Break.
        const B = 0x10;
        /// Reserved, set on reset.
        const R = 0x20;
        /// Overflow.
        const V = 0x40;
        /// Negative.
        const N = 0x80;
    }
}

impl Status {
    /// Update N and Z from a result byte.
    pub fn update_nz(&mut self, value: u8) {
        self.set(Self::Z, value == 0);
        self.set(Self::N, value & 0x80 != 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_nz_tracks_result() {
        let mut p = Status::empty();
        p.update_nz(0);
        assert_eq!(p, Status::Z);
        p.update_nz(0x80);
        assert_eq!(p, Status::N);
        p.update_nz(0x01);
        assert!(p.is_empty());
    }

    #[test]
    fn raw_bits_round_trip() {
        let p = Status::from_bits_retain(0xFF);
        assert_eq!(p.bits(), 0xFF);
        assert_eq!((Status::I | Status::R | Status::Z).bits(), 0x26);
    }
}
