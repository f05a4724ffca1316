//! Memory and I/O bus interface.

/// Memory and I/O bus interface.
///
/// The 7800 is fully memory-mapped: RAM, ROM, the RIOT, TIA and POKEY all
/// live in one 16-bit address space. Implementations decode the address
/// and route the access.
pub trait Bus {
    /// Read a byte from the given address.
    ///
    /// Takes `&mut self` because some reads have side effects (reading
    /// the RIOT interrupt flag clears it).
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// A flat 64 KB RAM bus with no decoding.
///
/// Used by CPU tests and anywhere a plain memory image is enough.
pub struct SimpleBus {
    memory: Box<[u8; 0x10000]>,
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at $FFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let addr = address.wrapping_add(offset as u16);
            self.memory[usize::from(addr)] = byte;
        }
    }

    /// Read without going through the [`Bus`] trait.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }
}
