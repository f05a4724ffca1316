//! The 7800 address space: 64 KB of bytes plus a ROM-protect map.
//!
//! Everything the CPU sees lives here, including the TIA/MARIA register
//! shadows. [`crate::bus::SystemBus`] decides which writes reach this
//! array; cartridge banks are copied in and marked read-only.

/// Input port control; the BIOS writes 22 here to hand over to the cart.
pub const INPTCTRL: u16 = 0x0001;
/// Paddle/two-button inputs INPT0-INPT3 (active high).
pub const INPT0: u16 = 0x0008;
pub const INPT1: u16 = 0x0009;
pub const INPT2: u16 = 0x000A;
pub const INPT3: u16 = 0x000B;
/// One-button fire inputs (active low). INPT4 doubles as the lightgun
/// sensor.
pub const INPT4: u16 = 0x000C;
pub const INPT5: u16 = 0x000D;
/// TIA audio registers.
pub const AUDC0: u16 = 0x0015;
pub const AUDV1: u16 = 0x001A;
/// Halt the CPU until the end of the scanline.
pub const WSYNC: u16 = 0x0024;
/// MARIA status: bit 7 set during VBLANK.
pub const MSTAT: u16 = 0x0028;
/// MARIA control: bits 5-6 select DMA mode.
pub const CTRL: u16 = 0x003C;
/// RIOT register window.
pub const RIOT_START: u16 = 0x0280;
pub const RIOT_END: u16 = 0x029F;

/// CTRL bits 5-6 value meaning "DMA on".
pub const CTRL_DMA_MASK: u8 = 0x60;
pub const CTRL_DMA_ON: u8 = 0x40;

const SIZE: usize = 0x1_0000;
/// Start of cartridge space, protected until a mapper says otherwise.
const CARTRIDGE_START: usize = 0x4000;

/// Flat memory with per-address ROM protection.
pub struct Memory {
    ram: Box<[u8; SIZE]>,
    rom: Box<[bool; SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        let mut memory = Self {
            ram: Box::new([0; SIZE]),
            rom: Box::new([false; SIZE]),
        };
        memory.reset();
        memory
    }

    /// Zero everything. $0000-$3FFF is writable; cartridge space is
    /// protected so stray writes reach the mapper.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.rom[..CARTRIDGE_START].fill(false);
        self.rom[CARTRIDGE_START..].fill(true);
    }

    #[must_use]
    pub fn read(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Store one byte with no mirroring and no protection check.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    /// Store a CPU write that reached RAM, keeping the zero-page and stack
    /// mirrors at $2040-$20FF and $2140-$21FF in step.
    pub fn store(&mut self, address: u16, value: u8) {
        self.poke(address, value);
        match address {
            0x2040..=0x20FF | 0x2140..=0x21FF => self.poke(address - 0x2000, value),
            0x0040..=0x00FF | 0x0140..=0x01FF => self.poke(address + 0x2000, value),
            _ => {}
        }
    }

    #[must_use]
    pub fn is_rom(&self, address: u16) -> bool {
        self.rom[usize::from(address)]
    }

    /// Copy `data` to `address` and protect it. Bytes past $FFFF are
    /// dropped.
    pub fn write_rom(&mut self, address: u16, data: &[u8]) {
        let start = usize::from(address);
        let len = data.len().min(SIZE - start);
        self.ram[start..start + len].copy_from_slice(&data[..len]);
        self.rom[start..start + len].fill(true);
    }

    /// Zero `len` bytes at `address` and make them writable RAM.
    pub fn clear_rom(&mut self, address: u16, len: usize) {
        let start = usize::from(address);
        let len = len.min(SIZE - start);
        self.ram[start..start + len].fill(0);
        self.rom[start..start + len].fill(false);
    }

    /// Borrow a range of the address space.
    #[must_use]
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = usize::from(start);
        &self.ram[start..(start + len).min(SIZE)]
    }

    /// Overwrite a range of the address space without touching protection.
    pub fn load(&mut self, start: u16, data: &[u8]) {
        let start = usize::from(start);
        let len = data.len().min(SIZE - start);
        self.ram[start..start + len].copy_from_slice(&data[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_and_stack_mirrors() {
        let mut memory = Memory::new();
        memory.store(0x0040, 0x11);
        assert_eq!(memory.read(0x2040), 0x11);
        memory.store(0x21FF, 0x22);
        assert_eq!(memory.read(0x01FF), 0x22);
        memory.store(0x0030, 0x33);
        assert_eq!(memory.read(0x2030), 0x00, "below $40 is not mirrored");
        memory.store(0x0100, 0x44);
        assert_eq!(memory.read(0x2100), 0x00, "$0100-$013F is not mirrored");
    }

    #[test]
    fn rom_protection_and_clear() {
        let mut memory = Memory::new();
        memory.write_rom(0xFFFE, &[1, 2, 3, 4]);
        assert_eq!(memory.read(0xFFFF), 2);
        assert!(memory.is_rom(0xFFFE));
        assert!(memory.is_rom(0x8000), "cartridge space starts protected");
        assert!(!memory.is_rom(0x3FFF));

        memory.write_rom(0x4000, &[9; 16]);
        memory.clear_rom(0x4000, 8);
        assert_eq!(memory.read(0x4000), 0);
        assert!(!memory.is_rom(0x4007));
        assert!(memory.is_rom(0x4008));
    }
}
