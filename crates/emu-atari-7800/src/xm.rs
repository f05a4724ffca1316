//! Expansion module (XM): 128 KB of banked RAM and a POKEY socket.
//!
//! # Registers
//!
//! | Addr        | Name   | Description                          |
//! |-------------|--------|--------------------------------------|
//! | $0450-$045F | POKEY1 | POKEY registers, when enabled        |
//! | $0460-$046F | POKEY2 | Second chip select, same POKEY here  |
//! | $0470-$047F | XCTRL  | Control latch (write only)           |
//! | $4000-$7FFF | RAM    | Selected 16 KB bank, when enabled    |
//!
//! XCTRL bits 0-2 select the bank, bit 3 enables the RAM and bit 4 the
//! POKEY. Both enables are clear after power-on.

use log::debug;

pub const POKEY_START: u16 = 0x0450;
pub const POKEY_END: u16 = 0x046F;
pub const XCTRL_START: u16 = 0x0470;
pub const XCTRL_END: u16 = 0x047F;
pub const RAM_START: u16 = 0x4000;
pub const RAM_END: u16 = 0x7FFF;

/// Total banked RAM.
pub const RAM_SIZE: usize = 0x2_0000;
const BANK_SIZE: usize = 0x4000;

const BANK_MASK: u8 = 0x07;
const MEMORY_ENABLE: u8 = 0x08;
const POKEY_ENABLE: u8 = 0x10;

/// XCTRL followed by the whole RAM.
pub const SNAPSHOT_SIZE: usize = 1 + RAM_SIZE;

/// Where an XM access lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// POKEY register 0-15.
    Pokey(u8),
    /// Byte offset into the banked RAM.
    Ram(usize),
    /// The control latch.
    Control,
}

pub struct ExpansionModule {
    ram: Box<[u8; RAM_SIZE]>,
    xctrl: u8,
}

impl Default for ExpansionModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpansionModule {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; RAM_SIZE]),
            xctrl: 0,
        }
    }

    /// Power-on: RAM cleared, bank 0, RAM and POKEY disabled.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.xctrl = 0;
    }

    #[must_use]
    pub fn xctrl(&self) -> u8 {
        self.xctrl
    }

    #[must_use]
    pub fn bank(&self) -> u8 {
        self.xctrl & BANK_MASK
    }

    #[must_use]
    pub fn memory_enabled(&self) -> bool {
        self.xctrl & MEMORY_ENABLE != 0
    }

    #[must_use]
    pub fn pokey_enabled(&self) -> bool {
        self.xctrl & POKEY_ENABLE != 0
    }

    /// Decode `address`, or `None` if the module doesn't answer it with
    /// the current enables.
    #[must_use]
    pub fn decode(&self, address: u16) -> Option<Access> {
        match address {
            POKEY_START..=POKEY_END if self.pokey_enabled() => {
                Some(Access::Pokey((address & 0x0F) as u8))
            }
            RAM_START..=RAM_END if self.memory_enabled() => Some(Access::Ram(
                usize::from(self.bank()) * BANK_SIZE + usize::from(address - RAM_START),
            )),
            XCTRL_START..=XCTRL_END => Some(Access::Control),
            _ => None,
        }
    }

    #[must_use]
    pub fn read_ram(&self, offset: usize) -> u8 {
        self.ram[offset]
    }

    pub fn write_ram(&mut self, offset: usize, value: u8) {
        self.ram[offset] = value;
    }

    pub fn write_control(&mut self, value: u8) {
        self.xctrl = value;
        debug!(
            "XCTRL={value:02X}: bank {}, RAM {}, POKEY {}",
            self.bank(),
            self.memory_enabled(),
            self.pokey_enabled()
        );
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(SNAPSHOT_SIZE);
        data.push(self.xctrl);
        data.extend_from_slice(&self.ram[..]);
        data
    }

    /// Restore from [`ExpansionModule::snapshot`] output. Short input
    /// restores what it covers.
    pub fn restore(&mut self, data: &[u8]) {
        let Some((&xctrl, ram)) = data.split_first() else {
            return;
        };
        self.xctrl = xctrl;
        let len = ram.len().min(RAM_SIZE);
        self.ram[..len].copy_from_slice(&ram[..len]);
    }
}
