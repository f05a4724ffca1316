//! The 7800 system bus: CPU address routing.
//!
//! Implements `emu_core::Bus`. Write decoding, in priority order:
//!
//! 1. Expansion module POKEY, RAM and XCTRL, when an XM is attached
//! 2. POKEY window (16 bytes at $4000, or $0450) when the cartridge has one
//! 3. ROM-protected addresses go to the cartridge mapper (bank switching)
//! 4. WSYNC, INPTCTRL, read-only input latches, TIA audio and the RIOT
//! 5. Everything else is RAM, with the zero-page and stack mirrors

#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;
use log::debug;
use mos_riot_6532::Riot6532;

use crate::bios::Bios;
use crate::cartridge::Cartridge;
use crate::chips::SoundChip;
use crate::memory::{
    AUDC0, AUDV1, INPT0, INPT5, INPTCTRL, MSTAT, Memory, RIOT_END, RIOT_START, WSYNC,
};
use crate::xm::{Access, ExpansionModule};

/// INPTCTRL value that swaps the cartridge in.
const INPTCTRL_CARTRIDGE: u8 = 22;
/// INPTCTRL value that swaps the BIOS in.
const INPTCTRL_BIOS: u8 = 2;

/// Size of the POKEY register window.
const POKEY_WINDOW: u16 = 16;

/// The 7800 bus, implementing `emu_core::Bus`.
pub struct SystemBus {
    pub memory: Memory,
    pub riot: Riot6532,
    /// TIA audio channels ($15-$1A).
    pub tia: Box<dyn SoundChip>,
    /// Cartridge POKEY.
    pub pokey: Box<dyn SoundChip>,
    pub(crate) cartridge: Option<Cartridge>,
    /// Expansion module, attached for cartridges that ask for one.
    pub(crate) xm: Option<ExpansionModule>,
    pub(crate) bios: Option<Bios>,
    /// BIOS is mapped at reset and may be swapped back in.
    pub(crate) bios_enabled: bool,
}

impl SystemBus {
    #[must_use]
    pub fn new(tia: Box<dyn SoundChip>, pokey: Box<dyn SoundChip>) -> Self {
        Self {
            memory: Memory::new(),
            riot: Riot6532::new(),
            tia,
            pokey,
            cartridge: None,
            xm: None,
            bios: None,
            bios_enabled: false,
        }
    }

    /// Mounted cartridge.
    #[must_use]
    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Attached expansion module.
    #[must_use]
    pub fn xm(&self) -> Option<&ExpansionModule> {
        self.xm.as_ref()
    }

    /// Whether a POKEY is reachable, on the cartridge or through the XM.
    #[must_use]
    pub fn pokey_active(&self) -> bool {
        self.cartridge.as_ref().is_some_and(Cartridge::has_pokey)
            || self.xm.as_ref().is_some_and(ExpansionModule::pokey_enabled)
    }

    /// XM read, if the module answers `address`. XCTRL is write-only.
    fn xm_read(&mut self, address: u16) -> Option<u8> {
        let xm = self.xm.as_ref()?;
        match xm.decode(address)? {
            Access::Pokey(register) => Some(self.pokey.read(register)),
            Access::Ram(offset) => Some(xm.read_ram(offset)),
            Access::Control => None,
        }
    }

    /// XM write; returns whether the module took it.
    fn xm_write(&mut self, address: u16, value: u8) -> bool {
        let Some(xm) = &mut self.xm else {
            return false;
        };
        match xm.decode(address) {
            Some(Access::Pokey(register)) => self.pokey.write(register, value),
            Some(Access::Ram(offset)) => xm.write_ram(offset, value),
            Some(Access::Control) => xm.write_control(value),
            None => return false,
        }
        true
    }

    /// Register offset if `address` hits the cartridge's POKEY.
    fn pokey_register(&self, address: u16) -> Option<u8> {
        let cartridge = self.cartridge.as_ref().filter(|c| c.has_pokey())?;
        let offset = address.wrapping_sub(cartridge.pokey_base());
        (offset < POKEY_WINDOW).then_some(offset as u8)
    }

    /// Consume the WSYNC latch.
    pub(crate) fn take_wsync(&mut self) -> bool {
        if self.memory.read(WSYNC) != 0 {
            self.memory.poke(WSYNC, 0);
            true
        } else {
            false
        }
    }

    /// Map the cartridge (or the BIOS, if enabled) for a fresh power-on.
    pub(crate) fn store_boot_image(&mut self) {
        match (&self.bios, &mut self.cartridge) {
            (Some(bios), _) if self.bios_enabled => bios.store(&mut self.memory),
            (_, Some(cartridge)) => cartridge.store(&mut self.memory),
            _ => {}
        }
    }

    /// Read without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        if let Some(xm) = &self.xm {
            if let Some(Access::Ram(offset)) = xm.decode(address) {
                return xm.read_ram(offset);
            }
        }
        if (RIOT_START..=RIOT_END).contains(&address) {
            self.riot.peek(address)
        } else {
            self.memory.read(address)
        }
    }
}

impl Bus for SystemBus {
    fn read(&mut self, address: u16) -> u8 {
        if let Some(value) = self.xm_read(address) {
            return value;
        }
        if let Some(register) = self.pokey_register(address) {
            return self.pokey.read(register);
        }
        if (RIOT_START..=RIOT_END).contains(&address) {
            return self.riot.read(address);
        }
        self.memory.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        if self.xm_write(address, value) {
            return;
        }
        if let Some(register) = self.pokey_register(address) {
            self.pokey.write(register, value);
            return;
        }

        if self.memory.is_rom(address) {
            if let Some(cartridge) = &mut self.cartridge {
                cartridge.write(&mut self.memory, address, value);
            }
            return;
        }

        match address {
            WSYNC => self.memory.poke(WSYNC, 1),
            INPTCTRL => match (value, &mut self.cartridge, &self.bios) {
                (INPTCTRL_CARTRIDGE, Some(cartridge), _) => {
                    debug!("INPTCTRL: cartridge mapped");
                    cartridge.store(&mut self.memory);
                }
                (INPTCTRL_BIOS, _, Some(bios)) if self.bios_enabled => {
                    debug!("INPTCTRL: BIOS mapped");
                    bios.store(&mut self.memory);
                }
                _ => {}
            },
            INPT0..=INPT5 | MSTAT => {}
            AUDC0..=AUDV1 => {
                self.tia.write(address as u8, value);
                self.memory.poke(address, value);
            }
            RIOT_START..=RIOT_END => self.riot.write(address, value),
            _ => self.memory.store(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::chips::SilentSound;

    /// Records writes so tests can see what reached a chip.
    #[derive(Default)]
    struct Recorder(Rc<RefCell<Vec<(u8, u8)>>>);

    impl SoundChip for Recorder {
        fn reset(&mut self) {}
        fn write(&mut self, register: u8, value: u8) {
            self.0.borrow_mut().push((register, value));
        }
        fn read(&mut self, register: u8) -> u8 {
            register | 0x80
        }
        fn process(&mut self, _cycles: u32) {}
    }

    fn silent_bus() -> SystemBus {
        SystemBus::new(Box::new(SilentSound::new()), Box::new(SilentSound::new()))
    }

    fn cartridge_with_pokey(pokey450: bool) -> Cartridge {
        let mut data = vec![0; 128 + 0x8000];
        data[0] = 1;
        data[1..10].copy_from_slice(b"ATARI7800");
        data[49..53].copy_from_slice(&0x8000u32.to_be_bytes());
        data[54] = if pokey450 { 0x40 } else { 0x01 };
        Cartridge::load(&data).expect("load")
    }

    #[test]
    fn wsync_latch() {
        let mut bus = silent_bus();
        bus.write(WSYNC, 0x55);
        assert_eq!(bus.memory.read(WSYNC), 1);
        assert!(bus.take_wsync());
        assert!(!bus.take_wsync());
    }

    #[test]
    fn input_latches_are_read_only() {
        let mut bus = silent_bus();
        bus.memory.poke(0x0C, 0x80);
        bus.write(0x0C, 0x00);
        bus.write(MSTAT, 0x80);
        assert_eq!(bus.read(0x0C), 0x80);
        assert_eq!(bus.read(MSTAT), 0x00);
    }

    #[test]
    fn rom_writes_do_not_land() {
        let mut bus = silent_bus();
        bus.memory.write_rom(0xF000, &[0x12]);
        bus.write(0xF000, 0x34);
        assert_eq!(bus.read(0xF000), 0x12);
    }

    #[test]
    fn ram_writes_mirror() {
        let mut bus = silent_bus();
        bus.write(0x2050, 0x77);
        assert_eq!(bus.read(0x0050), 0x77);
    }

    #[test]
    fn tia_and_riot_routing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SystemBus::new(
            Box::new(Recorder(Rc::clone(&log))),
            Box::new(SilentSound::new()),
        );
        bus.write(AUDC0, 0x0F);
        assert_eq!(log.borrow().as_slice(), &[(0x15, 0x0F)]);

        bus.riot.external_a = 0xEF;
        assert_eq!(bus.read(0x0280), 0xEF);
        bus.write(0x0296, 2);
        assert!(bus.riot.is_timing());
        assert_eq!(bus.read(0x0284), 2);
    }

    #[test]
    fn pokey_window_follows_header() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SystemBus::new(
            Box::new(SilentSound::new()),
            Box::new(Recorder(Rc::clone(&log))),
        );
        bus.cartridge = Some(cartridge_with_pokey(true));
        bus.write(0x0458, 0xA0);
        bus.write(0x0460, 0xB0);
        assert_eq!(log.borrow().as_slice(), &[(8, 0xA0)]);
        assert_eq!(bus.read(0x0452), 0x82);
        assert_eq!(bus.memory.read(0x0460), 0xB0);

        bus.cartridge = Some(cartridge_with_pokey(false));
        bus.write(0x400F, 0xC0);
        assert_eq!(log.borrow().last(), Some(&(0x0F, 0xC0)));
    }

    #[test]
    fn expansion_module_routing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = SystemBus::new(
            Box::new(SilentSound::new()),
            Box::new(Recorder(Rc::clone(&log))),
        );
        bus.memory.write_rom(0x4000, &[0xEE; 16]);
        bus.xm = Some(ExpansionModule::new());
        assert!(!bus.pokey_active());

        // Power-on: nothing enabled, the cartridge space shows through.
        bus.write(0x0451, 0x11);
        assert!(log.borrow().is_empty());
        assert_eq!(bus.read(0x4000), 0xEE);

        // Bank 3, RAM and POKEY on.
        bus.write(0x0470, 0x1B);
        assert!(bus.pokey_active());
        assert_eq!(bus.memory.read(0x0470), 0x00, "XCTRL is not RAM");
        bus.write(0x4000, 0x5A);
        assert_eq!(bus.read(0x4000), 0x5A);
        assert_eq!(bus.peek(0x4000), 0x5A);
        assert_eq!(bus.memory.read(0x4000), 0xEE, "cartridge untouched");
        bus.write(0x0462, 0x22);
        assert_eq!(log.borrow().as_slice(), &[(2, 0x22)]);
        assert_eq!(bus.read(0x0455), 0x85);

        // Another bank hides the byte; switching back shows it again.
        bus.write(0x0470, 0x08);
        assert_eq!(bus.read(0x4000), 0x00);
        bus.write(0x0470, 0x0B);
        assert_eq!(bus.read(0x4000), 0x5A);

        // RAM off: reads fall back to the cartridge.
        bus.write(0x0470, 0x03);
        assert_eq!(bus.read(0x4000), 0xEE);
    }

    #[test]
    fn inptctrl_maps_cartridge() {
        let mut bus = silent_bus();
        let mut image = vec![0; 0x4000];
        image[0x3FFC] = 0x00;
        image[0x3FFD] = 0xC0;
        bus.cartridge = Some(Cartridge::load(&image).expect("load"));
        bus.write(INPTCTRL, 22);
        assert_eq!(bus.read(0xFFFD), 0xC0);
        assert!(bus.memory.is_rom(0xC000));
    }
}
