//! 7800 cartridge images and bank mapping.
//!
//! An image is either raw ROM or carries a 128-byte header:
//!
//! | Offset | Contents |
//! |--------|----------|
//! | 1..10  | `ATARI7800` signature |
//! | 17..49 | Title, NUL padded |
//! | 49..53 | ROM size, big-endian |
//! | 53     | Mapper byte: 1 Activision, 2 Absolute |
//! | 54     | Flags: bit 0 POKEY, 1 bank switched, 2 RAM at $4000, 3 ROM at $4000, 6 POKEY at $0450 |
//! | 55, 56 | Controller types (1 joystick, 2 lightgun) |
//! | 57     | Region (1 PAL) |
//! | 63     | Bit 0: expansion module |
//!
//! Bank-switched types keep their last 16 KB bank fixed at $C000 and swap
//! a 16 KB window selected by writes to ROM space.

use std::fmt;
use std::path::Path;

use log::{debug, info, trace};
use md5::{Digest, Md5};

use crate::error::CartridgeError;
use crate::memory::Memory;
use crate::region::Region;

/// Header length, stripped before mapping.
pub const HEADER_SIZE: usize = 128;
/// Size of one switchable bank.
pub const BANK_SIZE: usize = 16384;
/// HBLANK cycle threshold used unless the database overrides it.
pub const DEFAULT_HBLANK: u32 = 34;

const SIGNATURE: &[u8] = b"ATARI7800";

/// Controller type code for a lightgun.
pub const CONTROLLER_LIGHTGUN: u8 = 2;

/// Bank mapping geometry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeType {
    /// Up to 48 KB mapped flat at the top of memory.
    #[default]
    Normal,
    /// Switchable bank at $8000, last bank fixed at $C000.
    Supercart,
    /// Supercart with an extra fixed bank (bank 0) at $4000.
    SupercartLarge,
    /// Supercart with 16 KB of RAM at $4000.
    SupercartRam,
    /// Supercart with the second-to-last bank fixed at $4000.
    SupercartRom,
    /// Absolute: fixed bank at $4000, one of two 16 KB banks at $8000.
    Absolute,
    /// Activision: eight 16 KB banks swapped at $A000 by writes to $FF80+.
    Activision,
}

impl CartridgeType {
    /// Decode the database type code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Normal,
            1 => Self::Supercart,
            2 => Self::SupercartLarge,
            3 => Self::SupercartRam,
            4 => Self::SupercartRom,
            5 => Self::Absolute,
            6 => Self::Activision,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Supercart => 1,
            Self::SupercartLarge => 2,
            Self::SupercartRam => 3,
            Self::SupercartRom => 4,
            Self::Absolute => 5,
            Self::Activision => 6,
        }
    }

    /// Address the switchable window is copied to, if there is one.
    #[must_use]
    pub const fn bank_address(self) -> Option<u16> {
        match self {
            Self::Normal => None,
            Self::Supercart | Self::SupercartLarge | Self::SupercartRam | Self::SupercartRom => {
                Some(0x8000)
            }
            Self::Absolute => Some(0x4000),
            Self::Activision => Some(0xA000),
        }
    }

    /// Classify a headerless image by length alone.
    #[must_use]
    pub const fn from_size(size: usize) -> Self {
        match size {
            0..=0x1_0000 => Self::Normal,
            0x2_4000 => Self::SupercartLarge,
            0x2_0000 => Self::SupercartRom,
            _ => Self::Supercart,
        }
    }
}

impl fmt::Display for CartridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Supercart => "supercart",
            Self::SupercartLarge => "supercart-large",
            Self::SupercartRam => "supercart-ram",
            Self::SupercartRom => "supercart-rom",
            Self::Absolute => "absolute",
            Self::Activision => "activision",
        })
    }
}

/// MD5 of `data` as 32 lowercase hex characters.
#[must_use]
pub fn digest(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// A loaded cartridge: the stripped ROM plus everything the header or
/// the database says about it.
#[derive(Debug, Clone)]
pub struct Cartridge {
    image: Vec<u8>,
    digest: String,
    bank: u8,
    pub(crate) title: String,
    pub(crate) kind: CartridgeType,
    pub(crate) pokey: bool,
    pub(crate) pokey450: bool,
    pub(crate) controllers: [u8; 2],
    pub(crate) region: Region,
    pub(crate) flags: u32,
    pub(crate) xm: bool,
    pub(crate) hblank: u32,
    pub(crate) crosshair_x: i32,
    pub(crate) crosshair_y: i32,
    pub(crate) dual_analog: bool,
    pub(crate) disable_bios: bool,
    pub(crate) left_switch: u8,
    pub(crate) right_switch: u8,
    pub(crate) swap_buttons: bool,
}

impl Cartridge {
    fn blank(image: Vec<u8>) -> Self {
        let digest = digest(&image);
        Self {
            image,
            digest,
            bank: 0,
            title: String::new(),
            kind: CartridgeType::Normal,
            pokey: false,
            pokey450: false,
            controllers: [0; 2],
            region: Region::Ntsc,
            flags: 0,
            xm: false,
            hblank: DEFAULT_HBLANK,
            crosshair_x: 0,
            crosshair_y: 0,
            dual_analog: false,
            disable_bios: false,
            left_switch: 1,
            right_switch: 0,
            swap_buttons: false,
        }
    }

    /// Parse a cartridge image, with or without a header.
    ///
    /// # Errors
    ///
    /// Fails on images of 128 bytes or less, on the CC2 hack format, and
    /// on headers that declare more ROM than the file holds.
    pub fn load(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() <= HEADER_SIZE {
            return Err(CartridgeError::TooSmall(data.len()));
        }
        if &data[1..3] == b">>" {
            return Err(CartridgeError::HackFormat);
        }

        let cartridge = if &data[1..10] == SIGNATURE {
            let header = &data[..HEADER_SIZE];
            let declared = u32::from_be_bytes([header[49], header[50], header[51], header[52]])
                as usize;
            let available = data.len() - HEADER_SIZE;
            if declared > available {
                return Err(CartridgeError::Truncated {
                    declared,
                    available,
                });
            }
            let mut cartridge =
                Self::blank(data[HEADER_SIZE..HEADER_SIZE + declared].to_vec());
            cartridge.read_header(header);
            cartridge
        } else {
            let mut cartridge = Self::blank(data.to_vec());
            cartridge.kind = CartridgeType::from_size(data.len());
            cartridge
        };

        info!(
            "cartridge: {} bytes, type {}, digest {}",
            cartridge.image.len(),
            cartridge.kind,
            cartridge.digest
        );
        Ok(cartridge)
    }

    /// Read and parse a cartridge file.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::Io`] if the file can't be read, or any
    /// error from [`Cartridge::load`].
    pub fn from_file(path: &Path) -> Result<Self, CartridgeError> {
        let data = std::fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&data)
    }

    fn read_header(&mut self, header: &[u8]) {
        let title = &header[17..49];
        let end = title.iter().position(|&b| b == 0).unwrap_or(title.len());
        self.title = String::from_utf8_lossy(&title[..end]).trim().to_owned();

        let mapper = header[53];
        let flags = header[54];
        let size = self.image.len();

        // Combined flag bits pick the layout, largest first; Activision and
        // Absolute are swapped relative to the type-byte docs.
        self.kind = match mapper {
            0 if flags & 0x0A == 0x0A => CartridgeType::SupercartLarge,
            0 if flags & 0x12 == 0x12 => CartridgeType::SupercartRom,
            0 if flags & 0x06 == 0x06 => CartridgeType::SupercartRam,
            0 if flags & 0x02 != 0 => CartridgeType::Supercart,
            0 => CartridgeType::from_size(size),
            1 => CartridgeType::Activision,
            2 => CartridgeType::Absolute,
            _ => CartridgeType::Normal,
        };

        self.pokey = flags & 0x01 != 0;
        self.pokey450 = flags & 0x40 != 0;
        if self.pokey450 {
            self.pokey = true;
        }
        self.controllers = [header[55], header[56]];
        self.region = Region::from_byte(header[57]);
        self.flags = 0;
        self.xm = header[63] & 0x01 != 0;

        debug!(
            "header: title {:?}, mapper {mapper}, flags {flags:#04x}, controllers {:?}, region {:?}",
            self.title, self.controllers, self.region
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The stripped ROM image.
    #[must_use]
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.image.len()
    }

    /// MD5 of the stripped image, lowercase hex.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> CartridgeType {
        self.kind
    }

    /// Currently selected bank.
    #[must_use]
    pub fn bank(&self) -> u8 {
        self.bank
    }

    #[must_use]
    pub fn has_pokey(&self) -> bool {
        self.pokey
    }

    /// Base of the POKEY register window.
    #[must_use]
    pub fn pokey_base(&self) -> u16 {
        if self.pokey450 { 0x0450 } else { 0x4000 }
    }

    #[must_use]
    pub fn controllers(&self) -> [u8; 2] {
        self.controllers
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Compatibility flags: bit 0 disables cycle stealing, bit 1 disables
    /// WSYNC.
    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Expansion module requested. Parsed only.
    #[must_use]
    pub fn xm(&self) -> bool {
        self.xm
    }

    /// Cycle count at which MARIA takes the bus each scanline.
    #[must_use]
    pub fn hblank(&self) -> u32 {
        self.hblank
    }

    /// Crosshair drawing offsets.
    #[must_use]
    pub fn crosshair(&self) -> (i32, i32) {
        (self.crosshair_x, self.crosshair_y)
    }

    #[must_use]
    pub fn dual_analog(&self) -> bool {
        self.dual_analog
    }

    #[must_use]
    pub fn disable_bios(&self) -> bool {
        self.disable_bios
    }

    /// Default difficulty switch positions (left, right); 1 is A.
    #[must_use]
    pub fn difficulty_switches(&self) -> (u8, u8) {
        (self.left_switch, self.right_switch)
    }

    #[must_use]
    pub fn swap_buttons(&self) -> bool {
        self.swap_buttons
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Byte offset of `bank` in the image. Supercarts of 64 KB or less
    /// only decode two bank bits.
    #[must_use]
    pub fn bank_offset(&self, bank: u8) -> usize {
        let folded = matches!(
            self.kind,
            CartridgeType::Supercart | CartridgeType::SupercartRom | CartridgeType::SupercartRam
        ) && self.image.len() <= 0x1_0000;
        if folded {
            usize::from(bank & 3) * BANK_SIZE
        } else {
            usize::from(bank) * BANK_SIZE
        }
    }

    fn bank_data(&self, offset: usize, len: usize) -> &[u8] {
        let end = (offset + len).min(self.image.len());
        &self.image[offset.min(end)..end]
    }

    fn last_bank_offset(&self, back: usize) -> Option<usize> {
        self.image.len().checked_sub(BANK_SIZE * back)
    }

    /// Copy `bank` to `address`. Banks past the end of the image are
    /// ignored and the current bank is kept.
    fn write_bank(&mut self, memory: &mut Memory, address: u16, bank: u8) {
        let offset = self.bank_offset(bank);
        if offset < self.image.len() {
            memory.write_rom(address, self.bank_data(offset, BANK_SIZE));
            self.bank = bank;
            trace!("bank {bank} -> ${address:04X}");
        }
    }

    /// Switch the window of a bank-switched cartridge.
    pub fn store_bank(&mut self, memory: &mut Memory, bank: u8) {
        if let Some(address) = self.kind.bank_address() {
            self.write_bank(memory, address, bank);
        }
    }

    /// Establish the power-on mapping.
    pub fn store(&mut self, memory: &mut Memory) {
        match self.kind {
            CartridgeType::Normal => {
                let size = self.image.len().min(0x1_0000);
                let data = &self.image[self.image.len() - size..];
                if let Ok(address) = u16::try_from(0x1_0000 - size) {
                    memory.write_rom(address, data);
                }
            }
            CartridgeType::Supercart => {
                if let Some(last) = self.last_bank_offset(1) {
                    memory.write_rom(0xC000, self.bank_data(last, BANK_SIZE));
                }
            }
            CartridgeType::SupercartLarge => {
                if let Some(last) = self.last_bank_offset(1) {
                    memory.write_rom(0xC000, self.bank_data(last, BANK_SIZE));
                    let first = self.bank_offset(0);
                    memory.write_rom(0x4000, self.bank_data(first, BANK_SIZE));
                }
            }
            CartridgeType::SupercartRam => {
                if let Some(last) = self.last_bank_offset(1) {
                    memory.write_rom(0xC000, self.bank_data(last, BANK_SIZE));
                    memory.clear_rom(0x4000, BANK_SIZE);
                }
            }
            CartridgeType::SupercartRom => {
                if let (Some(last), Some(second)) =
                    (self.last_bank_offset(1), self.last_bank_offset(2))
                {
                    memory.write_rom(0xC000, self.bank_data(last, BANK_SIZE));
                    memory.write_rom(0x4000, self.bank_data(second, BANK_SIZE));
                }
            }
            CartridgeType::Absolute => {
                memory.write_rom(0x4000, self.bank_data(0, BANK_SIZE));
                let high = self.bank_offset(2);
                memory.write_rom(0x8000, self.bank_data(high, BANK_SIZE * 2));
            }
            CartridgeType::Activision => {
                if self.image.len() > 122_880 {
                    memory.write_rom(0xA000, self.bank_data(0, BANK_SIZE));
                    memory.write_rom(0x4000, self.bank_data(106_496, 8192));
                    memory.write_rom(0x6000, self.bank_data(98_304, 8192));
                    memory.write_rom(0x8000, self.bank_data(122_880, 8192));
                    memory.write_rom(0xE000, self.bank_data(114_688, 8192));
                }
            }
        }
    }

    /// Handle a CPU write into ROM space. Only bank-switch writes have an
    /// effect.
    pub fn write(&mut self, memory: &mut Memory, address: u16, data: u8) {
        let banks = self.image.len() / BANK_SIZE;
        let in_window = (0x8000..0xC000).contains(&address) && usize::from(data) < banks;
        match self.kind {
            CartridgeType::Supercart | CartridgeType::SupercartRam | CartridgeType::SupercartRom
                if in_window =>
            {
                self.store_bank(memory, data);
            }
            CartridgeType::SupercartLarge if in_window => {
                self.store_bank(memory, data.wrapping_add(1));
            }
            CartridgeType::Absolute if address == 0x8000 && (data == 1 || data == 2) => {
                self.store_bank(memory, data - 1);
            }
            CartridgeType::Activision if address >= 0xFF80 => {
                self.store_bank(memory, (address & 7) as u8);
            }
            _ => {}
        }
    }
}
