//! The Atari high-score cartridge.
//!
//! A 4 KB ROM at $3000 with 2 KB of battery SRAM at $1000. Games that
//! support it jump to $3FCF or $3FFD; Sally flags that, and the SRAM is
//! only written back for sessions where it happened.

use std::io::ErrorKind;
use std::path::Path;

use emu_core::Bus;
use log::{info, warn};

use crate::cartridge;
use crate::error::CartridgeError;
use crate::memory::Memory;

/// MD5 of the only accepted high-score ROM.
pub const DIGEST: &str = "c8a73288ab97226c52602204ab894286";
/// Where the ROM is written.
pub const ROM_START: u16 = 0x3000;
/// Battery-backed SRAM.
pub const SRAM_START: u16 = 0x1000;
pub const SRAM_SIZE: usize = 2048;

/// A verified high-score ROM and the SRAM to restore with it.
#[derive(Debug, Clone)]
pub struct HighScoreCart {
    rom: Vec<u8>,
    sram: Option<Vec<u8>>,
}

impl HighScoreCart {
    /// # Errors
    ///
    /// Returns [`CartridgeError::HighScoreDigest`] for any ROM but the
    /// official one and [`CartridgeError::HighScoreSram`] for SRAM that
    /// isn't 2 KB.
    pub fn load(rom: &[u8], sram: Option<&[u8]>) -> Result<Self, CartridgeError> {
        let digest = cartridge::digest(rom);
        if digest != DIGEST {
            return Err(CartridgeError::HighScoreDigest(digest));
        }
        if let Some(actual) = sram.map(<[u8]>::len).filter(|&len| len != SRAM_SIZE) {
            return Err(CartridgeError::HighScoreSram {
                expected: SRAM_SIZE,
                actual,
            });
        }
        Ok(Self {
            rom: rom.to_vec(),
            sram: sram.map(<[u8]>::to_vec),
        })
    }

    /// Read the ROM and, if present, the SRAM file.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::Io`] if the ROM can't be read or the
    /// SRAM exists but can't be read, or any error from
    /// [`HighScoreCart::load`].
    pub fn from_files(rom: &Path, sram: Option<&Path>) -> Result<Self, CartridgeError> {
        let rom_data = std::fs::read(rom).map_err(|source| io_error(rom, source))?;
        let sram_data = match sram.map(|path| (path, std::fs::read(path))) {
            None => None,
            Some((_, Ok(data))) => Some(data),
            Some((_, Err(e))) if e.kind() == ErrorKind::NotFound => None,
            Some((path, Err(e))) => return Err(io_error(path, e)),
        };
        Self::load(&rom_data, sram_data.as_deref())
    }

    /// Write the SRAM and ROM through the bus.
    pub fn mount(&self, bus: &mut impl Bus) {
        if let Some(sram) = &self.sram {
            for (address, &byte) in (SRAM_START..).zip(sram) {
                bus.write(address, byte);
            }
        }
        for (address, &byte) in (ROM_START..).zip(&self.rom) {
            bus.write(address, byte);
        }
        info!("high score cartridge mounted");
    }

    /// SRAM contents to persist, if the game used the cart this session.
    #[must_use]
    pub fn sram_to_persist(memory: &Memory, high_score_set: bool) -> Option<&[u8]> {
        high_score_set.then(|| memory.slice(SRAM_START, SRAM_SIZE))
    }

    /// Write the SRAM file if the game used the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::Io`] if the file can't be written.
    pub fn save_sram(
        memory: &Memory,
        high_score_set: bool,
        path: &Path,
    ) -> Result<bool, CartridgeError> {
        let Some(sram) = Self::sram_to_persist(memory, high_score_set) else {
            warn!("high score ROM not used; SRAM not saved");
            return Ok(false);
        };
        std::fs::write(path, sram).map_err(|source| io_error(path, source))?;
        info!("high score SRAM saved to {}", path.display());
        Ok(true)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CartridgeError {
    CartridgeError::Io {
        path: path.to_path_buf(),
        source,
    }
}
