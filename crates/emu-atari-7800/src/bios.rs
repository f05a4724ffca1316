//! The optional 7800 BIOS ROM.

use std::path::Path;

use log::info;

use crate::cartridge;
use crate::error::CartridgeError;
use crate::memory::Memory;

/// A BIOS image, mapped at the top of memory in place of the cartridge
/// until the BIOS hands over via INPTCTRL.
#[derive(Debug, Clone)]
pub struct Bios {
    image: Vec<u8>,
    digest: String,
}

impl Bios {
    /// # Errors
    ///
    /// Returns [`CartridgeError::BiosSize`] for an empty image or one
    /// larger than the address space.
    pub fn load(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.is_empty() || data.len() > 0x1_0000 {
            return Err(CartridgeError::BiosSize(data.len()));
        }
        let digest = cartridge::digest(data);
        info!("BIOS: {} bytes, digest {digest}", data.len());
        Ok(Self {
            image: data.to_vec(),
            digest,
        })
    }

    /// # Errors
    ///
    /// Returns [`CartridgeError::Io`] if the file can't be read.
    pub fn from_file(path: &Path) -> Result<Self, CartridgeError> {
        let data = std::fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&data)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.image.len()
    }

    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Map the image ROM-protected so it ends at $FFFF.
    pub fn store(&self, memory: &mut Memory) {
        if let Ok(address) = u16::try_from(0x1_0000 - self.image.len()) {
            memory.write_rom(address, &self.image);
        }
    }
}
