//! ProSystem save states.
//!
//! | Offset | Size  | Contents |
//! |--------|-------|----------|
//! | 0      | 16    | `PRO-SYSTEM STATE` |
//! | 16     | 1     | Version (1) |
//! | 17     | 4     | Reserved, zero |
//! | 21     | 32    | Cartridge digest, ASCII hex |
//! | 53     | 7     | A, X, Y, P, S, PCL, PCH |
//! | 60     | 1     | Cartridge bank |
//! | 61     | 16384 | RAM $0000-$3FFF |
//! | 16445  | 16384 | RAM $4000-$7FFF, Supercart-RAM only |
//! | ...    | 8     | RIOT, optional |
//! | ...    | 131073 | XCTRL + expansion module RAM, after the RIOT block |

use std::path::Path;

use atari_sally::Status;
use log::{debug, info, warn};
use mos_riot_6532::SNAPSHOT_SIZE;

use crate::cartridge::{Cartridge, CartridgeType};
use crate::error::StateError;
use crate::prosystem::ProSystem;
use crate::xm;

pub const MAGIC: &[u8; 16] = b"PRO-SYSTEM STATE";
pub const VERSION: u8 = 1;

const HEADER_SIZE: usize = 16 + 1 + 4;
const DIGEST_SIZE: usize = 32;
const REGISTERS_SIZE: usize = 7;
const RAM_SIZE: usize = 16384;
const BASE_SIZE: usize = HEADER_SIZE + DIGEST_SIZE + REGISTERS_SIZE + 1 + RAM_SIZE;

/// State without expansion RAM or RIOT.
pub const SIZE: usize = BASE_SIZE;
/// State with the Supercart-RAM block.
pub const SIZE_EXPANSION: usize = BASE_SIZE + RAM_SIZE;
/// Either of the above plus the RIOT block.
pub const SIZE_RIOT: usize = SIZE + SNAPSHOT_SIZE;
pub const SIZE_EXPANSION_RIOT: usize = SIZE_EXPANSION + SNAPSHOT_SIZE;
/// RIOT states plus the expansion module block.
pub const SIZE_XM: usize = SIZE_RIOT + xm::SNAPSHOT_SIZE;
pub const SIZE_EXPANSION_XM: usize = SIZE_EXPANSION_RIOT + xm::SNAPSHOT_SIZE;

const SIZES: [usize; 6] = [
    SIZE,
    SIZE_EXPANSION,
    SIZE_RIOT,
    SIZE_EXPANSION_RIOT,
    SIZE_XM,
    SIZE_EXPANSION_XM,
];

/// A validated state, borrowing from the input buffer.
struct SaveState<'a> {
    registers: &'a [u8],
    bank: u8,
    ram: &'a [u8],
    expansion: Option<&'a [u8]>,
    riot: Option<[u8; SNAPSHOT_SIZE]>,
    xm: Option<&'a [u8]>,
}

impl<'a> SaveState<'a> {
    fn parse(data: &'a [u8], cartridge: Option<&Cartridge>) -> Result<Self, StateError> {
        let size = data.len();
        if !SIZES.contains(&size) {
            return Err(StateError::Size(size));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(StateError::Magic);
        }
        let cartridge = cartridge.ok_or(StateError::NoCartridge)?;

        let digest = &data[HEADER_SIZE..HEADER_SIZE + DIGEST_SIZE];
        if digest != cartridge.digest().as_bytes() {
            return Err(StateError::DigestMismatch {
                state: String::from_utf8_lossy(digest).into_owned(),
                cartridge: cartridge.digest().to_owned(),
            });
        }

        let has_expansion = matches!(
            size,
            SIZE_EXPANSION | SIZE_EXPANSION_RIOT | SIZE_EXPANSION_XM
        );
        let has_riot = !matches!(size, SIZE | SIZE_EXPANSION);
        let has_xm = matches!(size, SIZE_XM | SIZE_EXPANSION_XM);
        if cartridge.kind() == CartridgeType::SupercartRam && !has_expansion {
            return Err(StateError::MissingExpansionRam);
        }

        let mut offset = HEADER_SIZE + DIGEST_SIZE;
        let registers = &data[offset..offset + REGISTERS_SIZE];
        offset += REGISTERS_SIZE;
        let bank = data[offset];
        offset += 1;
        let ram = &data[offset..offset + RAM_SIZE];
        offset += RAM_SIZE;

        let mut expansion = None;
        if has_expansion {
            if cartridge.kind() == CartridgeType::SupercartRam {
                expansion = Some(&data[offset..offset + RAM_SIZE]);
            } else {
                warn!("save state: ignoring expansion RAM block");
            }
            offset += RAM_SIZE;
        }

        let mut riot = None;
        if has_riot {
            let block: [u8; SNAPSHOT_SIZE] = data[offset..offset + SNAPSHOT_SIZE]
                .try_into()
                .map_err(|_| StateError::Size(size))?;
            riot = Some(block);
            offset += SNAPSHOT_SIZE;
        }

        let xm = match (has_xm, cartridge.xm()) {
            (true, true) => Some(&data[offset..]),
            (true, false) => {
                warn!("save state: ignoring expansion module block");
                None
            }
            (false, true) => {
                warn!("save state: no expansion module block, module starts cleared");
                None
            }
            (false, false) => None,
        };

        Ok(Self {
            registers,
            bank,
            ram,
            expansion,
            riot,
            xm,
        })
    }
}

impl ProSystem {
    /// Serialise the machine. Empty if no cartridge is loaded.
    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        let Some(cartridge) = self.cartridge() else {
            return Vec::new();
        };
        let expansion = cartridge.kind() == CartridgeType::SupercartRam;
        let base = if expansion {
            SIZE_EXPANSION_RIOT
        } else {
            SIZE_RIOT
        };
        let module = self.bus().xm().map_or(0, |_| xm::SNAPSHOT_SIZE);
        let mut data = Vec::with_capacity(base + module);

        data.extend_from_slice(MAGIC);
        data.push(VERSION);
        data.extend_from_slice(&[0; 4]);
        let mut digest = [0u8; DIGEST_SIZE];
        let text = cartridge.digest().as_bytes();
        let len = text.len().min(DIGEST_SIZE);
        digest[..len].copy_from_slice(&text[..len]);
        data.extend_from_slice(&digest);

        let regs = &self.cpu().regs;
        let [pcl, pch] = regs.pc.to_le_bytes();
        data.extend_from_slice(&[regs.a, regs.x, regs.y, regs.p.bits(), regs.s, pcl, pch]);
        data.push(cartridge.bank());

        let memory = &self.bus().memory;
        data.extend_from_slice(memory.slice(0x0000, RAM_SIZE));
        if expansion {
            data.extend_from_slice(memory.slice(0x4000, RAM_SIZE));
        }
        data.extend_from_slice(&self.bus().riot.snapshot());
        if let Some(module) = self.bus().xm() {
            data.extend_from_slice(&module.snapshot());
        }

        debug!("save state: {} bytes", data.len());
        data
    }

    /// Restore a state produced by [`ProSystem::save_state`].
    ///
    /// The state is validated before anything is touched; a rejected state
    /// leaves the machine as it was.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] for a bad size or magic, no cartridge, a
    /// digest that doesn't exactly match the cartridge's, or a Supercart-RAM state
    /// without its RAM block.
    pub fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        let state = SaveState::parse(data, self.cartridge())?;

        self.reset_for_state();

        let regs = &mut self.cpu_mut().regs;
        regs.a = state.registers[0];
        regs.x = state.registers[1];
        regs.y = state.registers[2];
        regs.p = Status::from_bits_retain(state.registers[3]);
        regs.s = state.registers[4];
        regs.pc = u16::from_le_bytes([state.registers[5], state.registers[6]]);

        let bus = self.bus_mut();
        if let Some(cartridge) = &mut bus.cartridge {
            cartridge.store_bank(&mut bus.memory, state.bank);
        }
        bus.memory.load(0x0000, state.ram);
        if let Some(expansion) = state.expansion {
            bus.memory.load(0x4000, expansion);
        }
        if let Some(riot) = &state.riot {
            bus.riot.restore(riot);
        }
        if let (Some(block), Some(module)) = (state.xm, &mut bus.xm) {
            module.restore(block);
        }

        info!("save state loaded ({} bytes)", data.len());
        Ok(())
    }

    /// Run a second of frames with neutral input, then load the state.
    ///
    /// # Errors
    ///
    /// As [`ProSystem::load_state`]. The state is validated before the
    /// warm-up frames run.
    pub fn load_state_warm(&mut self, data: &[u8]) -> Result<(), StateError> {
        SaveState::parse(data, self.cartridge())?;
        self.run_test_frames();
        self.load_state(data)
    }

    /// # Errors
    ///
    /// Returns [`StateError::NoCartridge`] if there is nothing to save, or
    /// [`StateError::Io`] if the file can't be written.
    pub fn save_state_file(&self, path: &Path) -> Result<(), StateError> {
        let data = self.save_state();
        if data.is_empty() {
            return Err(StateError::NoCartridge);
        }
        std::fs::write(path, data).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the file can't be read, or any error
    /// from [`ProSystem::load_state_warm`].
    pub fn load_state_file(&mut self, path: &Path) -> Result<(), StateError> {
        let data = std::fs::read(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_state_warm(&data)
    }
}
