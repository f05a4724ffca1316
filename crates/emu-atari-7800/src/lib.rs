//! Cycle-counted Atari 7800 (ProSystem) core.
//!
//! The 7800 runs a 6502C ("Sally") at 1.79 MHz beside MARIA, which takes
//! the bus for display-list DMA once per scanline. Timing is tracked in
//! quarter-CPU cycles, 454 per scanline:
//!
//! | Region | Scanlines | Display area | Frames/s |
//! |--------|-----------|--------------|----------|
//! | NTSC   | 262       | 16-258       | 60       |
//! | PAL    | 312       | 16-308       | 50       |
//!
//! MARIA rendering and the TIA/POKEY sound generators sit behind the
//! [`Maria`] and [`SoundChip`] traits; the stand-ins in [`chips`] keep the
//! timing right without producing pixels or samples.

pub mod bios;
pub mod bus;
pub mod cartridge;
pub mod chips;
pub mod config;
pub mod database;
mod error;
pub mod high_score;
pub mod input;
pub mod lightgun;
pub mod memory;
mod prosystem;
pub mod region;
pub mod savestate;
pub mod scheduler;
pub mod xm;

pub use bios::Bios;
pub use bus::SystemBus;
pub use cartridge::{Cartridge, CartridgeType};
pub use chips::{IdleMaria, Maria, ScanlineDma, SilentSound, SoundChip};
pub use config::{Atari7800Config, FeatureMode, HighScoreMode};
pub use database::{Database, DatabaseEntry};
pub use error::{CartridgeError, ConfigError, DatabaseError, StateError};
pub use high_score::HighScoreCart;
pub use input::{Button, InputQueue, InputState};
pub use lightgun::Lightgun;
pub use prosystem::ProSystem;
pub use region::Region;
pub use scheduler::{CYCLES_PER_SCANLINE, FrameStats, Scheduler, Timing};
pub use xm::ExpansionModule;
