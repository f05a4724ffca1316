//! Top-level Atari 7800 system.
//!
//! Owns the CPU, the bus and the scheduler. A frame is 262 (NTSC) or 312
//! (PAL) scanlines of 454 quarter-cycles; see [`crate::scheduler`].
//!
//! Lifecycle: [`ProSystem::new`] builds an empty machine,
//! [`ProSystem::load_cartridge`] mounts an image and resets, then
//! [`ProSystem::run_frame`] (or [`ProSystem::execute_frame`] with explicit
//! input) advances one frame at a time.

use std::path::Path;

use atari_sally::Sally;
use emu_core::{Observable, Value, parse_address};
use log::{info, warn};

use crate::bios::Bios;
use crate::bus::SystemBus;
use crate::cartridge::{CONTROLLER_LIGHTGUN, Cartridge};
use crate::chips::{IdleMaria, Maria, SilentSound, SoundChip};
use crate::config::Atari7800Config;
use crate::database::Database;
use crate::error::CartridgeError;
use crate::high_score::HighScoreCart;
use crate::input::{InputQueue, InputState};
use crate::lightgun::Lightgun;
use crate::region::Region;
use crate::scheduler::{Scheduler, Timing};
use crate::xm::ExpansionModule;

/// Compatibility flag: cartridge needs cycle stealing off.
const FLAG_NO_CYCLE_STEALING: u32 = 0x01;
/// Compatibility flag: cartridge needs WSYNC off.
const FLAG_NO_WSYNC: u32 = 0x02;

/// Atari 7800 system.
pub struct ProSystem {
    cpu: Sally,
    bus: SystemBus,
    maria: Box<dyn Maria>,
    scheduler: Scheduler,
    lightgun: Lightgun,
    config: Atari7800Config,
    database: Option<Database>,
    high_score: Option<HighScoreCart>,
    /// The high-score cart was mounted at the last reset.
    high_score_mounted: bool,
    /// Controls sampled by [`ProSystem::run_frame`].
    input: InputState,
    input_queue: InputQueue,
    /// Completed frames since power-on.
    frame_count: u64,
}

impl ProSystem {
    /// Build a machine with the stand-in MARIA and sound chips.
    #[must_use]
    pub fn new(config: Atari7800Config) -> Self {
        let maria = IdleMaria::new(config.dma_cost.unwrap_or(IdleMaria::DEFAULT_COST));
        Self::with_chips(
            config,
            Box::new(maria),
            Box::new(SilentSound::new()),
            Box::new(SilentSound::new()),
        )
    }

    /// Build a machine around caller-supplied chips.
    #[must_use]
    pub fn with_chips(
        config: Atari7800Config,
        maria: Box<dyn Maria>,
        tia: Box<dyn SoundChip>,
        pokey: Box<dyn SoundChip>,
    ) -> Self {
        Self {
            cpu: Sally::new(),
            bus: SystemBus::new(tia, pokey),
            maria,
            scheduler: Scheduler::new(Timing::default()),
            lightgun: Lightgun::new(),
            config,
            database: None,
            high_score: None,
            high_score_mounted: false,
            input: InputState::new(),
            input_queue: InputQueue::new(),
            frame_count: 0,
        }
    }

    /// Install a BIOS. Takes effect at the next reset.
    pub fn set_bios(&mut self, bios: Option<Bios>) {
        self.bus.bios = bios;
    }

    /// Install the cartridge database consulted by
    /// [`ProSystem::load_cartridge`].
    pub fn set_database(&mut self, database: Option<Database>) {
        self.database = database;
    }

    /// Install the high-score cartridge. Takes effect at the next reset.
    pub fn set_high_score_cart(&mut self, cart: Option<HighScoreCart>) {
        self.high_score = cart;
    }

    // ========================================================================
    // Cartridge
    // ========================================================================

    /// Release the current cartridge, load a new one, apply the database
    /// and reset.
    ///
    /// # Errors
    ///
    /// Any [`CartridgeError`] from [`Cartridge::load`]. The machine is left
    /// with no cartridge.
    pub fn load_cartridge(&mut self, data: &[u8]) -> Result<(), CartridgeError> {
        self.release_cartridge();
        let mut cartridge = Cartridge::load(data)?;
        if let Some(database) = &self.database {
            database.apply(&mut cartridge);
        }
        info!(
            "loaded {:?}: {}, {:?}",
            cartridge.title(),
            cartridge.kind(),
            cartridge.region()
        );
        self.bus.cartridge = Some(cartridge);
        self.reset();
        Ok(())
    }

    /// Unmount the cartridge and forget the high-score flag.
    pub fn release_cartridge(&mut self) {
        self.bus.cartridge = None;
        self.bus.xm = None;
        self.cpu.clear_high_score();
        self.high_score_mounted = false;
    }

    #[must_use]
    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cartridge.as_ref()
    }

    // ========================================================================
    // Reset
    // ========================================================================

    /// Power-cycle the machine with the current cartridge.
    pub fn reset(&mut self) {
        self.reset_with(false);
    }

    /// Reset ahead of restoring a save state.
    pub(crate) fn reset_for_state(&mut self) {
        self.reset_with(true);
    }

    fn reset_with(&mut self, loading_state: bool) {
        self.cpu.clear();

        let timing = self.timing();
        self.scheduler = Scheduler::new(timing);

        self.bus.tia.reset();
        self.bus.pokey.reset();
        self.bus.memory.reset();
        self.maria.reset();
        self.bus.riot.reset();
        if self.cartridge().is_some_and(Cartridge::xm) {
            self.bus.xm.get_or_insert_with(ExpansionModule::new).reset();
        } else {
            self.bus.xm = None;
        }

        self.bus.bios_enabled =
            self.bus.bios.is_some() && !self.cartridge().is_some_and(Cartridge::disable_bios);
        self.bus.store_boot_image();

        self.high_score_mounted = false;
        if self.config.high_score.mounts(loading_state) && timing.region == Region::Ntsc {
            if let Some(cart) = &self.high_score {
                cart.mount(&mut self.bus);
                self.high_score_mounted = true;
            }
        }

        self.input = InputState::new();
        if let Some(cartridge) = &self.bus.cartridge {
            let (left, right) = cartridge.difficulty_switches();
            self.input.left_difficulty_a = left != 0;
            self.input.right_difficulty_a = right != 0;
            self.input.swap_buttons = cartridge.swap_buttons();
        }
        self.input.lightgun = timing.lightgun;

        let cycles = self.cpu.execute_res(&mut self.bus);
        self.scheduler.set_cycles(cycles);
        info!(
            "reset: PC=${:04X}, {timing:?}, BIOS {}",
            self.cpu.pc(),
            if self.bus.bios_enabled { "on" } else { "off" }
        );
    }

    /// Timing switches for the mounted cartridge under this config.
    fn timing(&self) -> Timing {
        let Some(cartridge) = self.cartridge() else {
            return Timing::default();
        };
        let flags = cartridge.flags();
        let lightgun = cartridge.controllers()[0] == CONTROLLER_LIGHTGUN;
        if lightgun && !self.config.lightgun {
            warn!("cartridge wants a lightgun but lightguns are disabled");
        }
        Timing {
            region: cartridge.region(),
            hblank: cartridge.hblank(),
            wsync: self.config.wsync.resolve(flags & FLAG_NO_WSYNC != 0),
            cycle_stealing: self
                .config
                .cycle_stealing
                .resolve(flags & FLAG_NO_CYCLE_STEALING != 0),
            lightgun: lightgun && self.config.lightgun,
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run one frame with the given controls.
    pub fn execute_frame(&mut self, input: &InputState) {
        input.apply(&mut self.bus.riot, &mut self.bus.memory);
        self.scheduler.execute_frame(
            &mut self.cpu,
            &mut self.bus,
            self.maria.as_mut(),
            &self.lightgun,
        );
        self.frame_count += 1;
    }

    /// Run one frame, first applying any queued input events.
    pub fn run_frame(&mut self) {
        self.input_queue.process(self.frame_count, &mut self.input);
        let input = self.input;
        self.execute_frame(&input);
    }

    /// Run one second of frames with neutral controls.
    pub fn run_test_frames(&mut self) {
        let mut input = InputState::new();
        input.lightgun = self.input.lightgun;
        input.left_difficulty_a = self.input.left_difficulty_a;
        input.right_difficulty_a = self.input.right_difficulty_a;
        for _ in 0..self.region().frequency() {
            self.execute_frame(&input);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn cpu(&self) -> &Sally {
        &self.cpu
    }

    pub(crate) fn cpu_mut(&mut self) -> &mut Sally {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// Mutable bus access, for poking memory from tests and tools.
    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> &Atari7800Config {
        &self.config
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.scheduler.timing().region
    }

    /// Frames per second for presentation: the config override, or the
    /// region's rate.
    #[must_use]
    pub fn frame_rate(&self) -> u16 {
        self.config
            .frame_rate
            .unwrap_or_else(|| self.region().frequency())
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Controls used by [`ProSystem::run_frame`].
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn input_queue_mut(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }

    pub fn lightgun_mut(&mut self) -> &mut Lightgun {
        &mut self.lightgun
    }

    #[must_use]
    pub fn high_score_mounted(&self) -> bool {
        self.high_score_mounted
    }

    /// High-score SRAM to write back, if the cart is mounted and the game
    /// used it.
    #[must_use]
    pub fn high_score_sram(&self) -> Option<&[u8]> {
        if !self.high_score_mounted {
            return None;
        }
        HighScoreCart::sram_to_persist(&self.bus.memory, self.cpu.high_score_set())
    }

    /// Write the high-score SRAM if the cart is mounted and the game used
    /// it. Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::Io`] if the file can't be written.
    pub fn save_high_score_sram(&self, path: &Path) -> Result<bool, CartridgeError> {
        if !self.high_score_mounted {
            return Ok(false);
        }
        HighScoreCart::save_sram(&self.bus.memory, self.cpu.high_score_set(), path)
    }
}

impl Observable for ProSystem {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            return self.cpu.query(rest);
        }
        if let Some(rest) = path.strip_prefix("riot.") {
            return self.bus.riot.query(rest);
        }
        if let Some(rest) = path.strip_prefix("memory.") {
            return parse_address(rest).map(|addr| self.bus.peek(addr).into());
        }
        match path {
            "frame" => Some(self.frame_count.into()),
            "scheduler.cycles" => Some(self.scheduler.cycles().into()),
            "scheduler.scanline" => Some(self.scheduler.scanline().into()),
            "scheduler.frame" => Some(self.scheduler.frame().into()),
            "scheduler.wsync" => Some(self.scheduler.timing().wsync.into()),
            "scheduler.cycle_stealing" => Some(self.scheduler.timing().cycle_stealing.into()),
            "cartridge.type" => self.cartridge().map(|c| c.kind().to_string().into()),
            "cartridge.bank" => self.cartridge().map(|c| c.bank().into()),
            "cartridge.digest" => self.cartridge().map(|c| c.digest().into()),
            "high_score.mounted" => Some(self.high_score_mounted.into()),
            "xm.xctrl" => self.bus.xm().map(|xm| xm.xctrl().into()),
            "xm.bank" => self.bus.xm().map(|xm| xm.bank().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<reg>",
            "riot.<reg>",
            "memory.<address>",
            "frame",
            "scheduler.cycles",
            "scheduler.scanline",
            "scheduler.frame",
            "scheduler.wsync",
            "scheduler.cycle_stealing",
            "cartridge.type",
            "cartridge.bank",
            "cartridge.digest",
            "high_score.mounted",
            "xm.xctrl",
            "xm.bank",
        ]
    }
}
