//! Frame scheduler: interleaves Sally with MARIA one scanline at a time.
//!
//! The counter runs in quarter-CPU-cycle units (one instruction cycle is
//! 4 units, 454 units per scanline). Each scanline:
//!
//! 1. MSTAT tracks VBLANK at the display area edges.
//! 2. The counter is wrapped (or zeroed, when MARIA steals cycles).
//! 3. The CPU runs until the HBLANK threshold or a WSYNC write.
//! 4. MARIA renders the line; with cycle stealing its DMA time is charged
//!    to the counter and the RIOT.
//! 5. The CPU runs to the end of the line unless WSYNC already halted it.
//! 6. A WSYNC halt credits the RIOT with the skipped time.
//! 7. The TIA and POKEY get two sample clocks.
//!
//! The lightgun sensor is re-evaluated after every instruction.

use atari_sally::Sally;
use emu_core::Cpu;
use log::trace;

use crate::bus::SystemBus;
use crate::chips::Maria;
use crate::lightgun::Lightgun;
use crate::memory::{CTRL, CTRL_DMA_MASK, CTRL_DMA_ON, MSTAT};
use crate::region::{Area, Region};

/// Quarter-cycles per scanline.
pub const CYCLES_PER_SCANLINE: u32 = 454;
/// MSTAT value during VBLANK.
const MSTAT_VBLANK: u8 = 0x80;
/// Sample clocks fed to each sound chip per scanline.
const SOUND_CYCLES_PER_SCANLINE: u32 = 2;

/// Per-frame timing switches, fixed at reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub region: Region,
    /// CPU time before MARIA takes the bus, in quarter-cycles.
    pub hblank: u32,
    pub wsync: bool,
    pub cycle_stealing: bool,
    /// A lightgun is plugged into port 0.
    pub lightgun: bool,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            region: Region::Ntsc,
            hblank: crate::cartridge::DEFAULT_HBLANK,
            wsync: true,
            cycle_stealing: true,
            lightgun: false,
        }
    }
}

/// Counters from the most recent frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub instructions: u64,
    /// Scanlines the CPU spent halted on WSYNC.
    pub wsync_halts: u32,
    /// Quarter-cycles MARIA stole from the CPU.
    pub dma_cycles: u32,
    /// Display-list interrupts raised.
    pub dlis: u32,
}

/// Scheduler state carried between scanlines and frames.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timing: Timing,
    display: Area,
    cycles: u32,
    /// Counter remainder discarded when a DMA line zeroed it.
    extra_cycles: u32,
    scanline: u16,
    frame: u16,
    stats: FrameStats,
}

impl Scheduler {
    #[must_use]
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            display: timing.region.display_area(),
            cycles: 0,
            extra_cycles: 0,
            scanline: 0,
            frame: 0,
            stats: FrameStats::default(),
        }
    }

    #[must_use]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Quarter-cycle counter within the current scanline.
    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Seed the counter, e.g. with the RESET sequence's cost.
    pub fn set_cycles(&mut self, cycles: u32) {
        self.cycles = cycles;
    }

    #[must_use]
    pub fn extra_cycles(&self) -> u32 {
        self.extra_cycles
    }

    /// Last scanline executed, 1-based.
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Frame counter, wrapping at the region's frame rate.
    #[must_use]
    pub fn frame(&self) -> u16 {
        self.frame
    }

    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Run one instruction and account for it.
    fn step(&mut self, cpu: &mut Sally, bus: &mut SystemBus) -> u32 {
        let cycles = cpu.step(bus);
        self.cycles += cycles << 2;
        if cpu.half_cycle() {
            self.cycles += 2;
        }
        self.stats.instructions += 1;
        cycles
    }

    fn update_riot(bus: &mut SystemBus, cycles: u32) {
        if bus.riot.is_timing() {
            bus.riot.update_timer(cycles);
        }
    }

    fn strobe(&self, gun: Option<&Lightgun>, bus: &mut SystemBus) {
        if let Some(gun) = gun {
            gun.strobe(self.scanline, self.cycles, &mut bus.memory);
        }
    }

    fn take_wsync(&mut self, bus: &mut SystemBus) -> bool {
        if self.timing.wsync && bus.take_wsync() {
            trace!("scanline {}: WSYNC at {}", self.scanline, self.cycles);
            self.stats.wsync_halts += 1;
            true
        } else {
            false
        }
    }

    /// Run one frame. Input must already be applied to the bus.
    pub fn execute_frame(
        &mut self,
        cpu: &mut Sally,
        bus: &mut SystemBus,
        maria: &mut dyn Maria,
        lightgun: &Lightgun,
    ) {
        self.stats = FrameStats::default();
        let pokey = bus.pokey_active();
        if pokey {
            bus.pokey.frame();
        }

        // The sensor is only strobed on frames that start with DMA off.
        let gun = (self.timing.lightgun && !Self::dma_enabled(bus)).then_some(lightgun);
        for scanline in 1..=self.timing.region.scanlines() {
            self.execute_scanline(scanline, cpu, bus, maria, gun, pokey);
        }

        self.frame += 1;
        if self.frame >= self.timing.region.frequency() {
            self.frame = 0;
        }
    }

    fn dma_enabled(bus: &SystemBus) -> bool {
        bus.memory.read(CTRL) & CTRL_DMA_MASK == CTRL_DMA_ON
    }

    fn execute_scanline(
        &mut self,
        scanline: u16,
        cpu: &mut Sally,
        bus: &mut SystemBus,
        maria: &mut dyn Maria,
        gun: Option<&Lightgun>,
        pokey: bool,
    ) {
        self.scanline = scanline;
        if scanline == self.display.top {
            bus.memory.poke(MSTAT, 0);
        }
        if scanline == self.display.bottom {
            bus.memory.poke(MSTAT, MSTAT_VBLANK);
        }

        if self.timing.cycle_stealing && Self::dma_enabled(bus) {
            self.extra_cycles = self.cycles % CYCLES_PER_SCANLINE;
            self.cycles = 0;
        } else {
            self.cycles %= CYCLES_PER_SCANLINE;
            self.extra_cycles = 0;
        }

        self.strobe(gun, bus);

        let mut halted = false;
        while self.cycles < self.timing.hblank {
            let cycles = self.step(cpu, bus);
            Self::update_riot(bus, cycles);
            self.strobe(gun, bus);
            if self.take_wsync(bus) {
                halted = true;
                break;
            }
        }

        let rendered = maria.render_scanline(scanline, &bus.memory);
        if rendered.dli {
            self.stats.dlis += 1;
            cpu.execute_nmi(bus);
        }
        if self.timing.cycle_stealing {
            self.cycles += rendered.cycles;
            self.stats.dma_cycles += rendered.cycles;
            Self::update_riot(bus, rendered.cycles >> 2);
        }

        while !halted && self.cycles < CYCLES_PER_SCANLINE {
            let cycles = self.step(cpu, bus);
            self.strobe(gun, bus);
            Self::update_riot(bus, cycles);
            if self.take_wsync(bus) {
                halted = true;
            }
        }

        if halted && self.cycles < CYCLES_PER_SCANLINE {
            Self::update_riot(bus, (CYCLES_PER_SCANLINE - self.cycles) >> 2);
            self.cycles = CYCLES_PER_SCANLINE;
        }

        self.strobe(gun, bus);

        bus.tia.process(SOUND_CYCLES_PER_SCANLINE);
        if pokey {
            bus.pokey.process(SOUND_CYCLES_PER_SCANLINE);
            bus.pokey.scanline();
        }
    }
}
