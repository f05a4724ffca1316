//! Interfaces to the chips the scheduler drives but this crate does not
//! emulate: MARIA, the TIA sound channels and the cartridge POKEY.
//!
//! The stand-ins here keep timing honest without producing pixels or
//! samples.

use crate::memory::{CTRL, CTRL_DMA_MASK, CTRL_DMA_ON, MSTAT, Memory};

/// What MARIA did on one scanline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineDma {
    /// Bus cycles taken from the CPU, in quarter-CPU units (the same units
    /// as the scheduler's scanline counter).
    pub cycles: u32,
    /// A display-list interrupt is due; the scheduler raises NMI.
    pub dli: bool,
}

/// The display chip.
pub trait Maria {
    fn reset(&mut self);

    /// Render one scanline from the display lists in `memory`.
    fn render_scanline(&mut self, scanline: u16, memory: &Memory) -> ScanlineDma;
}

/// A sound generator fed from the scanline loop.
pub trait SoundChip {
    fn reset(&mut self);

    fn write(&mut self, register: u8, value: u8);

    fn read(&mut self, register: u8) -> u8;

    /// Advance by `cycles` sample clocks.
    fn process(&mut self, cycles: u32);

    /// Start of a frame.
    fn frame(&mut self) {}

    /// End of a scanline.
    fn scanline(&mut self) {}
}

/// MARIA stand-in: charges a fixed DMA cost on lines outside VBLANK
/// while DMA is on, and never interrupts.
#[derive(Debug, Clone)]
pub struct IdleMaria {
    cost: u32,
    lines: u64,
}

impl Default for IdleMaria {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST)
    }
}

impl IdleMaria {
    /// Quarter-cycles charged per DMA line by default.
    pub const DEFAULT_COST: u32 = 28;

    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost, lines: 0 }
    }

    /// Lines on which DMA was charged since reset.
    #[must_use]
    pub fn dma_lines(&self) -> u64 {
        self.lines
    }
}

impl Maria for IdleMaria {
    fn reset(&mut self) {
        self.lines = 0;
    }

    fn render_scanline(&mut self, _scanline: u16, memory: &Memory) -> ScanlineDma {
        let dma_on = memory.read(CTRL) & CTRL_DMA_MASK == CTRL_DMA_ON;
        let vblank = memory.read(MSTAT) & 0x80 != 0;
        if dma_on && !vblank {
            self.lines += 1;
            ScanlineDma {
                cycles: self.cost,
                dli: false,
            }
        } else {
            ScanlineDma::default()
        }
    }
}

/// Sound stand-in: keeps its registers and counts the clocks it was fed.
#[derive(Debug, Clone, Default)]
pub struct SilentSound {
    registers: [u8; 16],
    cycles: u64,
    frames: u64,
    scanlines: u64,
}

impl SilentSound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn scanlines(&self) -> u64 {
        self.scanlines
    }

    #[must_use]
    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register & 0x0F)]
    }
}

impl SoundChip for SilentSound {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn write(&mut self, register: u8, value: u8) {
        self.registers[usize::from(register & 0x0F)] = value;
    }

    fn read(&mut self, register: u8) -> u8 {
        self.register(register)
    }

    fn process(&mut self, cycles: u32) {
        self.cycles += u64::from(cycles);
    }

    fn frame(&mut self) {
        self.frames += 1;
    }

    fn scanline(&mut self) {
        self.scanlines += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_maria_charges_only_with_dma_on() {
        let mut maria = IdleMaria::new(40);
        let mut memory = Memory::new();
        assert_eq!(maria.render_scanline(100, &memory).cycles, 0);

        memory.poke(CTRL, 0x40);
        assert_eq!(maria.render_scanline(100, &memory).cycles, 40);
        memory.poke(MSTAT, 0x80);
        assert_eq!(maria.render_scanline(5, &memory).cycles, 0, "in VBLANK");
        assert_eq!(maria.dma_lines(), 1);
        memory.poke(MSTAT, 0x00);

        memory.poke(CTRL, 0x60);
        assert_eq!(maria.render_scanline(100, &memory).cycles, 0);
    }

    #[test]
    fn silent_sound_counts() {
        let mut sound = SilentSound::new();
        sound.write(0x13, 0x5A);
        sound.process(2);
        sound.process(2);
        sound.scanline();
        assert_eq!(sound.read(3), 0x5A);
        assert_eq!(sound.cycles(), 4);
        assert_eq!(sound.scanlines(), 1);
        sound.reset();
        assert_eq!(sound.cycles(), 0);
    }
}
