//! Lightgun sensor emulation.
//!
//! The gun's photodiode pulls INPT4 bit 7 low while the beam is under
//! the crosshair. The scheduler strobes [`Lightgun::strobe`] at several
//! points per scanline with its current position; the target is set from
//! a normalised screen position with [`Lightgun::aim`].

use crate::memory::{INPT4, Memory};
use crate::region::Region;
use crate::scheduler::CYCLES_PER_SCANLINE;

/// Quarter-cycles of horizontal blank before the first visible pixel.
pub const HBLANK_CYCLES: f64 = 136.0;
/// Offset from the end of HBLANK to the left edge of the picture.
pub const PICTURE_INDENT: f64 = 52.0;
/// Quarter-cycles spanned by the visible picture.
pub const PICTURE_CYCLES: f64 = 318.0;
/// Lines in the output picture the aim is normalised over.
pub const PICTURE_LINES: f64 = 240.0;
/// Lines below the target the sensor keeps seeing the beam.
const SENSOR_LINES: i32 = 3;

/// Lightgun target position. The line is whole; the cycle keeps its
/// fraction but is compared truncated.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Lightgun {
    scanline: i32,
    cycle: f64,
}

impl Lightgun {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the gun at `(x, y)`, each 0.0..=1.0 across the output
    /// picture.
    pub fn aim(&mut self, x: f64, y: f64, region: Region) {
        let visible = region.visible_area();
        let display = region.display_area();
        let first_line = f64::from(visible.top - display.top + 1);
        self.scanline =
            (y * PICTURE_LINES + first_line + f64::from(region.lightgun_offset())) as i32;
        self.cycle = HBLANK_CYCLES + PICTURE_INDENT + x * PICTURE_CYCLES;
        let line = f64::from(CYCLES_PER_SCANLINE);
        if self.cycle > line {
            self.scanline += 1;
            self.cycle -= line;
        }
    }

    /// Set the target directly in scanlines and quarter-cycles.
    pub fn set_target(&mut self, scanline: i32, cycle: f64) {
        self.scanline = scanline;
        self.cycle = cycle;
    }

    /// Target as (scanline, quarter-cycle).
    #[must_use]
    pub fn target(&self) -> (i32, f64) {
        (self.scanline, self.cycle)
    }

    /// Whether the beam at `(scanline, cycles)` is in front of the sensor.
    #[must_use]
    pub fn sees_beam(&self, scanline: u16, cycles: u32) -> bool {
        let scanline = i32::from(scanline);
        scanline >= self.scanline
            && scanline <= self.scanline + SENSOR_LINES
            && i64::from(cycles) >= self.cycle as i64 - 1
    }

    /// Update INPT4 for the current beam position: bit 7 low while the
    /// sensor sees the beam, high otherwise.
    pub fn strobe(&self, scanline: u16, cycles: u32, memory: &mut Memory) {
        let latch = memory.read(INPT4);
        if self.sees_beam(scanline, cycles) {
            memory.poke(INPT4, latch & 0x7F);
        } else {
            memory.poke(INPT4, latch | 0x80);
        }
    }
}
