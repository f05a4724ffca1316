//! MOS 6532 RAM-I/O-Timer (RIOT).
//!
//! The 7800 uses the RIOT's two 8-bit ports for the joysticks (port A)
//! and the console switches (port B), plus its interval timer. Its 128
//! bytes of RAM are not wired on the 7800.
//!
//! The timer is driven in batches: the frame scheduler calls
//! [`Riot6532::update_timer`] with the CPU cycles each instruction took.
//!
//! # Registers ($0280-$029F)
//!
//! | Addr  | Name   | Description                                |
//! |-------|--------|--------------------------------------------|
//! | $0280 | SWCHA  | Port A data (joysticks)                    |
//! | $0281 | CTLSWA | Port A data direction (1 = output)         |
//! | $0282 | SWCHB  | Port B data (console switches)             |
//! | $0283 | CTLSWB | Port B data direction                      |
//! | $0284 | INTIM  | Timer value (read clears the timer flag)   |
//! | $0285 | INTFLG | Timer flag in bit 7 (read clears it)       |
//! | $0294 | TIM1T  | Start timer, 1 cycle per interval          |
//! | $0295 | TIM8T  | Start timer, 8 cycles per interval         |
//! | $0296 | TIM64T | Start timer, 64 cycles per interval        |
//! | $0297 | T1024T | Start timer, 1024 cycles per interval      |

use emu_core::{Observable, Value};
use log::trace;

pub const SWCHA: u16 = 0x0280;
pub const CTLSWA: u16 = 0x0281;
pub const SWCHB: u16 = 0x0282;
pub const CTLSWB: u16 = 0x0283;
pub const INTIM: u16 = 0x0284;
pub const INTFLG: u16 = 0x0285;
pub const TIM1T: u16 = 0x0294;
pub const TIM8T: u16 = 0x0295;
pub const TIM64T: u16 = 0x0296;
pub const T1024T: u16 = 0x0297;

/// Timer flag bit in INTFLG.
const TIMER_FLAG: u8 = 0x80;

/// Bytes produced by [`Riot6532::snapshot`].
pub const SNAPSHOT_SIZE: usize = 8;

/// MOS 6532 RIOT.
#[derive(Debug, Clone)]
pub struct Riot6532 {
    /// Port A output latch.
    port_a: u8,
    /// Port A data direction (1 = output).
    ddr_a: u8,
    /// Port B output latch.
    port_b: u8,
    /// Port B data direction.
    ddr_b: u8,
    /// Levels driven onto port A by the joysticks (active low).
    pub external_a: u8,
    /// Levels driven onto port B by the console switches.
    pub external_b: u8,

    /// Register that started the timer (TIM1T..T1024T).
    timer: u16,
    /// Interval count written to the timer register.
    intervals: u8,
    /// Prescaler: CPU cycles per interval.
    clocks: u16,
    /// Timer is counting.
    timing: bool,
    /// Cycles left until expiry; negative after it.
    current_time: i32,
    /// Timer has reached zero since the last write.
    elapsed: bool,
    /// Visible INTIM value.
    intim: u8,
    /// Visible INTFLG value.
    intflg: u8,
}

impl Default for Riot6532 {
    fn default() -> Self {
        Self::new()
    }
}

impl Riot6532 {
    /// Create a RIOT in its power-on state with nothing pressed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            port_a: 0,
            ddr_a: 0,
            port_b: 0,
            ddr_b: 0,
            external_a: 0xFF,
            external_b: 0xFF,
            timer: T1024T,
            intervals: 0,
            clocks: 1024,
            timing: false,
            current_time: 0,
            elapsed: false,
            intim: 0,
            intflg: 0,
        }
    }

    /// Return to the power-on state, keeping the external input levels.
    pub fn reset(&mut self) {
        let (external_a, external_b) = (self.external_a, self.external_b);
        *self = Self::new();
        self.external_a = external_a;
        self.external_b = external_b;
    }

    /// Read a register. Reading INTIM or INTFLG clears the timer flag.
    pub fn read(&mut self, address: u16) -> u8 {
        let value = self.peek(address);
        if Self::is_timer_read(address) {
            self.intflg &= !TIMER_FLAG;
        }
        value
    }

    /// Read a register without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        match address & 0x1F {
            0x00 => (self.port_a & self.ddr_a) | (self.external_a & !self.ddr_a),
            0x01 => self.ddr_a,
            0x02 => (self.port_b & self.ddr_b) | (self.external_b & !self.ddr_b),
            0x03 => self.ddr_b,
            reg if reg & 0x05 == 0x04 => self.intim,
            reg if reg & 0x05 == 0x05 => self.intflg,
            _ => 0,
        }
    }

    fn is_timer_read(address: u16) -> bool {
        address & 0x04 != 0
    }

    /// Write a register.
    pub fn write(&mut self, address: u16, value: u8) {
        match address & 0x1F {
            0x00 => self.port_a = value,
            0x01 => self.ddr_a = value,
            0x02 => self.port_b = value,
            0x03 => self.ddr_b = value,
            0x14..=0x17 => self.start_timer(0x0280 | (address & 0x1F), value),
            _ => {}
        }
    }

    fn start_timer(&mut self, timer: u16, intervals: u8) {
        self.timer = timer;
        self.intervals = intervals;
        self.clocks = Self::prescaler(timer);
        self.timing = true;
        self.current_time = i32::from(self.clocks) * i32::from(intervals);
        self.elapsed = false;
        self.intim = intervals;
        self.intflg &= !TIMER_FLAG;
        trace!("RIOT timer ${timer:04X} x{intervals}");
    }

    fn prescaler(timer: u16) -> u16 {
        match timer {
            TIM1T => 1,
            TIM8T => 8,
            TIM64T => 64,
            _ => 1024,
        }
    }

    /// True while the timer is counting and needs [`Self::update_timer`].
    #[must_use]
    pub fn is_timing(&self) -> bool {
        self.timing
    }

    /// Advance the timer by `cycles` CPU cycles.
    ///
    /// Before expiry INTIM shows the remaining intervals. On expiry INTIM
    /// reads 0 and INTFLG bit 7 is set; afterwards INTIM counts down once
    /// per cycle from $FF. The timer stops once it has run 255 cycles past
    /// expiry.
    pub fn update_timer(&mut self, cycles: u32) {
        if !self.timing {
            return;
        }
        self.current_time -= i32::try_from(cycles).unwrap_or(i32::MAX);

        if !self.elapsed && self.current_time > 0 {
            let remaining = self.current_time / i32::from(self.clocks);
            self.intim = remaining as u8;
        } else if self.elapsed {
            if self.current_time >= -255 {
                self.intim = self.current_time as u8;
            } else {
                self.intim = 0;
                self.timing = false;
            }
        } else {
            self.intim = 0;
            self.intflg |= TIMER_FLAG;
            self.elapsed = true;
        }
    }

    /// Serialise the timer and direction registers.
    ///
    /// Layout: DDRA, DDRB, timing, timer register (big-endian), intervals,
    /// prescaler (big-endian).
    #[must_use]
    pub fn snapshot(&self) -> [u8; SNAPSHOT_SIZE] {
        let [timer_hi, timer_lo] = self.timer.to_be_bytes();
        let [clocks_hi, clocks_lo] = self.clocks.to_be_bytes();
        [
            self.ddr_a,
            self.ddr_b,
            u8::from(self.timing),
            timer_hi,
            timer_lo,
            self.intervals,
            clocks_hi,
            clocks_lo,
        ]
    }

    /// Restore from [`Self::snapshot`] output. The countdown restarts from
    /// the stored interval count.
    pub fn restore(&mut self, data: &[u8; SNAPSHOT_SIZE]) {
        self.ddr_a = data[0];
        self.ddr_b = data[1];
        self.timing = data[2] != 0;
        self.timer = u16::from_be_bytes([data[3], data[4]]);
        self.intervals = data[5];
        self.clocks = u16::from_be_bytes([data[6], data[7]]).max(1);
        self.current_time = i32::from(self.clocks) * i32::from(self.intervals);
        self.elapsed = false;
        self.intim = self.intervals;
        self.intflg = 0;
    }

    /// Port B data direction (CTLSWB).
    #[must_use]
    pub fn ddr_b(&self) -> u8 {
        self.ddr_b
    }

    /// Port B output latch, before the direction mask.
    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        self.port_b
    }

    /// Current INTIM value.
    #[must_use]
    pub fn intim(&self) -> u8 {
        self.intim
    }

    /// Current INTFLG value.
    #[must_use]
    pub fn intflg(&self) -> u8 {
        self.intflg
    }
}

impl Observable for Riot6532 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "swcha" => Some(self.peek(SWCHA).into()),
            "swchb" => Some(self.peek(SWCHB).into()),
            "ctlswa" => Some(self.ddr_a.into()),
            "ctlswb" => Some(self.ddr_b.into()),
            "intim" => Some(self.intim.into()),
            "intflg" => Some(self.intflg.into()),
            "timer.running" => Some(self.timing.into()),
            "timer.register" => Some(self.timer.into()),
            "timer.clocks" => Some(u32::from(self.clocks).into()),
            "timer.elapsed" => Some(self.elapsed.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "swcha",
            "swchb",
            "ctlswa",
            "ctlswb",
            "intim",
            "intflg",
            "timer.running",
            "timer.register",
            "timer.clocks",
            "timer.elapsed",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_counts_intervals() {
        let mut riot = Riot6532::new();
        riot.write(TIM8T, 10);
        assert!(riot.is_timing());
        assert_eq!(riot.intim(), 10);

        riot.update_timer(8);
        assert_eq!(riot.intim(), 9);
        riot.update_timer(7);
        assert_eq!(riot.intim(), 8, "65 cycles left is 8 whole intervals");
        assert_eq!(riot.intflg() & TIMER_FLAG, 0);
    }

    #[test]
    fn timer_expiry_sets_flag_then_free_runs() {
        let mut riot = Riot6532::new();
        riot.write(TIM1T, 4);
        riot.update_timer(4);
        assert_eq!(riot.intim(), 0);
        assert_ne!(riot.intflg() & TIMER_FLAG, 0);

        riot.update_timer(1);
        assert_eq!(riot.intim(), 0xFF);
        riot.update_timer(2);
        assert_eq!(riot.intim(), 0xFD);
        assert!(riot.is_timing());
    }

    #[test]
    fn timer_stops_after_running_out() {
        let mut riot = Riot6532::new();
        riot.write(TIM1T, 1);
        riot.update_timer(1);
        riot.update_timer(300);
        assert!(!riot.is_timing());
        assert_eq!(riot.intim(), 0);

        // Further updates are ignored.
        riot.update_timer(5);
        assert_eq!(riot.intim(), 0);
    }

    #[test]
    fn reading_intim_clears_flag() {
        let mut riot = Riot6532::new();
        riot.write(T1024T, 1);
        riot.update_timer(1024);
        assert_eq!(riot.read(INTFLG) & TIMER_FLAG, TIMER_FLAG);
        assert_eq!(riot.read(INTFLG) & TIMER_FLAG, 0);

        riot.write(TIM64T, 1);
        riot.update_timer(64);
        assert_eq!(riot.peek(INTFLG) & TIMER_FLAG, TIMER_FLAG);
        riot.read(INTIM);
        assert_eq!(riot.peek(INTFLG) & TIMER_FLAG, 0);
    }

    #[test]
    fn ports_mix_output_and_input_by_direction() {
        let mut riot = Riot6532::new();
        riot.external_a = 0b1010_1111;
        assert_eq!(riot.read(SWCHA), 0b1010_1111);

        riot.write(CTLSWA, 0x0F);
        riot.write(SWCHA, 0x00);
        assert_eq!(riot.read(SWCHA), 0b1010_0000);

        riot.external_b = 0x3F;
        riot.write(CTLSWB, 0x14);
        riot.write(SWCHB, 0x14);
        assert_eq!(riot.read(SWCHB), 0x3F);
        assert_eq!(riot.read(CTLSWB), 0x14);
    }

    #[test]
    fn snapshot_layout_and_restore() {
        let mut riot = Riot6532::new();
        riot.write(CTLSWA, 0xF0);
        riot.write(T1024T, 3);

        let data = riot.snapshot();
        assert_eq!(data, [0xF0, 0x00, 1, 0x02, 0x97, 3, 0x04, 0x00]);

        let mut restored = Riot6532::new();
        restored.restore(&data);
        assert!(restored.is_timing());
        assert_eq!(restored.intim(), 3);
        restored.update_timer(1024);
        assert_eq!(restored.intim(), 2);
    }

    #[test]
    fn reset_keeps_inputs() {
        let mut riot = Riot6532::new();
        riot.external_b = 0x3E;
        riot.write(TIM8T, 5);
        riot.reset();
        assert!(!riot.is_timing());
        assert_eq!(riot.peek(SWCHB), 0x3E);
    }
}
