//! Core traits for the Atari 7800 emulator.
//!
//! The machine is stepped one CPU instruction at a time. Every component
//! talks to memory through [`Bus`], and every component can be inspected
//! through [`Observable`] without disturbing emulation state.

mod bus;
mod cpu;
mod observable;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value, parse_address};
