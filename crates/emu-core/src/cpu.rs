//! Instruction-stepped CPU trait.

use crate::Bus;

/// A CPU that executes whole instructions.
///
/// The 7800 scheduler interleaves the CPU with the display chip at
/// instruction granularity, so the CPU reports how many cycles each
/// instruction took rather than being ticked cycle by cycle.
///
/// The bus is passed in, not owned, so the machine can keep the CPU and
/// the memory map as separate fields.
pub trait Cpu<B: Bus> {
    /// Execute one instruction. Returns cycles consumed.
    fn step(&mut self, bus: &mut B) -> u32;

    /// Run the RESET sequence. Returns cycles consumed.
    fn reset(&mut self, bus: &mut B) -> u32;

    /// Signal a maskable interrupt. Returns cycles consumed.
    fn interrupt(&mut self, bus: &mut B) -> u32;

    /// Signal a non-maskable interrupt. Returns cycles consumed.
    fn nmi(&mut self, bus: &mut B) -> u32;

    /// Current program counter.
    fn pc(&self) -> u16;
}
