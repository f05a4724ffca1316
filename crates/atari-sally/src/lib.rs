//! The Atari 7800 "Sally" CPU.
//!
//! Sally is a 6502C with a HALT line that MARIA uses to steal the bus.
//! This core is instruction-stepped: [`Sally::step`](emu_core::Cpu::step)
//! runs one whole instruction and returns its cost from a fixed 256-entry
//! cycle table plus any page-crossing or branch penalty. The frame
//! scheduler multiplies that by four to get MARIA clocks.
//!
//! Only the 151 documented opcodes do anything. The rest cost what the
//! table says (zero for most) and leave the machine untouched.

mod addressing;
mod cycles;
pub mod flags;
mod registers;
mod sally;

pub use cycles::{
    CYCLES, HIGH_SCORE_ENTRY_POINTS, INPT4, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR,
};
pub use flags::Status;
pub use registers::Registers;
pub use sally::Sally;
