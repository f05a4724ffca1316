//! Sally addressing modes.
//!
//! Each resolver fetches its operand bytes through PC and returns the
//! effective address. Indexed modes do not charge the page-crossing cycle
//! themselves; read instructions call [`Sally::delay`] so stores and
//! read-modify-write instructions stay at their table cost.

use emu_core::Bus;

use crate::Sally;

impl Sally {
    /// Fetch the byte at PC and increment PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian word at PC.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a little-endian word. No page wrap: `$xxFF` reads its high
    /// byte from the next page.
    pub(crate) fn read_word(bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    // =========================================================================
    // Addressing mode helpers
    // =========================================================================

    /// Immediate: the operand is the byte at PC.
    pub(crate) fn addr_immediate(&mut self) -> u16 {
        let addr = self.regs.pc;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        addr
    }

    /// Zero Page: $nn
    pub(crate) fn addr_zero_page(&mut self, bus: &mut impl Bus) -> u16 {
        u16::from(self.fetch(bus))
    }

    /// Zero Page,X: $nn,X (wraps within zero page)
    pub(crate) fn addr_zero_page_x(&mut self, bus: &mut impl Bus) -> u16 {
        u16::from(self.fetch(bus).wrapping_add(self.regs.x))
    }

    /// Zero Page,Y: $nn,Y (wraps within zero page)
    pub(crate) fn addr_zero_page_y(&mut self, bus: &mut impl Bus) -> u16 {
        u16::from(self.fetch(bus).wrapping_add(self.regs.y))
    }

    /// Absolute: $nnnn
    pub(crate) fn addr_absolute(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch_word(bus)
    }

    /// Absolute,X: $nnnn,X
    pub(crate) fn addr_absolute_x(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch_word(bus).wrapping_add(u16::from(self.regs.x))
    }

    /// Absolute,Y: $nnnn,Y
    pub(crate) fn addr_absolute_y(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch_word(bus).wrapping_add(u16::from(self.regs.y))
    }

    /// Indirect: ($nnnn), JMP only. Reads the pointer from `$nnnn` and
    /// `$nnnn+1` without the NMOS page-wrap bug.
    pub(crate) fn addr_indirect(&mut self, bus: &mut impl Bus) -> u16 {
        let pointer = self.fetch_word(bus);
        Self::read_word(bus, pointer)
    }

    /// Indexed Indirect: ($nn,X)
    ///
    /// The pointer index wraps in zero page, but a pointer at $FF takes its
    /// high byte from $0100.
    pub(crate) fn addr_indexed_indirect(&mut self, bus: &mut impl Bus) -> u16 {
        let pointer = self.fetch(bus).wrapping_add(self.regs.x);
        Self::read_word(bus, u16::from(pointer))
    }

    /// Indirect Indexed: ($nn),Y
    pub(crate) fn addr_indirect_indexed(&mut self, bus: &mut impl Bus) -> u16 {
        let pointer = self.fetch(bus);
        Self::read_word(bus, u16::from(pointer)).wrapping_add(u16::from(self.regs.y))
    }

    /// Charge one cycle when indexing by `index` moved `addr` to a new page.
    pub(crate) fn delay(&mut self, addr: u16, index: u8) {
        let base = addr.wrapping_sub(u16::from(index));
        if base & 0xFF00 != addr & 0xFF00 {
            self.cycles += 1;
        }
    }

    /// Relative branch. Taken branches cost one extra cycle, two when the
    /// target is on a different page from the following instruction.
    pub(crate) fn branch_if(&mut self, bus: &mut impl Bus, condition: bool) {
        let offset = self.fetch(bus) as i8;
        if condition {
            let next = self.regs.pc;
            self.regs.pc = next.wrapping_add_signed(i16::from(offset));
            self.cycles += if next & 0xFF00 == self.regs.pc & 0xFF00 {
                1
            } else {
                2
            };
        }
    }
}
