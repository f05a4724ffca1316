//! Sally instruction interpreter.

use emu_core::{Bus, Cpu, Observable, Value};
use log::trace;

use crate::cycles::{CYCLES, HIGH_SCORE_ENTRY_POINTS, INPT4, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::{Registers, Status};

/// The Sally CPU.
#[derive(Debug, Clone)]
pub struct Sally {
    /// CPU registers.
    pub regs: Registers,

    /// Cycles charged to the instruction in progress.
    pub(crate) cycles: u32,

    /// The last instruction touched a half-clocked TIA/RIOT location.
    half_cycle: bool,

    /// A JMP/JSR landed on a high-score cartridge entry point.
    high_score_set: bool,

    /// Last opcode executed.
    opcode: u8,

    /// Instructions executed since power-on (for debugging).
    instructions: u64,
}

impl Default for Sally {
    fn default() -> Self {
        Self::new()
    }
}

impl Sally {
    /// Create a CPU in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            half_cycle: false,
            high_score_set: false,
            opcode: 0,
            instructions: 0,
        }
    }

    /// Zero the register file (A = X = Y = S = 0, P = R, PC = 0).
    ///
    /// Does not touch the bus. The machine calls this before mapping the
    /// cartridge and [`Sally::execute_res`] afterwards.
    pub fn clear(&mut self) {
        self.regs = Registers::new();
        self.cycles = 0;
        self.half_cycle = false;
    }

    /// Run the RESET sequence: P = I|R|Z, PC from $FFFC/$FFFD. Six cycles.
    pub fn execute_res(&mut self, bus: &mut impl Bus) -> u32 {
        self.regs.p = Status::I | Status::R | Status::Z;
        self.regs.pc = Self::read_word(bus, RESET_VECTOR);
        trace!("RESET -> ${:04X}", self.regs.pc);
        6
    }

    /// Run the NMI sequence unconditionally. Seven cycles.
    pub fn execute_nmi(&mut self, bus: &mut impl Bus) -> u32 {
        self.interrupt_sequence(bus, NMI_VECTOR);
        7
    }

    /// Run the IRQ sequence if interrupts are enabled. Seven cycles either
    /// way.
    pub fn execute_irq(&mut self, bus: &mut impl Bus) -> u32 {
        if !self.regs.p.contains(Status::I) {
            self.interrupt_sequence(bus, IRQ_VECTOR);
        }
        7
    }

    fn interrupt_sequence(&mut self, bus: &mut impl Bus, vector: u16) {
        let [pcl, pch] = self.regs.pc.to_le_bytes();
        self.push(bus, pch);
        self.push(bus, pcl);
        self.regs.p.remove(Status::B);
        self.push(bus, self.regs.p.bits());
        self.regs.p.insert(Status::I);
        self.regs.pc = Self::read_word(bus, vector);
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// True when the last instruction earned the half-cycle penalty.
    #[must_use]
    pub fn half_cycle(&self) -> bool {
        self.half_cycle
    }

    /// True once a JMP/JSR has entered the high-score cartridge.
    #[must_use]
    pub fn high_score_set(&self) -> bool {
        self.high_score_set
    }

    /// Forget high-score cartridge usage (on cartridge release).
    pub fn clear_high_score(&mut self) {
        self.high_score_set = false;
    }

    /// Last opcode executed.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Instructions executed since creation.
    #[must_use]
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    // =========================================================================
    // Flags and ALU operations
    // =========================================================================

    fn set_zn(&mut self, value: u8) {
        self.regs.p.update_nz(value);
    }

    /// ADC - Add with Carry
    fn adc(&mut self, data: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.contains(Status::C));

        if self.regs.p.contains(Status::D) {
            let mut al = u16::from(a & 0x0F) + u16::from(data & 0x0F) + carry;
            let mut ah = u16::from(a >> 4) + u16::from(data >> 4);
            if al > 9 {
                al += 6;
                ah += 1;
            }

            // Z comes from the binary sum, N and V from the unadjusted
            // high nibble.
            let binary = u16::from(a) + u16::from(data) + carry;
            self.regs.p.set(Status::Z, binary == 0);
            self.regs.p.set(Status::N, ah & 0x08 != 0);
            let overflow = !(a ^ data) & (((ah << 4) as u8) ^ a) & 0x80;
            self.regs.p.set(Status::V, overflow != 0);

            if ah > 9 {
                ah += 6;
            }
            self.regs.p.set(Status::C, ah > 15);
            self.regs.a = ((ah << 4) as u8) | (al as u8 & 0x0F);
        } else {
            let result = u16::from(a) + u16::from(data) + carry;
            let result8 = result as u8;
            self.regs.p.set(Status::C, result > 0xFF);
            self.regs
                .p
                .set(Status::V, !(a ^ data) & (a ^ result8) & 0x80 != 0);
            self.set_zn(result8);
            self.regs.a = result8;
        }
    }

    /// SBC - Subtract with Carry
    fn sbc(&mut self, data: u8) {
        let a = self.regs.a;
        let borrow = u16::from(!self.regs.p.contains(Status::C));
        let result = u16::from(a).wrapping_sub(u16::from(data)).wrapping_sub(borrow);
        let result8 = result as u8;

        self.regs.p.set(Status::C, result >> 8 == 0);
        self.regs
            .p
            .set(Status::V, (a ^ data) & (a ^ result8) & 0x80 != 0);
        self.set_zn(result8);

        if self.regs.p.contains(Status::D) {
            let mut al = u16::from(a & 0x0F)
                .wrapping_sub(u16::from(data & 0x0F))
                .wrapping_sub(borrow);
            let mut ah = u16::from(a >> 4).wrapping_sub(u16::from(data >> 4));
            // Unsigned compares: a negative nibble also counts as > 9.
            if al > 9 {
                al = al.wrapping_sub(6);
                ah = ah.wrapping_sub(1);
            }
            if ah > 9 {
                ah = ah.wrapping_sub(6);
            }
            self.regs.a = ((ah << 4) as u8) | (al as u8 & 0x0F);
        } else {
            self.regs.a = result8;
        }
    }

    fn compare(&mut self, register: u8, data: u8) {
        self.regs.p.set(Status::C, register >= data);
        self.set_zn(register.wrapping_sub(data));
    }

    fn bit(&mut self, data: u8) {
        self.regs.p.set(Status::Z, data & self.regs.a == 0);
        self.regs.p.set(Status::V, data & 0x40 != 0);
        self.regs.p.set(Status::N, data & 0x80 != 0);
    }

    fn asl(&mut self, data: u8) -> u8 {
        self.regs.p.set(Status::C, data & 0x80 != 0);
        let result = data << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, data: u8) -> u8 {
        self.regs.p.set(Status::C, data & 0x01 != 0);
        let result = data >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, data: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.contains(Status::C));
        self.regs.p.set(Status::C, data & 0x80 != 0);
        let result = (data << 1) | carry_in;
        self.set_zn(result);
        result
    }

    fn ror(&mut self, data: u8) -> u8 {
        let carry_in = if self.regs.p.contains(Status::C) { 0x80 } else { 0 };
        self.regs.p.set(Status::C, data & 0x01 != 0);
        let result = (data >> 1) | carry_in;
        self.set_zn(result);
        result
    }

    /// Read-modify-write on memory.
    fn modify(&mut self, bus: &mut impl Bus, addr: u16, op: fn(&mut Self, u8) -> u8) {
        let data = bus.read(addr);
        let result = op(self, data);
        bus.write(addr, result);
    }

    fn inc(&mut self, data: u8) -> u8 {
        let result = data.wrapping_add(1);
        self.set_zn(result);
        result
    }

    fn dec(&mut self, data: u8) -> u8 {
        let result = data.wrapping_sub(1);
        self.set_zn(result);
        result
    }

    fn jump(&mut self, target: u16) {
        self.regs.pc = target;
        if HIGH_SCORE_ENTRY_POINTS.contains(&target) {
            self.high_score_set = true;
        }
    }

    // =========================================================================
    // Instruction dispatch
    // =========================================================================

    /// Execute one instruction. `self.cycles` already holds the table cost.
    #[allow(clippy::too_many_lines)]
    fn execute(&mut self, bus: &mut impl Bus, opcode: u8) {
        match opcode {
            // =================================================================
            // Load/Store Operations
            // =================================================================

            // LDA
            0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 => {
                let addr = self.read_operand(bus, opcode);
                self.regs.a = bus.read(addr);
                self.set_zn(self.regs.a);
            }
            // LDX
            0xA2 => {
                let addr = self.addr_immediate();
                self.load_x(bus, addr);
            }
            0xA6 => {
                let addr = self.addr_zero_page(bus);
                self.load_x(bus, addr);
            }
            0xB6 => {
                let addr = self.addr_zero_page_y(bus);
                self.load_x(bus, addr);
            }
            0xAE => {
                let addr = self.addr_absolute(bus);
                self.load_x(bus, addr);
            }
            0xBE => {
                // LDX $nnnn,Y
                let addr = self.addr_absolute_y(bus);
                self.delay(addr, self.regs.y);
                self.load_x(bus, addr);
            }
            // LDY
            0xA0 => {
                let addr = self.addr_immediate();
                self.load_y(bus, addr);
            }
            0xA4 => {
                let addr = self.addr_zero_page(bus);
                self.load_y(bus, addr);
            }
            0xB4 => {
                let addr = self.addr_zero_page_x(bus);
                self.load_y(bus, addr);
            }
            0xAC => {
                let addr = self.addr_absolute(bus);
                self.load_y(bus, addr);
            }
            0xBC => {
                // LDY $nnnn,X
                let addr = self.addr_absolute_x(bus);
                self.delay(addr, self.regs.x);
                self.load_y(bus, addr);
            }

            // STA (no page-crossing penalty on stores)
            0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 => {
                let addr = match opcode {
                    0x85 => self.addr_zero_page(bus),
                    0x95 => self.addr_zero_page_x(bus),
                    0x8D => self.addr_absolute(bus),
                    0x9D => self.addr_absolute_x(bus),
                    0x99 => self.addr_absolute_y(bus),
                    0x81 => self.addr_indexed_indirect(bus),
                    _ => self.addr_indirect_indexed(bus),
                };
                bus.write(addr, self.regs.a);
            }
            // STX
            0x86 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.regs.x);
            }
            0x96 => {
                let addr = self.addr_zero_page_y(bus);
                bus.write(addr, self.regs.x);
            }
            0x8E => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.regs.x);
            }
            // STY
            0x84 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.regs.y);
            }
            0x94 => {
                let addr = self.addr_zero_page_x(bus);
                bus.write(addr, self.regs.y);
            }
            0x8C => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.regs.y);
            }

            // =================================================================
            // Register Transfers
            // =================================================================
            0xAA => {
                // TAX
                self.regs.x = self.regs.a;
                self.set_zn(self.regs.x);
            }
            0xA8 => {
                // TAY
                self.regs.y = self.regs.a;
                self.set_zn(self.regs.y);
            }
            0x8A => {
                // TXA
                self.regs.a = self.regs.x;
                self.set_zn(self.regs.a);
            }
            0x98 => {
                // TYA
                self.regs.a = self.regs.y;
                self.set_zn(self.regs.a);
            }
            0xBA => {
                // TSX
                self.regs.x = self.regs.s;
                self.set_zn(self.regs.x);
            }
            0x9A => {
                // TXS (no flags)
                self.regs.s = self.regs.x;
            }

            // =================================================================
            // Stack Operations
            // =================================================================
            0x48 => {
                // PHA
                self.push(bus, self.regs.a);
            }
            0x08 => {
                // PHP pushes P exactly as it stands
                self.push(bus, self.regs.p.bits());
            }
            0x68 => {
                // PLA
                self.regs.a = self.pull(bus);
                self.set_zn(self.regs.a);
            }
            0x28 => {
                // PLP
                self.regs.p = Status::from_bits_retain(self.pull(bus));
            }

            // =================================================================
            // Logical and Arithmetic
            // =================================================================

            // AND
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 => {
                let addr = self.read_operand(bus, opcode);
                self.regs.a &= bus.read(addr);
                self.set_zn(self.regs.a);
            }
            // EOR
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 => {
                let addr = self.read_operand(bus, opcode);
                self.regs.a ^= bus.read(addr);
                self.set_zn(self.regs.a);
            }
            // ORA
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 => {
                let addr = self.read_operand(bus, opcode);
                self.regs.a |= bus.read(addr);
                self.set_zn(self.regs.a);
            }
            // ADC
            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 => {
                let addr = self.read_operand(bus, opcode);
                let data = bus.read(addr);
                self.adc(data);
            }
            // SBC
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 => {
                let addr = self.read_operand(bus, opcode);
                let data = bus.read(addr);
                self.sbc(data);
            }
            // CMP
            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 => {
                let addr = self.read_operand(bus, opcode);
                let data = bus.read(addr);
                self.compare(self.regs.a, data);
            }
            // CPX
            0xE0 | 0xE4 | 0xEC => {
                let addr = match opcode {
                    0xE0 => self.addr_immediate(),
                    0xE4 => self.addr_zero_page(bus),
                    _ => self.addr_absolute(bus),
                };
                let data = bus.read(addr);
                self.compare(self.regs.x, data);
            }
            // CPY
            0xC0 | 0xC4 | 0xCC => {
                let addr = match opcode {
                    0xC0 => self.addr_immediate(),
                    0xC4 => self.addr_zero_page(bus),
                    _ => self.addr_absolute(bus),
                };
                let data = bus.read(addr);
                self.compare(self.regs.y, data);
            }
            0x24 => {
                // BIT $nn
                let addr = self.addr_zero_page(bus);
                let data = bus.read(addr);
                self.bit(data);
                // INPT4 sits on the half-speed TIA bus; lightgun loops poll it.
                if addr == INPT4 {
                    self.half_cycle = true;
                }
            }
            0x2C => {
                // BIT $nnnn
                let addr = self.addr_absolute(bus);
                let data = bus.read(addr);
                self.bit(data);
            }

            // =================================================================
            // Increments and Decrements
            // =================================================================
            0xE6 | 0xF6 | 0xEE | 0xFE => {
                // INC
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::inc);
            }
            0xC6 | 0xD6 | 0xCE | 0xDE => {
                // DEC
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::dec);
            }
            0xE8 => {
                // INX
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_zn(self.regs.x);
            }
            0xC8 => {
                // INY
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_zn(self.regs.y);
            }
            0xCA => {
                // DEX
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_zn(self.regs.x);
            }
            0x88 => {
                // DEY
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_zn(self.regs.y);
            }

            // =================================================================
            // Shifts
            // =================================================================
            0x0A => self.regs.a = self.asl(self.regs.a),
            0x4A => self.regs.a = self.lsr(self.regs.a),
            0x2A => self.regs.a = self.rol(self.regs.a),
            0x6A => self.regs.a = self.ror(self.regs.a),
            0x06 | 0x16 | 0x0E | 0x1E => {
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::asl);
            }
            0x46 | 0x56 | 0x4E | 0x5E => {
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::lsr);
            }
            0x26 | 0x36 | 0x2E | 0x3E => {
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::rol);
            }
            0x66 | 0x76 | 0x6E | 0x7E => {
                let addr = self.rmw_operand(bus, opcode);
                self.modify(bus, addr, Self::ror);
            }

            // =================================================================
            // Jumps and Calls
            // =================================================================
            0x4C => {
                // JMP $nnnn
                let target = self.addr_absolute(bus);
                self.jump(target);
            }
            0x6C => {
                // JMP ($nnnn)
                let target = self.addr_indirect(bus);
                self.jump(target);
            }
            0x20 => {
                // JSR $nnnn pushes the address of its last operand byte
                let target = self.addr_absolute(bus);
                let [pcl, pch] = self.regs.pc.wrapping_sub(1).to_le_bytes();
                self.push(bus, pch);
                self.push(bus, pcl);
                self.jump(target);
            }
            0x60 => {
                // RTS
                let low = self.pull(bus);
                let high = self.pull(bus);
                self.regs.pc = u16::from_le_bytes([low, high]).wrapping_add(1);
            }
            0x40 => {
                // RTI
                self.regs.p = Status::from_bits_retain(self.pull(bus));
                let low = self.pull(bus);
                let high = self.pull(bus);
                self.regs.pc = u16::from_le_bytes([low, high]);
            }
            0x00 => {
                // BRK
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.regs.p.insert(Status::B);
                let [pcl, pch] = self.regs.pc.to_le_bytes();
                self.push(bus, pch);
                self.push(bus, pcl);
                self.push(bus, self.regs.p.bits());
                self.regs.p.insert(Status::I);
                self.regs.pc = Self::read_word(bus, IRQ_VECTOR);
            }

            // =================================================================
            // Branches
            // =================================================================
            0x10 => self.branch_if(bus, !self.regs.p.contains(Status::N)), // BPL
            0x30 => self.branch_if(bus, self.regs.p.contains(Status::N)),  // BMI
            0x50 => self.branch_if(bus, !self.regs.p.contains(Status::V)), // BVC
            0x70 => self.branch_if(bus, self.regs.p.contains(Status::V)),  // BVS
            0x90 => self.branch_if(bus, !self.regs.p.contains(Status::C)), // BCC
            0xB0 => self.branch_if(bus, self.regs.p.contains(Status::C)),  // BCS
            0xD0 => self.branch_if(bus, !self.regs.p.contains(Status::Z)), // BNE
            0xF0 => self.branch_if(bus, self.regs.p.contains(Status::Z)),  // BEQ

            // =================================================================
            // Flag Operations
            // =================================================================
            0x18 => self.regs.p.remove(Status::C), // CLC
            0x38 => self.regs.p.insert(Status::C), // SEC
            0x58 => self.regs.p.remove(Status::I), // CLI
            0x78 => self.regs.p.insert(Status::I), // SEI
            0xD8 => self.regs.p.remove(Status::D), // CLD
            0xF8 => self.regs.p.insert(Status::D), // SED
            0xB8 => self.regs.p.remove(Status::V), // CLV

            0xEA => {} // NOP

            // Undocumented opcodes only cost their table cycles.
            _ => trace!(
                "inert opcode ${opcode:02X} at ${:04X}",
                self.regs.pc.wrapping_sub(1)
            ),
        }
    }

    /// Resolve the operand of a read instruction in one of the eight
    /// standard ALU groups, charging the page-crossing cycle where the
    /// hardware does.
    fn read_operand(&mut self, bus: &mut impl Bus, opcode: u8) -> u16 {
        match opcode & 0x1F {
            0x09 => self.addr_immediate(),
            0x05 => self.addr_zero_page(bus),
            0x15 => self.addr_zero_page_x(bus),
            0x0D => self.addr_absolute(bus),
            0x1D => {
                let addr = self.addr_absolute_x(bus);
                self.delay(addr, self.regs.x);
                addr
            }
            0x19 => {
                let addr = self.addr_absolute_y(bus);
                self.delay(addr, self.regs.y);
                addr
            }
            0x01 => self.addr_indexed_indirect(bus),
            _ => {
                let addr = self.addr_indirect_indexed(bus);
                self.delay(addr, self.regs.y);
                addr
            }
        }
    }

    /// Resolve the operand of a read-modify-write instruction (zp, zp,X,
    /// abs, abs,X). No page-crossing cycle.
    fn rmw_operand(&mut self, bus: &mut impl Bus, opcode: u8) -> u16 {
        match opcode & 0x1F {
            0x06 => self.addr_zero_page(bus),
            0x16 => self.addr_zero_page_x(bus),
            0x0E => self.addr_absolute(bus),
            _ => self.addr_absolute_x(bus),
        }
    }

    fn load_x(&mut self, bus: &mut impl Bus, addr: u16) {
        self.regs.x = bus.read(addr);
        self.set_zn(self.regs.x);
    }

    fn load_y(&mut self, bus: &mut impl Bus, addr: u16) {
        self.regs.y = bus.read(addr);
        self.set_zn(self.regs.y);
    }
}

impl<B: Bus> Cpu<B> for Sally {
    fn step(&mut self, bus: &mut B) -> u32 {
        self.half_cycle = false;

        let opcode = self.fetch(bus);
        self.opcode = opcode;
        self.cycles = u32::from(CYCLES[usize::from(opcode)]);
        self.execute(bus, opcode);
        self.instructions += 1;

        self.cycles
    }

    fn reset(&mut self, bus: &mut B) -> u32 {
        self.clear();
        self.execute_res(bus)
    }

    fn interrupt(&mut self, bus: &mut B) -> u32 {
        self.execute_irq(bus)
    }

    fn nmi(&mut self, bus: &mut B) -> u32 {
        self.execute_nmi(bus)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }
}

impl Observable for Sally {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" => Some(self.regs.s.into()),
            "p" => Some(p.bits().into()),
            "flags.c" => Some(p.contains(Status::C).into()),
            "flags.z" => Some(p.contains(Status::Z).into()),
            "flags.i" => Some(p.contains(Status::I).into()),
            "flags.d" => Some(p.contains(Status::D).into()),
            "flags.b" => Some(p.contains(Status::B).into()),
            "flags.v" => Some(p.contains(Status::V).into()),
            "flags.n" => Some(p.contains(Status::N).into()),
            "opcode" => Some(self.opcode.into()),
            "half_cycle" => Some(self.half_cycle.into()),
            "high_score_set" => Some(self.high_score_set.into()),
            "instructions" => Some(self.instructions.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "s",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.b",
            "flags.v",
            "flags.n",
            "opcode",
            "half_cycle",
            "high_score_set",
            "instructions",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn setup(program: &[u8]) -> (Sally, SimpleBus) {
        let mut bus = SimpleBus::new();
        bus.load(0x0200, program);
        let mut cpu = Sally::new();
        cpu.regs.pc = 0x0200;
        (cpu, bus)
    }

    #[test]
    fn test_lda_immediate() {
        let (mut cpu, mut bus) = setup(&[0xA9, 0x80]);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 2);
        assert_eq!(cpu.regs.a, 0x80);
        assert!(cpu.regs.p.contains(Status::N));
        assert!(!cpu.regs.p.contains(Status::Z));
    }

    #[test]
    fn test_lda_absolute_x_page_cross() {
        let (mut cpu, mut bus) = setup(&[0xBD, 0xFF, 0x12]);
        cpu.regs.x = 0x01;
        bus.write(0x1300, 0x42);
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(cpu.regs.a, 0x42);
    }

    #[test]
    fn test_sta_absolute_x_never_penalised() {
        let (mut cpu, mut bus) = setup(&[0x9D, 0xFF, 0x12]);
        cpu.regs.x = 0x01;
        cpu.regs.a = 0x99;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.peek(0x1300), 0x99);
    }

    #[test]
    fn test_indirect_y_pointer_at_ff_reads_next_page() {
        let (mut cpu, mut bus) = setup(&[0xB1, 0xFF]);
        bus.write(0x00FF, 0x00);
        bus.write(0x0100, 0x30);
        bus.write(0x0000, 0x20);
        bus.write(0x3005, 0x77);
        cpu.regs.y = 0x05;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(cpu.regs.a, 0x77);
    }

    #[test]
    fn test_indexed_indirect_wraps_index() {
        let (mut cpu, mut bus) = setup(&[0xA1, 0xF0]);
        cpu.regs.x = 0x20;
        bus.write(0x0010, 0x34);
        bus.write(0x0011, 0x12);
        bus.write(0x1234, 0x5A);
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.regs.a, 0x5A);
    }

    #[test]
    fn test_jmp_indirect_has_no_page_bug() {
        let (mut cpu, mut bus) = setup(&[0x6C, 0xFF, 0x10]);
        bus.write(0x10FF, 0x00);
        bus.write(0x1100, 0x40);
        bus.write(0x1000, 0x99);
        cpu.step(&mut bus);
        assert_eq!(cpu.regs.pc, 0x4000);
    }

    #[test]
    fn test_bit_inpt4_sets_half_cycle() {
        let (mut cpu, mut bus) = setup(&[0x24, 0x0C, 0x24, 0x0D, 0xEA]);
        cpu.step(&mut bus);
        assert!(cpu.half_cycle());
        cpu.step(&mut bus);
        assert!(!cpu.half_cycle());
        cpu.regs.pc = 0x0200;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert!(!cpu.half_cycle(), "flag clears at the next instruction");
    }

    #[test]
    fn test_bit_absolute_inpt4_is_full_speed() {
        let (mut cpu, mut bus) = setup(&[0x2C, 0x0C, 0x00]);
        cpu.step(&mut bus);
        assert!(!cpu.half_cycle());
    }

    #[test]
    fn test_jsr_to_high_score_entry_sets_flag() {
        let (mut cpu, mut bus) = setup(&[0x20, 0xCF, 0x3F]);
        cpu.regs.s = 0xFF;
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.regs.pc, 0x3FCF);
        assert!(cpu.high_score_set());
        assert_eq!(bus.peek(0x01FF), 0x02);
        assert_eq!(bus.peek(0x01FE), 0x02);
        cpu.clear_high_score();
        assert!(!cpu.high_score_set());
    }

    #[test]
    fn test_jmp_elsewhere_leaves_high_score_clear() {
        let (mut cpu, mut bus) = setup(&[0x4C, 0xFE, 0x3F]);
        cpu.step(&mut bus);
        assert!(!cpu.high_score_set());
    }

    #[test]
    fn test_reset_sequence() {
        let mut bus = SimpleBus::new();
        bus.write(0xFFFC, 0x00);
        bus.write(0xFFFD, 0xC0);
        let mut cpu = Sally::new();
        cpu.regs.a = 0x12;
        cpu.regs.s = 0xFD;
        assert_eq!(Cpu::reset(&mut cpu, &mut bus), 6);
        assert_eq!(cpu.regs.pc, 0xC000);
        assert_eq!(cpu.regs.p.bits(), 0x26);
        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.s, 0);
    }

    #[test]
    fn test_nmi_clears_break_and_vectors() {
        let mut bus = SimpleBus::new();
        bus.write(0xFFFA, 0x34);
        bus.write(0xFFFB, 0x12);
        let mut cpu = Sally::new();
        cpu.regs.pc = 0xC123;
        cpu.regs.s = 0xFF;
        cpu.regs.p = Status::B | Status::R | Status::C;
        assert_eq!(cpu.execute_nmi(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(bus.peek(0x01FF), 0xC1);
        assert_eq!(bus.peek(0x01FE), 0x23);
        assert_eq!(bus.peek(0x01FD), 0x21);
        assert!(!cpu.regs.p.contains(Status::B));
        assert!(cpu.regs.p.contains(Status::I));
    }

    #[test]
    fn test_irq_masked_still_costs_seven() {
        let mut bus = SimpleBus::new();
        let mut cpu = Sally::new();
        cpu.regs.pc = 0x8000;
        cpu.regs.s = 0xFF;
        cpu.regs.p = Status::I | Status::R;
        assert_eq!(cpu.execute_irq(&mut bus), 7);
        assert_eq!(cpu.regs.pc, 0x8000);
        assert_eq!(cpu.regs.s, 0xFF);
    }
}
