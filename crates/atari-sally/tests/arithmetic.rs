//! ADC/SBC vectors in binary and decimal mode.
//!
//! Decimal mode follows the NMOS quirks Sally inherits: N and V come from
//! the high nibble before the final adjust and Z from the binary sum.

use atari_sally::{Sally, Status};
use emu_core::{Cpu, SimpleBus};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Vector {
    name: String,
    op: String,
    decimal: bool,
    a: u8,
    operand: u8,
    carry: bool,
    result: u8,
    c: bool,
    z: bool,
    n: bool,
    v: bool,
}

fn vectors() -> Vec<Vector> {
    serde_json::from_str(include_str!("data/arithmetic.json")).expect("valid vector file")
}

#[test]
fn test_arithmetic_vectors() {
    for vector in vectors() {
        let opcode = match vector.op.as_str() {
            "adc" => 0x69,
            "sbc" => 0xE9,
            other => panic!("unknown op {other}"),
        };

        let mut bus = SimpleBus::new();
        bus.load(0x0200, &[opcode, vector.operand]);
        let mut cpu = Sally::new();
        cpu.regs.pc = 0x0200;
        cpu.regs.a = vector.a;
        cpu.regs.p.set(Status::D, vector.decimal);
        cpu.regs.p.set(Status::C, vector.carry);

        assert_eq!(cpu.step(&mut bus), 2, "{}", vector.name);
        assert_eq!(cpu.regs.a, vector.result, "{}: result", vector.name);
        assert_eq!(cpu.regs.p.contains(Status::C), vector.c, "{}: C", vector.name);
        assert_eq!(cpu.regs.p.contains(Status::Z), vector.z, "{}: Z", vector.name);
        assert_eq!(cpu.regs.p.contains(Status::N), vector.n, "{}: N", vector.name);
        assert_eq!(cpu.regs.p.contains(Status::V), vector.v, "{}: V", vector.name);
    }
}

#[test]
fn test_decimal_score_counter() {
    // SED; CLC; LDA #$98; ADC #$01; ADC #$01 (no CLC between)
    let mut bus = SimpleBus::new();
    bus.load(0x0200, &[0xF8, 0x18, 0xA9, 0x98, 0x69, 0x01, 0x69, 0x01]);
    let mut cpu = Sally::new();
    cpu.regs.pc = 0x0200;

    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.a, 0x99);
    assert!(!cpu.regs.p.contains(Status::C));

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.contains(Status::C));
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

#[test]
fn test_decimal_sweep_over_valid_operands() {
    let mut bus = SimpleBus::new();
    let mut cpu = Sally::new();
    for (opcode, name) in [(0x69u8, "ADC"), (0xE9, "SBC")] {
        for a in 0..100u8 {
            for b in 0..100u8 {
                for carry in [false, true] {
                    bus.load(0x0200, &[opcode, to_bcd(b)]);
                    cpu.regs.pc = 0x0200;
                    cpu.regs.a = to_bcd(a);
                    cpu.regs.p = Status::R | Status::D;
                    cpu.regs.p.set(Status::C, carry);
                    cpu.step(&mut bus);

                    let (result, c) = if opcode == 0x69 {
                        let sum = u16::from(a) + u16::from(b) + u16::from(carry);
                        ((sum % 100) as u8, sum >= 100)
                    } else {
                        let diff = i16::from(a) - i16::from(b) - i16::from(!carry);
                        (diff.rem_euclid(100) as u8, diff >= 0)
                    };
                    let label = format!("{name} {a:02} {b:02} carry={carry}");
                    assert_eq!(cpu.regs.a, to_bcd(result), "{label}");
                    assert_eq!(cpu.regs.p.contains(Status::C), c, "{label}: C");
                }
            }
        }
    }
}
