//! Machine-level behaviour: loading, save states, BIOS handover,
//! high-score tracking and scripted input.

use emu_atari_7800::savestate::{SIZE, SIZE_EXPANSION_RIOT, SIZE_RIOT, SIZE_XM};
use emu_atari_7800::{
    Atari7800Config, Bios, Button, CartridgeError, CartridgeType, Database, ProSystem, Region,
    StateError,
};
use emu_core::{Bus, Observable, Value};

/// 32 KB headerless image at $8000 running `code` from RESET.
fn flat_rom(code: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[..code.len()].copy_from_slice(code);
    rom[0x7FFC] = 0x00;
    rom[0x7FFD] = 0x80;
    rom
}

fn headered(image: &[u8], mapper: u8, flags: u8) -> Vec<u8> {
    let mut data = vec![0u8; 128];
    data[0] = 1;
    data[1..10].copy_from_slice(b"ATARI7800");
    data[17..25].copy_from_slice(b"TEST CRT");
    data[49..53].copy_from_slice(&(image.len() as u32).to_be_bytes());
    data[53] = mapper;
    data[54] = flags;
    data.extend_from_slice(image);
    data
}

// loop: INC $40 ; INX ; JMP loop
const COUNTER: &[u8] = &[0xE6, 0x40, 0xE8, 0x4C, 0x00, 0x80];

fn running(code: &[u8], frames: u32) -> ProSystem {
    let mut system = ProSystem::new(Atari7800Config::default());
    system.load_cartridge(&flat_rom(code)).expect("load");
    for _ in 0..frames {
        system.run_frame();
    }
    system
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn headerless_and_headered_classification() {
    let mut system = ProSystem::new(Atari7800Config::default());
    system.load_cartridge(&flat_rom(COUNTER)).expect("load");
    assert_eq!(
        system.cartridge().expect("cartridge").kind(),
        CartridgeType::Normal
    );
    assert_eq!(system.cpu().pc(), 0x8000);

    let mut image = vec![0u8; 0x2_0000];
    let last = image.len() - 0x4000;
    image[last + 0x3FFC] = 0x00;
    image[last + 0x3FFD] = 0xC0;
    system
        .load_cartridge(&headered(&image, 0, 0x0A))
        .expect("load");
    let cartridge = system.cartridge().expect("cartridge");
    assert_eq!(cartridge.kind(), CartridgeType::SupercartLarge);
    assert_eq!(cartridge.title(), "TEST CRT");
    assert_eq!(system.cpu().pc(), 0xC000);
    assert_eq!(
        system.query("cartridge.type"),
        Some(Value::String("supercart-large".into()))
    );
}

#[test]
fn failed_load_leaves_no_cartridge() {
    let mut system = running(COUNTER, 1);
    assert!(matches!(
        system.load_cartridge(&[0u8; 64]),
        Err(CartridgeError::TooSmall(64))
    ));
    assert!(system.cartridge().is_none());
    assert!(system.save_state().is_empty());
}

#[test]
fn database_overrides_header() {
    let rom = flat_rom(COUNTER);
    let digest = emu_atari_7800::cartridge::digest(&rom);
    let text = format!(
        "[{digest}]\ntitle=Listed\ntype=0\npokey=false\ncontroller1=1\ncontroller2=1\n\
         region=1\nflags=2\nhblank=40\n"
    );
    let mut system = ProSystem::new(Atari7800Config::default());
    system.set_database(Some(Database::parse(&text).expect("parse")));
    system.load_cartridge(&rom).expect("load");

    assert_eq!(system.region(), Region::Pal);
    assert_eq!(system.frame_rate(), 50);
    let timing = system.scheduler().timing();
    assert_eq!(timing.hblank, 40);
    assert!(!timing.wsync, "flag bit 1 turns WSYNC off under auto");
    assert!(timing.cycle_stealing);
}

// ============================================================================
// Save states
// ============================================================================

#[test]
fn save_load_round_trip() {
    let mut system = running(COUNTER, 3);
    let saved = system.save_state();
    assert_eq!(saved.len(), SIZE_RIOT);
    let regs = system.cpu().regs;
    let counter = system.bus().peek(0x0040);

    for _ in 0..5 {
        system.run_frame();
    }

    system.load_state(&saved).expect("load state");
    assert_eq!(system.cpu().regs, regs);
    assert_eq!(system.bus().peek(0x0040), counter);
    assert_eq!(system.save_state(), saved);
}

#[test]
fn state_from_another_cartridge_is_rejected_untouched() {
    let other = running(&[0xE8, 0x4C, 0x00, 0x80], 2).save_state();
    let mut system = running(COUNTER, 2);
    let before = system.save_state();

    assert!(matches!(
        system.load_state(&other),
        Err(StateError::DigestMismatch { .. })
    ));
    assert_eq!(system.save_state(), before);
}

#[test]
fn state_digest_must_match_exactly() {
    let mut system = running(COUNTER, 1);
    let mut saved = system.save_state();
    saved[21..53].make_ascii_uppercase();
    assert!(matches!(
        system.load_state(&saved),
        Err(StateError::DigestMismatch { .. })
    ));
}

#[test]
fn malformed_states_are_rejected() {
    let mut system = running(COUNTER, 1);
    let saved = system.save_state();

    assert!(matches!(
        system.load_state(&saved[..100]),
        Err(StateError::Size(100))
    ));
    let mut bad_magic = saved.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        system.load_state(&bad_magic),
        Err(StateError::Magic)
    ));

    // Without the RIOT block the state is still accepted.
    system.load_state(&saved[..SIZE]).expect("short state");
}

#[test]
fn supercart_ram_state_carries_expansion_ram() {
    let mut image = vec![0u8; 0x1_0000];
    let last = image.len() - 0x4000;
    // LDA #$5A ; STA $4123 ; JMP $C005
    image[last..last + 8].copy_from_slice(&[0xA9, 0x5A, 0x8D, 0x23, 0x41, 0x4C, 0x05, 0xC0]);
    image[last + 0x3FFC] = 0x00;
    image[last + 0x3FFD] = 0xC0;

    let mut system = ProSystem::new(Atari7800Config::default());
    system
        .load_cartridge(&headered(&image, 0, 0x06))
        .expect("load");
    assert_eq!(
        system.cartridge().expect("cartridge").kind(),
        CartridgeType::SupercartRam
    );
    system.run_frame();
    assert_eq!(system.bus().peek(0x4123), 0x5A);

    let saved = system.save_state();
    assert_eq!(saved.len(), SIZE_EXPANSION_RIOT);

    system.bus_mut().write(0x4123, 0x00);
    system.load_state(&saved).expect("load state");
    assert_eq!(system.bus().peek(0x4123), 0x5A);

    assert!(matches!(
        system.load_state(&saved[..SIZE]),
        Err(StateError::MissingExpansionRam)
    ));
}

#[test]
fn warm_load_runs_test_frames_first() {
    let saved = running(COUNTER, 2).save_state();
    let mut system = running(COUNTER, 0);
    system.load_state_warm(&saved).expect("load state");
    assert_eq!(system.frame_count(), 60);
    assert_eq!(system.save_state(), saved);
}

// ============================================================================
// Expansion module
// ============================================================================

#[test]
fn expansion_module_ram_is_banked_and_saved() {
    // LDA #$18 ; STA $0470 ; LDA #$77 ; STA $4000 ; JMP *
    let code = [
        0xA9, 0x18, 0x8D, 0x70, 0x04, 0xA9, 0x77, 0x8D, 0x00, 0x40, 0x4C, 0x0A, 0x80,
    ];
    let mut data = headered(&flat_rom(&code), 0, 0);
    data[63] = 0x01;

    let mut system = ProSystem::new(Atari7800Config::default());
    system.load_cartridge(&data).expect("load");
    assert_eq!(system.query("xm.xctrl"), Some(Value::U8(0)));
    system.run_frame();

    assert_eq!(system.query("xm.xctrl"), Some(Value::U8(0x18)));
    assert_eq!(system.query("xm.bank"), Some(Value::U8(0)));
    assert_eq!(system.bus().peek(0x4000), 0x77);
    assert!(system.bus().pokey_active());

    let saved = system.save_state();
    assert_eq!(saved.len(), SIZE_XM);
    system.bus_mut().write(0x4000, 0x00);
    system.bus_mut().write(0x0470, 0x01);
    system.load_state(&saved).expect("load state");
    assert_eq!(system.query("xm.xctrl"), Some(Value::U8(0x18)));
    assert_eq!(system.bus().peek(0x4000), 0x77);

    system.reset();
    assert_eq!(system.query("xm.xctrl"), Some(Value::U8(0)));
    assert!(!system.bus().pokey_active());

    system.load_cartridge(&flat_rom(COUNTER)).expect("load");
    assert_eq!(system.query("xm.xctrl"), None, "no module without the header bit");
}

// ============================================================================
// BIOS, high score, input
// ============================================================================

#[test]
fn bios_hands_over_through_inptctrl() {
    // BIOS at $F000: LDA #22 ; STA $01. The next fetch comes from the
    // cartridge, which has JMP $8000 at $F004.
    let mut bios = vec![0u8; 0x1000];
    bios[..4].copy_from_slice(&[0xA9, 0x16, 0x85, 0x01]);
    bios[0xFFC] = 0x00;
    bios[0xFFD] = 0xF0;
    let mut rom = flat_rom(COUNTER);
    rom[0x7004..0x7007].copy_from_slice(&[0x4C, 0x00, 0x80]);

    let mut system = ProSystem::new(Atari7800Config::default());
    system.set_bios(Some(Bios::load(&bios).expect("bios")));
    system.load_cartridge(&rom).expect("load");
    assert_eq!(system.cpu().pc(), 0xF000, "BIOS runs first");
    assert_eq!(system.bus().peek(0x8000), 0x00, "cartridge not mapped yet");

    system.run_frame();
    assert_eq!(system.bus().peek(0xFFFD), 0x80, "cartridge mapped");
    assert_eq!(system.bus().peek(0x8000), 0xE6);
    assert!((0x8000..0x8006).contains(&system.cpu().pc()), "cartridge code runs");
}

#[test]
fn high_score_entry_is_tracked_until_release() {
    // JSR $3FFD ; JMP $8003
    let code = [0x20, 0xFD, 0x3F, 0x4C, 0x03, 0x80];
    let mut system = ProSystem::new(Atari7800Config::default());
    system.load_cartridge(&flat_rom(&code)).expect("load");
    system.bus_mut().memory.poke(0x3FFD, 0x60); // RTS
    system.run_frame();

    assert!(system.cpu().high_score_set());
    assert!(!system.high_score_mounted());
    assert!(system.high_score_sram().is_none(), "nothing mounted to save");

    system.load_cartridge(&flat_rom(COUNTER)).expect("load");
    assert!(!system.cpu().high_score_set());
}

#[test]
fn queued_input_reaches_the_riot() {
    let mut system = ProSystem::new(Atari7800Config::default());
    system.load_cartridge(&flat_rom(COUNTER)).expect("load");
    system.input_queue_mut().enqueue_button(Button::Pause, 0, 1);
    system.input_queue_mut().enqueue_button(Button::Up(0), 1, 1);

    // Left difficulty defaults to A; pause pulls bit 3 low.
    system.run_frame();
    assert_eq!(system.query("riot.swchb"), Some(Value::U8(0x77)));
    assert_eq!(system.query("riot.swcha"), Some(Value::U8(0xFF)));

    system.run_frame();
    assert_eq!(system.query("riot.swchb"), Some(Value::U8(0x7F)));
    assert_eq!(system.query("riot.swcha"), Some(Value::U8(0xEF)));
    assert_eq!(system.input_queue_mut().len(), 1);
}

#[test]
fn observable_paths() {
    let system = running(COUNTER, 1);
    assert_eq!(system.query("frame"), Some(Value::U64(1)));
    assert_eq!(system.query("scheduler.scanline"), Some(Value::U16(262)));
    assert_eq!(system.query("memory.$FFFD"), Some(Value::U8(0x80)));
    assert!(system.query("cpu.pc").is_some());
    assert!(system.query("riot.intim").is_some());
    assert_eq!(system.query("nonsense"), None);
}
