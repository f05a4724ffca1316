//! Headless Atari 7800 runner.
//!
//! Loads a cartridge (plus optional BIOS, database and high-score cart),
//! runs a number of frames and reports the machine state.

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use emu_atari_7800::{Atari7800Config, Bios, Database, HighScoreCart, ProSystem};
use emu_core::Observable;
use log::info;

/// Atari 7800 emulator CLI
#[derive(Parser, Debug)]
#[command(name = "emu-atari-7800")]
#[command(about = "Headless Atari 7800 emulator", long_about = None)]
struct Args {
    /// Cartridge image (.a78 or headerless .bin)
    #[arg(short, long)]
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cartridge database (overrides the config)
    #[arg(long)]
    database: Option<PathBuf>,

    /// BIOS image (overrides the config)
    #[arg(long)]
    bios: Option<PathBuf>,

    /// Save state to restore before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Where to write a save state after running
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Dump CPU registers after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => Atari7800Config::load(path)?,
        None => Atari7800Config::default(),
    };
    if args.database.is_some() {
        config.database.clone_from(&args.database);
    }
    if args.bios.is_some() {
        config.bios.clone_from(&args.bios);
    }

    let mut system = ProSystem::new(config.clone());
    if let Some(path) = &config.database {
        let database = Database::load(path)?;
        info!("database: {} entries", database.len());
        system.set_database(Some(database));
    }
    if let Some(path) = &config.bios {
        system.set_bios(Some(Bios::from_file(path)?));
    }
    if let Some(rom) = &config.high_score_rom {
        let cart = HighScoreCart::from_files(rom, config.high_score_sram.as_deref())?;
        system.set_high_score_cart(Some(cart));
    }

    let rom = std::fs::read(&args.rom).map_err(|e| format!("{}: {e}", args.rom.display()))?;
    system.load_cartridge(&rom)?;

    if let Some(path) = &args.load_state {
        system.load_state_file(path)?;
    }

    info!("running {} frames at {} fps", args.frames, system.frame_rate());
    for _ in 0..args.frames {
        system.run_frame();
    }
    let stats = system.scheduler().stats();
    info!(
        "completed {} frames; last frame: {} instructions, {} WSYNC halts, {} DMA cycles",
        system.frame_count(),
        stats.instructions,
        stats.wsync_halts,
        stats.dma_cycles
    );

    if let Some(path) = &args.save_state {
        system.save_state_file(path)?;
        info!("state saved to {}", path.display());
    }
    if let Some(path) = &config.high_score_sram {
        system.save_high_score_sram(path)?;
    }

    if args.dump_cpu {
        dump_cpu_state(&system);
    }
    Ok(())
}

fn dump_cpu_state(system: &ProSystem) {
    println!("CPU state:");
    for reg in ["pc", "a", "x", "y", "s", "p"] {
        if let Some(value) = system.query(&format!("cpu.{reg}")) {
            println!("  {:<3} {value}", reg.to_uppercase());
        }
    }
    if let Some(value) = system.query("cartridge.bank") {
        println!("  bank {value}");
    }
}
