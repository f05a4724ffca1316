//! Error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Cartridge, BIOS and high-score ROM loading failures.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cartridge image is too small ({0} bytes)")]
    TooSmall(usize),

    #[error("cartridge is in the unsupported CC2 hack format")]
    HackFormat,

    #[error("cartridge header declares {declared} bytes but only {available} follow it")]
    Truncated { declared: usize, available: usize },

    #[error("high score cartridge digest {0} is not the expected image")]
    HighScoreDigest(String),

    #[error("high score SRAM must be {expected} bytes, got {actual}")]
    HighScoreSram { expected: usize, actual: usize },

    #[error("BIOS image must be 1..=65536 bytes, got {0}")]
    BiosSize(usize),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Save-state failures. A rejected state never alters the running machine.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("save state has an invalid size ({0} bytes)")]
    Size(usize),

    #[error("file is not a ProSystem save state")]
    Magic,

    #[error("no cartridge is loaded")]
    NoCartridge,

    #[error("save state digest {state} does not match the loaded cartridge {cartridge}")]
    DigestMismatch { state: String, cartridge: String },

    #[error("save state lacks the expansion RAM block this cartridge needs")]
    MissingExpansionRam,

    #[error("save state I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Cartridge database failures.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("line {line}: bad value {value:?} for {key}")]
    Value {
        line: usize,
        key: &'static str,
        value: String,
    },

    #[error("failed to read database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Configuration file failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
