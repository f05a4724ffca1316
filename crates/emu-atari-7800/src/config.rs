//! Machine configuration, loadable from TOML.
//!
//! ```toml
//! wsync = "auto"
//! cycle_stealing = "enabled"
//! lightgun = true
//! high_score = "enabled-snapshots"
//! high_score_rom = "highscore.rom"
//! high_score_sram = "highscore.sram"
//! bios = "7800.rom"
//! database = "prosystem.dat"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// A compatibility feature that can follow the cartridge's flags or be
/// forced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    /// On unless the cartridge flags turn it off.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl FeatureMode {
    /// Whether the feature is on, given that the cartridge asks for it off
    /// when `disabled_by_cartridge`.
    #[must_use]
    pub const fn resolve(self, disabled_by_cartridge: bool) -> bool {
        match self {
            Self::Auto => !disabled_by_cartridge,
            Self::Enabled => true,
            Self::Disabled => false,
        }
    }
}

/// High-score cartridge support.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighScoreMode {
    #[default]
    Disabled,
    /// Mounted by every NTSC power-on reset, but not by the reset that
    /// precedes a save-state load.
    Enabled,
    /// Mounted by every NTSC reset, save-state loads included.
    EnabledSnapshots,
}

impl HighScoreMode {
    /// Whether a reset mounts the cart. `loading_state` is set for the
    /// reset ahead of a save-state load.
    #[must_use]
    pub const fn mounts(self, loading_state: bool) -> bool {
        match self {
            Self::Disabled => false,
            Self::Enabled => !loading_state,
            Self::EnabledSnapshots => true,
        }
    }
}

/// Atari 7800 configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Atari7800Config {
    pub wsync: FeatureMode,
    pub cycle_stealing: FeatureMode,
    /// Allow a lightgun on port 0 when the cartridge asks for one.
    pub lightgun: bool,
    pub high_score: HighScoreMode,
    pub high_score_rom: Option<PathBuf>,
    pub high_score_sram: Option<PathBuf>,
    pub bios: Option<PathBuf>,
    pub database: Option<PathBuf>,
    /// Frames per second to report instead of the region's rate.
    pub frame_rate: Option<u16>,
    /// Quarter-cycles charged per DMA line by the MARIA stand-in.
    pub dma_cost: Option<u32>,
}

impl Atari7800Config {
    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file can't be read, or any
    /// error from [`Atari7800Config::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Atari7800Config::parse("").expect("parse");
        assert_eq!(config, Atari7800Config::default());
        assert_eq!(config.wsync, FeatureMode::Auto);
        assert!(!config.lightgun);
    }

    #[test]
    fn full_file() {
        let config = Atari7800Config::parse(
            r#"
            wsync = "disabled"
            cycle_stealing = "enabled"
            lightgun = true
            high_score = "enabled-snapshots"
            high_score_rom = "hs.rom"
            database = "prosystem.dat"
            frame_rate = 50
            "#,
        )
        .expect("parse");
        assert_eq!(config.wsync, FeatureMode::Disabled);
        assert_eq!(config.cycle_stealing, FeatureMode::Enabled);
        assert_eq!(config.high_score, HighScoreMode::EnabledSnapshots);
        assert_eq!(config.high_score_rom, Some(PathBuf::from("hs.rom")));
        assert_eq!(config.frame_rate, Some(50));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Atari7800Config::parse("turbo = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn feature_resolution() {
        assert!(FeatureMode::Auto.resolve(false));
        assert!(!FeatureMode::Auto.resolve(true));
        assert!(FeatureMode::Enabled.resolve(true));
        assert!(!FeatureMode::Disabled.resolve(false));
    }

    #[test]
    fn high_score_mounting_per_reset() {
        assert!(!HighScoreMode::Disabled.mounts(false));
        assert!(!HighScoreMode::Disabled.mounts(true));
        assert!(HighScoreMode::Enabled.mounts(false));
        assert!(!HighScoreMode::Enabled.mounts(true));
        assert!(HighScoreMode::EnabledSnapshots.mounts(false));
        assert!(HighScoreMode::EnabledSnapshots.mounts(true));
    }
}
