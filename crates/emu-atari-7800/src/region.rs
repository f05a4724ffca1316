//! Video region timing.

/// A scanline range, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub top: u16,
    pub bottom: u16,
}

impl Area {
    /// Lines covered, counting both ends.
    #[must_use]
    pub const fn height(self) -> u16 {
        self.bottom - self.top + 1
    }

    #[must_use]
    pub const fn contains(self, scanline: u16) -> bool {
        scanline >= self.top && scanline <= self.bottom
    }
}

/// Video region. Determines frame rate and the scanline layout MARIA
/// works to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// NTSC: 60 Hz, 262 scanlines.
    #[default]
    Ntsc,
    /// PAL: 50 Hz, 312 scanlines.
    Pal,
}

impl Region {
    /// Decode the header/database region byte. 1 is PAL, anything else
    /// NTSC.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::Pal,
            _ => Self::Ntsc,
        }
    }

    /// The header/database encoding of this region.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Ntsc => 0,
            Self::Pal => 1,
        }
    }

    /// Frames per second.
    #[must_use]
    pub const fn frequency(self) -> u16 {
        match self {
            Self::Ntsc => 60,
            Self::Pal => 50,
        }
    }

    /// Scanlines per frame.
    #[must_use]
    pub const fn scanlines(self) -> u16 {
        match self {
            Self::Ntsc => 262,
            Self::Pal => 312,
        }
    }

    /// Lines MARIA can display. MSTAT leaves VBLANK at `top` and enters
    /// it at `bottom`.
    #[must_use]
    pub const fn display_area(self) -> Area {
        match self {
            Self::Ntsc => Area { top: 16, bottom: 258 },
            Self::Pal => Area { top: 16, bottom: 308 },
        }
    }

    /// Lines shown on a typical television.
    #[must_use]
    pub const fn visible_area(self) -> Area {
        match self {
            Self::Ntsc => Area { top: 26, bottom: 248 },
            Self::Pal => Area { top: 26, bottom: 298 },
        }
    }

    /// Scanline adjustment applied when mapping a lightgun position onto
    /// the 240-line output picture.
    #[must_use]
    pub const fn lightgun_offset(self) -> i32 {
        match self {
            Self::Ntsc => 2,
            Self::Pal => -2,
        }
    }
}
