//! Per-cartridge settings database (`prosystem.dat`).
//!
//! Each record is a `[digest]` line followed by `key=value` lines. The
//! first seven are positional (title, type, pokey, controller1,
//! controller2, region, flags); up to ten more are recognised by key.
//!
//! ```text
//! [4332c24e4f3bc72e7fe1b77adf66c2b7]
//! title=3D Asteroids
//! type=0
//! pokey=false
//! controller1=1
//! controller2=1
//! region=0
//! flags=0
//! hblank=32
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};

use crate::cartridge::{Cartridge, CartridgeType};
use crate::error::DatabaseError;
use crate::region::Region;

/// Lines read after the digest line.
const RECORD_LINES: usize = 17;
/// Positional lines at the start of a record.
const POSITIONAL_LINES: usize = 7;

/// Settings for one cartridge. Optional fields leave the header value
/// in place when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub title: String,
    pub kind: CartridgeType,
    pub pokey: bool,
    pub controllers: [u8; 2],
    pub region: Region,
    pub flags: u32,
    pub crosshair_x: Option<i32>,
    pub crosshair_y: Option<i32>,
    pub hblank: Option<u32>,
    pub dual_analog: Option<bool>,
    pub pokey450: Option<bool>,
    pub xm: Option<bool>,
    pub disable_bios: Option<bool>,
    pub left_switch: Option<u8>,
    pub right_switch: Option<u8>,
    pub swap_buttons: Option<bool>,
}

impl DatabaseEntry {
    /// Overwrite the cartridge's settings with this entry's.
    pub fn apply(&self, cartridge: &mut Cartridge) {
        cartridge.title.clone_from(&self.title);
        cartridge.kind = self.kind;
        cartridge.pokey = self.pokey;
        cartridge.controllers = self.controllers;
        cartridge.region = self.region;
        cartridge.flags = self.flags;

        if let Some(x) = self.crosshair_x {
            cartridge.crosshair_x = x;
        }
        if let Some(y) = self.crosshair_y {
            cartridge.crosshair_y = y;
        }
        if let Some(hblank) = self.hblank {
            cartridge.hblank = hblank;
        }
        if let Some(dual_analog) = self.dual_analog {
            cartridge.dual_analog = dual_analog;
        }
        if let Some(pokey450) = self.pokey450 {
            cartridge.pokey450 = pokey450;
            if pokey450 {
                cartridge.pokey = true;
            }
        }
        if let Some(xm) = self.xm {
            cartridge.xm = xm;
        }
        if let Some(disable_bios) = self.disable_bios {
            cartridge.disable_bios = disable_bios;
        }
        if let Some(left) = self.left_switch {
            cartridge.left_switch = left;
        }
        if let Some(right) = self.right_switch {
            cartridge.right_switch = right;
        }
        if let Some(swap) = self.swap_buttons {
            cartridge.swap_buttons = swap;
        }
    }
}

/// Parsed database, keyed by image digest.
#[derive(Debug, Default, Clone)]
pub struct Database {
    entries: HashMap<String, DatabaseEntry>,
}

/// Text after the last `=`.
fn value(line: &str) -> &str {
    line.rfind('=').map_or(line, |i| &line[i + 1..]).trim()
}

fn parse_number<T: FromStr>(
    line_no: usize,
    key: &'static str,
    text: &str,
) -> Result<T, DatabaseError> {
    text.parse().map_err(|_| DatabaseError::Value {
        line: line_no,
        key,
        value: text.to_owned(),
    })
}

fn parse_bool(line_no: usize, key: &'static str, text: &str) -> Result<bool, DatabaseError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(DatabaseError::Value {
            line: line_no,
            key,
            value: text.to_owned(),
        }),
    }
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse database text.
    ///
    /// A record ends after 17 value lines, at the next `[` line, or at
    /// end of input.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Value`] for missing positional lines or
    /// values that don't parse.
    pub fn parse(text: &str) -> Result<Self, DatabaseError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut entries = HashMap::new();
        let mut index = 0;

        while index < lines.len() {
            let line = lines[index].trim_end_matches('\r');
            index += 1;
            let Some(digest) = line
                .strip_prefix('[')
                .and_then(|rest| rest.get(..32))
                .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            else {
                continue;
            };

            let start = index;
            let mut record = Vec::with_capacity(RECORD_LINES);
            while record.len() < RECORD_LINES && index < lines.len() {
                let entry = lines[index].trim_end_matches('\r');
                if entry.starts_with('[') {
                    break;
                }
                record.push(entry);
                index += 1;
            }

            let entry = Self::parse_record(start, &record)?;
            entries.insert(digest.to_ascii_lowercase(), entry);
        }

        info!("database: {} entries", entries.len());
        Ok(Self { entries })
    }

    fn parse_record(start: usize, record: &[&str]) -> Result<DatabaseEntry, DatabaseError> {
        const KEYS: [&str; POSITIONAL_LINES] = [
            "title",
            "type",
            "pokey",
            "controller1",
            "controller2",
            "region",
            "flags",
        ];
        if record.len() < POSITIONAL_LINES {
            return Err(DatabaseError::Value {
                line: start + record.len() + 1,
                key: KEYS[record.len()],
                value: String::new(),
            });
        }

        // 1-based line number of record line `i`.
        let at = |i: usize| start + i + 1;
        let positional = |i: usize| value(record[i]);

        let type_code: u8 = parse_number(at(1), KEYS[1], positional(1))?;
        let kind = CartridgeType::from_code(type_code).ok_or_else(|| DatabaseError::Value {
            line: at(1),
            key: KEYS[1],
            value: positional(1).to_owned(),
        })?;

        let mut entry = DatabaseEntry {
            title: positional(0).to_owned(),
            kind,
            pokey: parse_bool(at(2), KEYS[2], positional(2))?,
            controllers: [
                parse_number(at(3), KEYS[3], positional(3))?,
                parse_number(at(4), KEYS[4], positional(4))?,
            ],
            region: Region::from_byte(parse_number(at(5), KEYS[5], positional(5))?),
            flags: parse_number(at(6), KEYS[6], positional(6))?,
            crosshair_x: None,
            crosshair_y: None,
            hblank: None,
            dual_analog: None,
            pokey450: None,
            xm: None,
            disable_bios: None,
            left_switch: None,
            right_switch: None,
            swap_buttons: None,
        };

        for (i, line) in record.iter().enumerate().skip(POSITIONAL_LINES) {
            let line_no = at(i);
            let text = value(line);
            if line.contains("crossx") {
                entry.crosshair_x = Some(parse_number(line_no, "crossx", text)?);
            }
            if line.contains("crossy") {
                entry.crosshair_y = Some(parse_number(line_no, "crossy", text)?);
            }
            if line.contains("hblank") {
                entry.hblank = Some(parse_number(line_no, "hblank", text)?);
            }
            if line.contains("dualanalog") {
                entry.dual_analog = Some(parse_bool(line_no, "dualanalog", text)?);
            }
            if line.contains("pokey450") {
                entry.pokey450 = Some(parse_bool(line_no, "pokey450", text)?);
            }
            if line.contains("xm") {
                entry.xm = Some(parse_bool(line_no, "xm", text)?);
            }
            if line.contains("disablebios") {
                entry.disable_bios = Some(parse_bool(line_no, "disablebios", text)?);
            }
            if line.contains("leftswitch") {
                entry.left_switch = Some(parse_number(line_no, "leftswitch", text)?);
            }
            if line.contains("rightswitch") {
                entry.right_switch = Some(parse_number(line_no, "rightswitch", text)?);
            }
            if line.contains("swapbuttons") {
                entry.swap_buttons = Some(parse_bool(line_no, "swapbuttons", text)?);
            }
        }

        Ok(entry)
    }

    /// Read and parse a database file.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Io`] if the file can't be read, or any
    /// error from [`Database::parse`].
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let text = std::fs::read_to_string(path).map_err(|source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    #[must_use]
    pub fn lookup(&self, digest: &str) -> Option<&DatabaseEntry> {
        self.entries.get(&digest.to_ascii_lowercase())
    }

    /// Apply the matching entry, if any. Returns whether one was found.
    pub fn apply(&self, cartridge: &mut Cartridge) -> bool {
        match self.lookup(cartridge.digest()) {
            Some(entry) => {
                debug!("database: {:?} ({})", entry.title, cartridge.digest());
                entry.apply(cartridge);
                true
            }
            None => {
                debug!("database: no entry for {}", cartridge.digest());
                false
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "0123456789abcdef0123456789abcdef";

    fn record(extra: &str) -> String {
        format!(
            "[{DIGEST}]\r\ntitle=Food Fight\r\ntype=1\r\npokey=true\r\ncontroller1=2\r\n\
             controller2=1\r\nregion=1\r\nflags=3\r\n{extra}"
        )
    }

    #[test]
    fn positional_fields() {
        let db = Database::parse(&record("")).expect("parse");
        let entry = db.lookup(DIGEST).expect("entry");
        assert_eq!(entry.title, "Food Fight");
        assert_eq!(entry.kind, CartridgeType::Supercart);
        assert!(entry.pokey);
        assert_eq!(entry.controllers, [2, 1]);
        assert_eq!(entry.region, Region::Pal);
        assert_eq!(entry.flags, 3);
        assert_eq!(entry.hblank, None);
    }

    #[test]
    fn keyed_fields() {
        let db = Database::parse(&record(
            "crossx=-4\nhblank=32\npokey450=1\nswapbuttons=true\nleftswitch=0\n",
        ))
        .expect("parse");
        let entry = db.lookup(&DIGEST.to_uppercase()).expect("entry");
        assert_eq!(entry.crosshair_x, Some(-4));
        assert_eq!(entry.hblank, Some(32));
        assert_eq!(entry.pokey450, Some(true));
        assert_eq!(entry.swap_buttons, Some(true));
        assert_eq!(entry.left_switch, Some(0));
        assert_eq!(entry.xm, None);
    }

    #[test]
    fn value_after_last_equals() {
        let db = Database::parse(&record("").replace("Food Fight", "a=b=Title")).expect("parse");
        assert_eq!(db.lookup(DIGEST).expect("entry").title, "Title");
    }

    #[test]
    fn records_stop_at_next_digest() {
        let text = format!(
            "{}[ffffffffffffffffffffffffffffffff]\ntitle=B\ntype=0\npokey=false\n\
             controller1=1\ncontroller2=1\nregion=0\nflags=0\n",
            record("")
        );
        let db = Database::parse(&text).expect("parse");
        assert_eq!(db.len(), 2);
        assert_eq!(
            db.lookup("ffffffffffffffffffffffffffffffff")
                .expect("entry")
                .title,
            "B"
        );
    }

    #[test]
    fn bad_values_are_errors() {
        let text = record("").replace("type=1", "type=9");
        assert!(matches!(
            Database::parse(&text),
            Err(DatabaseError::Value { key: "type", line: 3, .. })
        ));
        let text = format!("[{DIGEST}]\ntitle=Short\n");
        assert!(matches!(
            Database::parse(&text),
            Err(DatabaseError::Value { key: "type", .. })
        ));
    }

    #[test]
    fn apply_overwrites_cartridge() {
        let db = Database::parse(&record("hblank=40\npokey450=true\n")).expect("parse");
        let mut cartridge = Cartridge::load(&vec![0; 0x8000]).expect("load");
        assert!(!db.apply(&mut cartridge));

        let entry = db.lookup(DIGEST).expect("entry");
        entry.apply(&mut cartridge);
        assert_eq!(cartridge.kind(), CartridgeType::Supercart);
        assert_eq!(cartridge.hblank(), 40);
        assert!(cartridge.has_pokey());
        assert_eq!(cartridge.pokey_base(), 0x0450);
        assert_eq!(cartridge.region(), Region::Pal);
        assert_eq!(cartridge.controllers(), [2, 1]);
    }
}
