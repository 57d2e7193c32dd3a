use crate::error::{Error, Result};

use log::debug;
use serde::Deserialize;
use std::convert::TryFrom;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// A single LED color, parsed from `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Returned when a color string is not six hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color {0:?}, expected #RRGGBB")]
pub struct ParseColorError(String);

impl Color {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// Bytes in the order the tree firmware reads them: green, red, blue.
    pub fn to_wire(self) -> [u8; 3] {
        [self.green, self.red, self.blue]
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim_start_matches('#');

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()));

        Ok(Color::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// One animation definition, loaded from a JSON file.
///
/// `color_count` and `step_count` are not stored: they are the lengths of
/// `colors` and `steps`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub active: u16,
    pub led_count: u16,
    pub step_shift: u16,
    pub color_shift: u16,
    pub step_delay: u16,
    pub led_interval: u16,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub steps: Vec<u8>,
}

impl Config {
    /// Loads a config from a path.
    pub fn load(p: &Path) -> Result<Config> {
        debug!("Loading config file: {}", p.display());

        let text = fs::read_to_string(p).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::ConfigNotFound(p.to_path_buf()),
            io::ErrorKind::InvalidData => Error::ConfigMalformed {
                path: p.to_path_buf(),
                reason: "file is not valid UTF-8".to_string(),
            },
            _ => Error::Io(e),
        })?;

        serde_json::from_str(&text).map_err(|e| Error::ConfigMalformed {
            path: p.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
