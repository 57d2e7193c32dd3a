use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{self, Frame};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A config chosen by the rotation, already encoded.
#[derive(Debug, Clone)]
pub struct Selection {
    pub path: PathBuf,
    pub frame: Frame,
}

/// Cycles through the configs of a directory in shuffled order.
///
/// The directory listing is cached in `known_files`. Whenever the set of
/// names on disk differs from it, the order is reshuffled and traversal
/// restarts from the first entry.
pub struct Rotation<R: Rng = StdRng> {
    known_files: BTreeSet<String>,
    order: Vec<String>,
    cursor: Option<usize>,
    last_served: Option<String>,
    rng: R,
}

impl Rotation<StdRng> {
    /// Creates a rotation seeded from system entropy.
    pub fn new() -> Self {
        Rotation::with_rng(StdRng::from_entropy())
    }
}

impl Default for Rotation<StdRng> {
    fn default() -> Self {
        Rotation::new()
    }
}

impl<R: Rng> Rotation<R> {
    pub fn with_rng(rng: R) -> Self {
        Rotation {
            known_files: BTreeSet::new(),
            order: Vec::new(),
            cursor: None,
            last_served: None,
            rng: rng,
        }
    }

    /// Current traversal order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Index in `order()` of the most recently attempted file.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Advances to the next loadable config in `dir`.
    ///
    /// Each file in the current order is attempted at most once per call.
    /// Returns `NoValidConfig` if none of them loads and encodes.
    pub fn next(&mut self, dir: &Path) -> Result<Selection> {
        let listing = list_configs(dir);

        if listing != self.known_files {
            self.reload(listing);
        }

        let len = self.order.len();

        for _ in 0..len {
            let idx = match self.cursor {
                Some(c) => (c + 1) % len,
                None => 0,
            };

            self.cursor = Some(idx);

            let path = dir.join(&self.order[idx]);

            match Config::load(&path).and_then(|c| frame::encode(&c)) {
                Ok(frame) => {
                    debug!(
                        "Selected config {} (active {}, {} leds)",
                        path.display(),
                        frame.active(),
                        frame.led_count()
                    );
                    self.last_served = Some(self.order[idx].clone());
                    return Ok(Selection { path, frame });
                }
                Err(e) => {
                    warn!("Skipping config: {}", e);
                }
            }
        }

        Err(Error::NoValidConfig(dir.to_path_buf()))
    }

    fn reload(&mut self, listing: BTreeSet<String>) {
        info!("Config directory changed ({} files), reshuffling", listing.len());

        let mut order: Vec<String> = listing.iter().cloned().collect();
        order.shuffle(&mut self.rng);

        // Keep the last served file from playing twice in a row across a reload.
        if order.len() > 1 && self.last_served.as_ref() == order.first() {
            order.rotate_left(1);
        }

        self.known_files = listing;
        self.order = order;
        self.cursor = None;
    }
}

/// Lists the names of the `*.json` files in `dir`.
/// An unreadable directory lists as empty.
fn list_configs(dir: &Path) -> BTreeSet<String> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            return BTreeSet::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect()
}
