//! Server settings.
//!
//! Loaded from an optional JSON file; every key has a default so an empty
//! object (or no file at all) runs the stock evening schedule on port 3355.

use crate::constants;
use crate::error::{Error, Result};
use crate::schedule::Schedule;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings for the listener and its sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bind_host: String,
    pub bind_port: u16,
    #[serde(deserialize_with = "hhmm")]
    pub schedule_start: NaiveTime,
    #[serde(deserialize_with = "hhmm")]
    pub schedule_end: NaiveTime,
    pub tick_period_seconds: f64,
    /// Directory of rotation configs
    pub config_dir: PathBuf,
    /// Descriptor sent outside the schedule window
    pub off_config: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let (sh, sm) = constants::DEFAULT_SCHEDULE_START;
        let (eh, em) = constants::DEFAULT_SCHEDULE_END;

        Settings {
            bind_host: constants::DEFAULT_BIND_HOST.to_string(),
            bind_port: constants::DEFAULT_BIND_PORT,
            schedule_start: NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or(NaiveTime::MIN),
            schedule_end: NaiveTime::from_hms_opt(eh, em, 0).unwrap_or(NaiveTime::MIN),
            tick_period_seconds: constants::DEFAULT_TICK_PERIOD_SECONDS,
            config_dir: PathBuf::from(constants::DEFAULT_CONFIG_DIR),
            off_config: PathBuf::from(constants::DEFAULT_OFF_CONFIG),
        }
    }
}

fn hhmm<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<NaiveTime, D::Error> {
    let s = String::deserialize(d)?;

    NaiveTime::parse_from_str(&s, "%H:%M")
        .map_err(|e| serde::de::Error::custom(format!("bad time {:?} ({}), expected HH:MM", s, e)))
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(p: &Path) -> Result<Settings> {
        let f = File::open(p).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::InvalidSettings(format!("{} does not exist", p.display())),
            _ => Error::Io(e),
        })?;

        let settings: Settings = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| Error::InvalidSettings(format!("{}: {}", p.display(), e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Picks the settings file to use: an explicit path if one was given,
    /// otherwise `treelight/settings.json` under the user config directory
    /// if it exists.
    pub fn locate(arg: Option<String>) -> Option<PathBuf> {
        if let Some(a) = arg {
            return Some(PathBuf::from(a));
        }

        let default = dirs::config_dir()?.join("treelight").join("settings.json");

        if default.is_file() {
            Some(default)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<()> {
        let period = self.tick_period_seconds;

        if !period.is_finite() || period <= 0.0 || period > constants::MAX_TICK_PERIOD_SECONDS {
            return Err(Error::InvalidSettings(format!(
                "tick_period_seconds must be in (0, {}], got {}",
                constants::MAX_TICK_PERIOD_SECONDS,
                period
            )));
        }

        Ok(())
    }

    /// Address string for the listener, e.g. `0.0.0.0:3355`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.schedule_start, self.schedule_end)
    }

    /// Tick period, clamped to `[0, MAX_TICK_PERIOD_SECONDS]` for settings built
    /// without going through `load`.
    pub fn tick_period(&self) -> Duration {
        let secs = self.tick_period_seconds.max(0.0).min(constants::MAX_TICK_PERIOD_SECONDS);
        Duration::from_secs_f64(secs)
    }
}
