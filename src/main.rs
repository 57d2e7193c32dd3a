//! treelight - streams LED animation descriptors to connected trees.
//!
//! Usage: `treelight [settings.json]`

mod config;
mod constants;
mod error;
mod frame;
mod listener;
mod rotation;
mod schedule;
mod session;
mod settings;

use crate::error::{Error, Result};
use crate::listener::Listener;
use crate::schedule::LocalClock;
use crate::settings::Settings;

use log::{error, info};
use std::env;
use std::io;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = match Settings::locate(env::args().nth(1)) {
        Some(path) => {
            info!("Using settings: {}", path.display());
            Settings::load(&path)?
        }
        None => {
            info!("No settings file, using defaults");
            Settings::default()
        }
    };

    info!(
        "Rotation from {}, off descriptor {}, on {}-{}, every {:?}",
        settings.config_dir.display(),
        settings.off_config.display(),
        settings.schedule_start.format("%H:%M"),
        settings.schedule_end.format("%H:%M"),
        settings.tick_period()
    );

    let listener = Listener::new(settings, Arc::new(LocalClock));
    let stop = listener.stop_flag();

    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?;

    listener.start()?.join();

    Ok(())
}
