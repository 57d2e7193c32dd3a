//! Error types for treelight.

use std::io;
use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// treelight error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config file does not exist
    #[error("Config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Config file could not be parsed or failed validation
    #[error("Malformed config {}: {reason}", .path.display())]
    ConfigMalformed {
        /// Offending file
        path: PathBuf,
        /// Parser or validation message
        reason: String,
    },

    /// Config holds more entries than a frame has slots for
    #[error("Oversized config: {len} {field}, at most {max} allowed")]
    OversizedConfig {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Every file in the rotation directory failed to load or encode
    #[error("No valid config in {}", .0.display())]
    NoValidConfig(PathBuf),

    /// Peer closed or reset the connection
    #[error("Peer disconnected: {0}")]
    PeerDisconnected(#[source] io::Error),

    /// Bind address stayed in use until the listener was stopped
    #[error("Address {0} is already in use")]
    BindInUse(String),

    /// Settings file rejected
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Classifies a socket error, separating peer hangups from other failures.
    pub fn from_socket(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::TimedOut => Error::PeerDisconnected(e),
            _ => Error::Io(e),
        }
    }

    /// Tests if this error only affects the current tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound(_)
                | Error::ConfigMalformed { .. }
                | Error::OversizedConfig { .. }
                | Error::NoValidConfig(_)
        )
    }
}
