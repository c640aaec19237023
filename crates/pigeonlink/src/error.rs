use std::io;
use thiserror::Error;

use crate::linkmod::Direction;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("No {0} transport available")]
    NoTransportAvailable(Direction),

    #[error("Linkmod {name} is not available")]
    Unavailable { name: String },

    #[error("Linkmod {name} failed to start: {reason}")]
    StartFailed { name: String, reason: String },

    #[error("Linkmod {name} failed to stop cleanly: {reason}")]
    StopFailed { name: String, reason: String },

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame shorter than its header")]
    Truncated,

    #[error("Frame magic mismatch")]
    BadMagic,

    #[error("Unsupported frame version {0}")]
    UnsupportedVersion(u8),

    #[error("Frame declares {declared} payload bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Frame payload checksum mismatch")]
    ChecksumMismatch,

    #[error("Frame payload of {0} bytes exceeds the wire length field")]
    TooLarge(usize),
}

pub type Result<T> = std::result::Result<T, LinkError>;
