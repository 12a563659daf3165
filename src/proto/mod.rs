use std::time::Duration;
use thiserror::Error;

use crate::frame::FrameError;

pub mod codec;
pub mod command;
#[cfg(test)]
pub(crate) mod fake;

pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors while talking to the meter.
///
/// All variants are recoverable, the next reading cycle
/// may be started after any of them.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No data received within {0:?}")]
    Timeout(Duration),
    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("Communication aborted")]
    Abort,
}
