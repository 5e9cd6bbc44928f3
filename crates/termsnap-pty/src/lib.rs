//! PTY (Pseudo-Terminal) capture for termsnap
//!
//! Runs a command attached to a pseudo-terminal and samples everything it
//! prints into timestamped snapshots for rendering.

pub mod capture;
pub mod pty;

pub use capture::{capture_output, CaptureBuilder, CaptureSession, Frame};
pub use pty::{AsyncPtyMaster, Pty, PtyMaster, PtyProcess};

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to allocate PTY: {0}")]
    AllocationFailed(String),

    #[error("Failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("PTY I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Command did not finish within {0:?}")]
    Timeout(Duration),
}
