// ABOUTME: Error types for process supervision.
// ABOUTME: Spawn failures, missing process ids and undeliverable signals are all terminal.

use std::path::PathBuf;
use thiserror::Error;

use super::signal::Signal;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("spawned {} but no process id was reported", .program.display())]
    MissingPid { program: PathBuf },

    #[error("failed to open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to send {signal} to process {pid}: {source}")]
    Signal {
        pid: u32,
        signal: Signal,
        source: std::io::Error,
    },
}
