// ABOUTME: Error types for readiness polling.
// ABOUTME: Distinguishes a spent attempt budget from an explicit terminal failure.

use std::time::Duration;
use thiserror::Error;

use crate::http::HttpError;

/// A single failed probe attempt. Never fatal on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProbeError(pub String);

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<HttpError> for ProbeError {
    fn from(err: HttpError) -> Self {
        ProbeError(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid poll settings: {0}")]
    InvalidSpec(String),

    #[error(
        "timed out after {} seconds waiting for {target} ({attempts} attempts{})",
        format_secs(.timeout),
        format_last(.last)
    )]
    Timeout {
        target: String,
        timeout: Duration,
        attempts: u32,
        last: Option<String>,
    },

    #[error("{target} failed: {reason}")]
    Failed { target: String, reason: String },
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }
}

fn format_secs(timeout: &Duration) -> String {
    let secs = timeout.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", timeout.as_secs())
    } else {
        format!("{secs}")
    }
}

fn format_last(last: &Option<String>) -> String {
    match last {
        Some(reason) => format!("; last: {reason}"),
        None => String::new(),
    }
}
