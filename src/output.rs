// ABOUTME: Workflow-facing output: progress messages, annotations, step outputs and secret masking.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::store::env_file_entry;

/// Environment variable naming the file that receives step outputs.
pub const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Registers values that the surrounding log capture must redact.
pub trait SecretMasker: Send + Sync {
    fn mask(&self, value: &str);
}

/// Masks values by emitting `::add-mask::` workflow commands on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowMasker;

impl SecretMasker for WorkflowMasker {
    fn mask(&self, value: &str) {
        // Each line of a multi-line secret has to be registered separately.
        for line in value.lines().filter(|l| !l.trim().is_empty()) {
            println!("::add-mask::{line}");
        }
    }
}

/// Records masked values in memory.
#[derive(Debug, Default)]
pub struct RecordingMasker {
    masked: Mutex<Vec<String>>,
}

impl RecordingMasker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masked(&self) -> Vec<String> {
        self.masked.lock().clone()
    }

    pub fn is_masked(&self, value: &str) -> bool {
        self.masked.lock().iter().any(|v| v == value)
    }
}

impl SecretMasker for RecordingMasker {
    fn mask(&self, value: &str) {
        self.masked.lock().push(value.to_string());
    }
}

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    output_file: Option<PathBuf>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            output_file: std::env::var_os(GITHUB_OUTPUT).map(PathBuf::from),
        }
    }

    /// Override where step outputs are written.
    pub fn with_output_file(mut self, path: Option<PathBuf>) -> Self {
        self.output_file = path;
        self
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.emit_json("success", message, false),
        }
    }

    /// Emit a warning annotation.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.emit_json("warning", message, true),
            _ => println!("::warning::{}", escape_annotation(message)),
        }
    }

    /// Emit an error annotation.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                println!("::error::{}", escape_annotation(message));
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit_json("error", message, true),
        }
    }

    /// Publish a step output for later steps.
    ///
    /// Falls back to printing `name=value` when no output file is configured.
    pub fn set_output(&self, name: &str, value: &str) -> io::Result<()> {
        match &self.output_file {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(env_file_entry(name, value).as_bytes())
            }
            None => {
                if self.mode == OutputMode::Json {
                    let event = OutputEvent {
                        event: "output",
                        name,
                        value,
                    };
                    if let Ok(json) = serde_json::to_string(&event) {
                        println!("{json}");
                    }
                } else {
                    println!("{name}={value}");
                }
                Ok(())
            }
        }
    }

    fn emit_json(&self, event: &str, message: &str, to_stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: if self.start_time.is_some() {
                Some(self.elapsed_secs())
            } else {
                None
            },
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

/// Escape characters that terminate or corrupt a workflow command.
fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct OutputEvent<'a> {
    event: &'a str,
    name: &'a str,
    value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_escaping() {
        assert_eq!(escape_annotation("50% done\nnext"), "50%25 done%0Anext");
    }

    #[test]
    fn recording_masker_tracks_values() {
        let masker = RecordingMasker::new();
        masker.mask("secret");
        assert!(masker.is_masked("secret"));
        assert!(!masker.is_masked("other"));
    }

    #[test]
    fn set_output_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        let output = Output::new(OutputMode::Quiet).with_output_file(Some(path.clone()));

        output.set_output("server-pid", "1234").unwrap();
        output.set_output("server-url", "http://127.0.0.1:8080").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "server-pid=1234\nserver-url=http://127.0.0.1:8080\n"
        );
    }
}
