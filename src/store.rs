// ABOUTME: Process-wide key/value storage shared between pipeline steps.
// ABOUTME: MemoryStore for tests; WorkflowEnvStore persists through $GITHUB_ENV.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

/// Environment variable naming the file that later steps load as their environment.
pub const GITHUB_ENV: &str = "GITHUB_ENV";

/// Key/value state visible to every step of one workflow run.
pub trait EnvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// In-memory store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.lock().remove(key)
    }
}

impl EnvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by the process environment and the runner's env file.
///
/// Reads check values written during this process first, then the real
/// environment. Writes are kept in-process and appended to the env file
/// (when one is configured) so subsequent steps inherit them.
#[derive(Debug)]
pub struct WorkflowEnvStore {
    env_file: Option<PathBuf>,
    overlay: Mutex<HashMap<String, String>>,
}

impl WorkflowEnvStore {
    /// Build a store from `$GITHUB_ENV`; without it writes stay in-process.
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(GITHUB_ENV).map(PathBuf::from))
    }

    pub fn new(env_file: Option<PathBuf>) -> Self {
        Self {
            env_file,
            overlay: Mutex::new(HashMap::new()),
        }
    }

    fn append(&self, key: &str, value: &str) -> io::Result<()> {
        let Some(path) = &self.env_file else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(env_file_entry(key, value).as_bytes())
    }
}

impl EnvStore for WorkflowEnvStore {
    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overlay.lock().get(key) {
            return Some(value.clone());
        }
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.append(key, value)?;
        self.overlay
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Format one env file entry, using the heredoc form for multi-line values.
pub(crate) fn env_file_entry(key: &str, value: &str) -> String {
    if value.contains('\n') {
        let mut delimiter = String::from("STEPGUARD_EOF");
        while value.contains(&delimiter) {
            delimiter.push('_');
        }
        format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{key}={value}\n")
    }
}
