// ABOUTME: Settings for launching the installed binary as a background server.
// ABOUTME: Covers argv, environment, log file, health check, and shutdown policy.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::env_value::{EnvValue, resolve_env_map};
use super::error::ConfigError;
use super::health::HealthConfig;
use crate::process::ProcessSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// Send SIGKILL when SIGTERM is ignored for `stop_timeout`.
    #[serde(default = "default_forceful")]
    pub forceful: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_forceful() -> bool {
    true
}

impl ServerConfig {
    /// Base URL the server listens on, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url(), self.health.path)
    }

    /// Launch spec for `binary`; `{port}` in args is replaced with the port.
    pub fn process_spec(&self, binary: &Path) -> Result<ProcessSpec, ConfigError> {
        let port = self.port.to_string();
        let mut spec = ProcessSpec::new(binary)
            .args(self.args.iter().map(|arg| arg.replace("{port}", &port)));

        for (key, value) in resolve_env_map(&self.env)? {
            spec = spec.env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            spec = spec.working_dir(dir);
        }
        if let Some(log_file) = &self.log_file {
            spec = spec.log_file(log_file);
        }
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid(
                "server.port must be non-zero".to_string(),
            ));
        }
        self.health.validate()
    }
}
