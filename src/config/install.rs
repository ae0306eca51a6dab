// ABOUTME: Settings for downloading the tool binary and its optional dependencies.
// ABOUTME: Retry and timeout defaults match the fetcher's.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ConfigError;
use super::require_http_url;
use crate::fetch::FetchJob;

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub url: String,

    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    pub binary_name: String,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff", with = "humantime_serde")]
    pub backoff: Duration,

    #[serde(default = "default_attempt_timeout", with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Commands run after the download, each given as an argv list.
    #[serde(default)]
    pub dependencies: Vec<Vec<String>>,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(".stepguard/bin")
}

fn default_retries() -> u32 {
    3
}

fn default_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(60)
}

impl InstallConfig {
    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary_name)
    }

    pub fn fetch_job(&self) -> FetchJob {
        FetchJob::new(self.url.clone(), self.binary_path())
            .max_retries(self.retries)
            .backoff_base(self.backoff)
            .attempt_timeout(self.attempt_timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("install.url", &self.url)?;
        if self.binary_name.is_empty() || self.binary_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(
                "install.binary_name must be a plain file name".to_string(),
            ));
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid(
                "install.retries must be at least 1".to_string(),
            ));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "install.attempt_timeout must be greater than zero".to_string(),
            ));
        }
        if self.dependencies.iter().any(|argv| argv.is_empty()) {
            return Err(ConfigError::Invalid(
                "install.dependencies entries must name a program".to_string(),
            ));
        }
        Ok(())
    }
}
