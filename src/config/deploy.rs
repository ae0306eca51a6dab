// ABOUTME: Settings for triggering and awaiting a remote deployment.

use serde::Deserialize;
use std::time::Duration;

use super::env_value::EnvValue;
use super::error::ConfigError;
use super::require_http_url;
use crate::deploy::DeployRequest;
use crate::poll::PollSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    pub api_url: String,
    pub application: String,
    pub version: EnvValue,
    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

impl DeployConfig {
    pub fn request(&self) -> Result<DeployRequest, ConfigError> {
        let version = self.version.resolve()?;
        Ok(DeployRequest::new(self.application.clone(), version)
            .environment(self.environment.clone()))
    }

    pub fn poll_spec(&self) -> PollSpec {
        PollSpec::new(self.timeout, self.interval)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("deploy.api_url", &self.api_url)?;
        if self.application.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "deploy.application must not be empty".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "deploy.interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
