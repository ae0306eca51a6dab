// ABOUTME: HTTP health check settings for a launched server.
// ABOUTME: Converted into an HttpProbe plus a PollSpec at use time.

use serde::Deserialize;
use std::time::Duration;

use super::error::ConfigError;
use crate::http::Method;
use crate::poll::PollSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub expect_status: Option<u16>,

    #[serde(default)]
    pub expect_body: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default, with = "humantime_serde")]
    pub attempt_timeout: Option<Duration>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            method: default_method(),
            body: None,
            expect_status: None,
            expect_body: None,
            timeout: default_timeout(),
            interval: default_interval(),
            attempt_timeout: None,
        }
    }
}

fn default_path() -> String {
    "/health".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

impl HealthConfig {
    pub fn http_method(&self) -> Result<Method, ConfigError> {
        Method::parse(&self.method).ok_or_else(|| {
            ConfigError::Invalid(format!("unsupported health check method: {}", self.method))
        })
    }

    pub fn poll_spec(&self) -> PollSpec {
        PollSpec {
            timeout: self.timeout,
            interval: self.interval,
            attempt_timeout: self.attempt_timeout,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http_method()?;
        if !self.path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "server.health.path must start with '/'".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "server.health.interval must be greater than zero".to_string(),
            ));
        }
        if self.attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid(
                "server.health.attempt_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
