// ABOUTME: Configuration types and parsing for stepguard.yml.
// ABOUTME: Handles file discovery, YAML parsing, and validation before any action runs.

mod auth;
mod deploy;
mod env_value;
mod error;
mod health;
mod install;
mod server;

pub use auth::AuthConfig;
pub use deploy::DeployConfig;
pub use env_value::{EnvValue, resolve_env_map};
pub use error::ConfigError;
pub use health::HealthConfig;
pub use install::InstallConfig;
pub use server::ServerConfig;

use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "stepguard.yml";
pub const CONFIG_FILENAME_ALT: &str = "stepguard.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stepguard/config.yml";

pub const DEFAULT_ENV_PREFIX: &str = "STEPGUARD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Prefix of every variable exported for later steps.
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    #[serde(default)]
    pub install: Option<InstallConfig>,

    #[serde(default)]
    pub server: Option<ServerConfig>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub deploy: Option<DeployConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_prefix: default_env_prefix(),
            install: None,
            server: None,
            auth: None,
            deploy: None,
        }
    }
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(ConfigError::NotFound(dir.to_path_buf()))
    }

    /// Check every present section. Sections an action needs but which are
    /// absent are reported by the `require_*` accessors instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix_ok = !self.env_prefix.is_empty()
            && self
                .env_prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !prefix_ok {
            return Err(ConfigError::Invalid(
                "env_prefix must be upper-case letters, digits, or '_'".to_string(),
            ));
        }

        if let Some(install) = &self.install {
            install.validate()?;
        }
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        if let Some(deploy) = &self.deploy {
            deploy.validate()?;
        }
        Ok(())
    }

    pub fn require_install(&self) -> Result<&InstallConfig, ConfigError> {
        self.install.as_ref().ok_or(ConfigError::MissingSection("install"))
    }

    pub fn require_auth(&self) -> Result<&AuthConfig, ConfigError> {
        self.auth.as_ref().ok_or(ConfigError::MissingSection("auth"))
    }

    pub fn require_deploy(&self) -> Result<&DeployConfig, ConfigError> {
        self.deploy.as_ref().ok_or(ConfigError::MissingSection("deploy"))
    }

    /// Name of an exported variable, e.g. `STEPGUARD_SERVER_URL`.
    pub fn env_key(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }
}

pub(crate) fn require_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "{field} must be an http(s) URL"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.env_prefix, "STEPGUARD");
        assert!(config.install.is_none());
        assert!(matches!(
            config.require_install(),
            Err(ConfigError::MissingSection("install"))
        ));
    }

    #[test]
    fn install_defaults() {
        let config = Config::from_yaml(
            "install:\n  url: https://example.com/tool.tar\n  binary_name: tool\n",
        )
        .unwrap();
        let install = config.require_install().unwrap();
        assert_eq!(install.retries, 3);
        assert_eq!(install.backoff, Duration::from_secs(1));
        assert_eq!(install.attempt_timeout, Duration::from_secs(60));
        assert_eq!(install.binary_path(), Path::new(".stepguard/bin/tool"));
    }

    #[test]
    fn durations_use_humantime() {
        let config = Config::from_yaml(
            "server:\n  port: 8080\n  stop_timeout: 2s\n  health:\n    timeout: 1m\n    interval: 250ms\n",
        )
        .unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.stop_timeout, Duration::from_secs(2));
        assert_eq!(server.health.timeout, Duration::from_secs(60));
        assert_eq!(server.health.interval, Duration::from_millis(250));
        assert!(server.forceful);
        assert_eq!(server.health_url(), "http://127.0.0.1:8080/health");
    }

    #[test]
    fn zero_retries_is_rejected() {
        let err = Config::from_yaml(
            "install:\n  url: https://example.com/tool\n  binary_name: tool\n  retries: 0\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn non_http_urls_are_rejected() {
        for url in ["ftp://example.com/x", "https://", "example.com"] {
            assert!(require_http_url("install.url", url).is_err(), "{url}");
        }
        assert!(require_http_url("install.url", "http://localhost:3000").is_ok());
    }

    #[test]
    fn zero_health_interval_is_rejected() {
        let err = Config::from_yaml("server:\n  port: 80\n  health:\n    interval: 0s\n").unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn lower_case_prefix_is_rejected() {
        assert!(Config::from_yaml("env_prefix: deploy\n").is_err());
    }

    #[test]
    fn env_key_joins_prefix() {
        let config = Config::from_yaml("env_prefix: MYTOOL\n").unwrap();
        assert_eq!(config.env_key("BIN"), "MYTOOL_BIN");
    }

    #[test]
    fn port_placeholder_is_expanded_in_args() {
        let config = Config::from_yaml(
            "server:\n  port: 4100\n  args: [serve, --port, \"{port}\"]\n",
        )
        .unwrap();
        let spec = config
            .server
            .unwrap()
            .process_spec(Path::new("/opt/tool"))
            .unwrap();
        assert_eq!(spec.args, ["serve", "--port", "4100"]);
    }
}
