// ABOUTME: Errors raised while locating, parsing, or validating stepguard.yml.
// ABOUTME: All of these surface before any network or process action starts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found in {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("missing `{0}` section in configuration")]
    MissingSection(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
