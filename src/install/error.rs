// ABOUTME: Error types for the install action.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::poll::PollError;
use crate::process::ProcessError;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to mark {} executable: {source}", .path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("server did not become healthy: {0}")]
    Health(#[source] PollError),

    #[error("failed to export {key}: {source}")]
    Export {
        key: String,
        #[source]
        source: std::io::Error,
    },
}
