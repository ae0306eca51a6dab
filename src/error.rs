// ABOUTME: Application-wide error type for stepguard.
// ABOUTME: Wraps each module's error so the binary can report any of them uniformly.

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::deploy::DeployError;
use crate::fetch::FetchError;
use crate::http::HttpError;
use crate::install::InstallError;
use crate::poll::PollError;
use crate::process::ProcessError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
