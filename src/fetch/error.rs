// ABOUTME: Fetch error types with SNAFU pattern.
// ABOUTME: One terminal error per fetch, summarizing the whole attempt history.

use snafu::Snafu;
use std::path::PathBuf;

use crate::http::HttpError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    #[snafu(display("invalid fetch job: {reason}"))]
    InvalidJob { reason: String },

    #[snafu(display("download of {url} failed after {attempts} attempt(s): {source}"))]
    Exhausted {
        url: String,
        attempts: u32,
        source: HttpError,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    /// Number of attempts made before giving up, if any were made.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            FetchError::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The last transport failure, when attempts were exhausted.
    pub fn last_error(&self) -> Option<&HttpError> {
        match self {
            FetchError::Exhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Strip `user:password@` credentials from a URL before it is shown.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = url[authority_start..]
        .find(['/', '?', '#'])
        .map(|i| authority_start + i)
        .unwrap_or(url.len());

    match url[authority_start..authority_end].rfind('@') {
        Some(at) => format!(
            "{}***@{}",
            &url[..authority_start],
            &url[authority_start + at + 1..]
        ),
        None => url.to_string(),
    }
}
