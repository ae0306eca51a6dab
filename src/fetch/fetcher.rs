// ABOUTME: Retrying fetcher: sequential attempts, pure exponential backoff, atomic write on success.
// ABOUTME: The destination is only touched once a response body has been received in full.

use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{FetchError, WriteSnafu, redact_url};
use crate::http::{HttpClient, HttpError, HttpRequest, send_with_timeout};

/// One download: where from, where to, and the retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub url: String,
    pub destination: PathBuf,
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubled after each further failure.
    pub backoff_base: Duration,
    pub attempt_timeout: Duration,
}

impl FetchJob {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(60),
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    fn validate(&self) -> Result<(), FetchError> {
        let reason = if self.url.trim().is_empty() {
            "url is empty"
        } else if self.destination.as_os_str().is_empty() {
            "destination path is empty"
        } else if self.max_retries == 0 {
            "max_retries must be at least 1"
        } else if self.attempt_timeout.is_zero() {
            "attempt timeout must be greater than zero"
        } else {
            return Ok(());
        };
        Err(FetchError::InvalidJob {
            reason: reason.to_string(),
        })
    }
}

/// What a successful fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub path: PathBuf,
    pub bytes: usize,
    pub attempts: u32,
}

/// Delay to wait after failed attempt `attempt` (0-based): `base * 2^attempt`.
///
/// Saturates at `Duration::MAX` instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// Downloads files with bounded retries.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<C> {
    client: C,
}

impl<C: HttpClient> RetryingFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Fetch `job.url` into `job.destination`.
    ///
    /// Attempts run strictly one after another. A non-2xx status, a network
    /// error and an attempt timeout all count as a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Exhausted` with the attempt count and last cause
    /// once the budget is spent, or `FetchError::Write` if the body cannot be
    /// stored.
    pub async fn fetch(&self, job: &FetchJob) -> Result<FetchReport, FetchError> {
        job.validate()?;
        let shown_url = redact_url(&job.url);
        let mut last_error = HttpError::Network("no attempt made".to_string());

        for attempt in 0..job.max_retries {
            debug!(
                url = %shown_url,
                attempt = attempt + 1,
                max_attempts = job.max_retries,
                "fetching"
            );

            let request = HttpRequest::get(job.url.clone());
            let outcome = match send_with_timeout(&self.client, request, job.attempt_timeout).await
            {
                Ok(response) if response.is_success() => Ok(response),
                Ok(response) => Err(HttpError::Status(response.status)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(response) => {
                    write_atomically(&job.destination, &response.body).await?;
                    info!(
                        url = %shown_url,
                        path = %job.destination.display(),
                        bytes = response.body.len(),
                        attempts = attempt + 1,
                        "download complete"
                    );
                    return Ok(FetchReport {
                        path: job.destination.clone(),
                        bytes: response.body.len(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => {
                    warn!(url = %shown_url, attempt = attempt + 1, error = %e, "download attempt failed");
                    last_error = e;
                }
            }

            if attempt + 1 < job.max_retries {
                let delay = backoff_delay(job.backoff_base, attempt);
                debug!(delay_ms = delay.as_millis() as u64, "backing off");
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::Exhausted {
            url: shown_url,
            attempts: job.max_retries,
            source: last_error,
        })
    }
}

/// Write `body` next to `destination` and rename it into place.
async fn write_atomically(destination: &Path, body: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .context(WriteSnafu { path: parent })?;
    }

    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let partial = destination.with_file_name(format!(".{file_name}.part"));

    if let Err(source) = tokio::fs::write(&partial, body).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(FetchError::Write {
            path: destination.to_path_buf(),
            source,
        });
    }

    if let Err(source) = tokio::fs::rename(&partial, destination).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(FetchError::Write {
            path: destination.to_path_buf(),
            source,
        });
    }

    Ok(())
}
