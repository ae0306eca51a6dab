// ABOUTME: Fetch command implementation.
// ABOUTME: Downloads one URL with retries and publishes the resulting path.

use stepguard::error::Result;
use stepguard::fetch::{FetchJob, RetryingFetcher, redact_url};
use stepguard::http::ReqwestClient;
use stepguard::output::Output;

pub async fn fetch(job: FetchJob, mut output: Output) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Downloading {}", redact_url(&job.url)));

    let fetcher = RetryingFetcher::new(ReqwestClient::new()?);
    let report = fetcher.fetch(&job).await?;

    output.set_output("path", &report.path.display().to_string())?;
    output.success(&format!(
        "Downloaded {} bytes to {} ({} attempt(s))",
        report.bytes,
        report.path.display(),
        report.attempts
    ));
    Ok(())
}
