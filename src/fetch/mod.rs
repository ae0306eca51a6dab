// ABOUTME: Bounded-retry downloads with exponential backoff.
// ABOUTME: Exports the fetch job description, the fetcher, and its error type.

mod error;
mod fetcher;

pub use error::{FetchError, redact_url};
pub use fetcher::{FetchJob, FetchReport, RetryingFetcher, backoff_delay};
