// ABOUTME: Error types for the remote deployment API.
// ABOUTME: Distinguishes transport failures, rejected requests, and failed deployments.

use crate::http::HttpError;
use crate::poll::PollError;

/// Errors raised while triggering or awaiting a remote deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Request could not be built from the given settings.
    #[error("invalid deployment settings: {0}")]
    InvalidConfig(String),

    /// The API could not be reached.
    #[error("deployment API request failed: {0}")]
    Request(#[from] HttpError),

    /// The API answered with a non-2xx status.
    #[error("deployment API rejected the request: {status_line}")]
    Rejected { status: u16, status_line: String },

    /// The API answered 2xx with a body we cannot use.
    #[error("deployment API returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The deployment reached a terminal failure status.
    #[error("deployment {id} failed: {reason}")]
    Failed { id: String, reason: String },

    /// The deployment did not finish within the polling budget.
    #[error("deployment {id} did not complete: {source}")]
    Incomplete {
        id: String,
        #[source]
        source: PollError,
    },
}
