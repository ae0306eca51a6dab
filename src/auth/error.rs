// ABOUTME: Error types for token acquisition and caching.
// ABOUTME: Messages carry status codes and field names only, never credential values.

use thiserror::Error;

use crate::http::HttpError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials configuration: {0}")]
    InvalidConfig(String),

    #[error("token request failed: {0}")]
    Request(HttpError),

    #[error("token request failed: {status_line}")]
    Rejected { status: u16, status_line: String },

    #[error("token endpoint returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("token endpoint response did not include an access_token")]
    MissingAccessToken,

    #[error("failed to persist token: {0}")]
    Store(#[from] std::io::Error),
}
