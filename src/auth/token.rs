// ABOUTME: Access token and secret string types.
// ABOUTME: Secret values never appear in Debug or Display output.

use std::fmt;

/// Token type used when the endpoint does not name one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Lifetime assumed when the endpoint does not report `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// A string that must not be printed.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// An access token and how much longer it is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: Secret,
    pub token_type: String,
    /// Remaining lifetime in whole seconds.
    pub expires_in: u64,
}

impl Token {
    pub fn new(access_token: impl Into<Secret>, token_type: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
        }
    }

    /// Value for an `Authorization` header, e.g. `Bearer abc`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose())
    }
}
