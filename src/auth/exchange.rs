// ABOUTME: OAuth2 client-credentials exchange against a token endpoint.
// ABOUTME: Masks client id and secret first, then posts a form-encoded grant request.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::error::AuthError;
use super::token::{DEFAULT_EXPIRES_IN, DEFAULT_TOKEN_TYPE, Secret, Token};
use crate::fetch::redact_url;
use crate::http::{Body, HttpClient, HttpRequest, send_with_timeout};
use crate::output::SecretMasker;

/// Application credentials for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: Secret,
    pub client_secret: Secret,
    pub scope: Option<String>,
    pub audience: Option<String>,
}

impl ClientCredentials {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<Secret>,
        client_secret: impl Into<Secret>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: None,
            audience: None,
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn validate(&self) -> Result<(), AuthError> {
        if !(self.token_url.starts_with("https://") || self.token_url.starts_with("http://")) {
            return Err(AuthError::InvalidConfig(
                "token_url must be an http(s) URL".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(AuthError::InvalidConfig("client_id is empty".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(AuthError::InvalidConfig("client_secret is empty".to_string()));
        }
        Ok(())
    }

    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), self.client_id.expose().to_string()),
            (
                "client_secret".to_string(),
                self.client_secret.expose().to_string(),
            ),
        ];
        if let Some(scope) = self.scope.as_ref().filter(|s| !s.is_empty()) {
            form.push(("scope".to_string(), scope.clone()));
        }
        if let Some(audience) = self.audience.as_ref().filter(|a| !a.is_empty()) {
            form.push(("audience".to_string(), audience.clone()));
        }
        form
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<serde_json::Value>,
}

/// Accepts `expires_in` as a number or a numeric string, as endpoints differ.
fn parse_expires_in(value: Option<&serde_json::Value>) -> Result<u64, AuthError> {
    let invalid = || AuthError::InvalidResponse("expires_in is not a number".to_string());
    match value {
        None | Some(serde_json::Value::Null) => Ok(DEFAULT_EXPIRES_IN),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(invalid),
        Some(serde_json::Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Performs client-credentials exchanges.
pub struct TokenExchange<C> {
    client: C,
    masker: Arc<dyn SecretMasker>,
    timeout: Duration,
}

impl<C: HttpClient> TokenExchange<C> {
    pub fn new(client: C, masker: Arc<dyn SecretMasker>) -> Self {
        Self {
            client,
            masker,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn masker(&self) -> &dyn SecretMasker {
        self.masker.as_ref()
    }

    /// Register the credentials with the log masker.
    pub fn mask_credentials(&self, credentials: &ClientCredentials) {
        self.masker.mask(credentials.client_id.expose());
        self.masker.mask(credentials.client_secret.expose());
    }

    /// Exchange `credentials` for an access token.
    ///
    /// The client id and secret are masked before anything else happens,
    /// whether or not the exchange succeeds.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidConfig` for an unusable URL or empty credentials.
    /// - `AuthError::Request` when the endpoint cannot be reached.
    /// - `AuthError::Rejected` for a non-2xx status; the message holds only the status.
    /// - `AuthError::InvalidResponse` / `AuthError::MissingAccessToken` for unusable bodies.
    pub async fn obtain(&self, credentials: &ClientCredentials) -> Result<Token, AuthError> {
        self.mask_credentials(credentials);
        credentials.validate()?;

        debug!(token_url = %redact_url(&credentials.token_url), "requesting access token");
        let request = HttpRequest::post(
            credentials.token_url.clone(),
            Body::Form(credentials.form()),
        )
        .header("Accept", "application/json");

        let response = send_with_timeout(&self.client, request, self.timeout)
            .await
            .map_err(AuthError::Request)?;

        if !response.is_success() {
            return Err(AuthError::Rejected {
                status: response.status,
                status_line: response.status_line(),
            });
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|_| AuthError::InvalidResponse("body is not a JSON object".to_string()))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;
        self.masker.mask(&access_token);

        let token_type = parsed
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        let expires_in = parse_expires_in(parsed.expires_in.as_ref())?;

        info!(token_type = %token_type, expires_in, "access token obtained");
        Ok(Token::new(access_token, token_type, expires_in))
    }
}
