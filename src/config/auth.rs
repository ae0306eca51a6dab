// ABOUTME: Client-credentials settings for the deployment API's token endpoint.

use serde::Deserialize;

use super::env_value::EnvValue;
use super::error::ConfigError;
use super::require_http_url;
use crate::auth::ClientCredentials;
use crate::output::SecretMasker;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: EnvValue,
    pub client_secret: EnvValue,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

impl AuthConfig {
    /// Resolve credentials from the file and the environment.
    ///
    /// Each value is registered with `masker` as soon as it is resolved, so
    /// it stays redacted even when validation fails afterwards.
    pub fn credentials(&self, masker: &dyn SecretMasker) -> Result<ClientCredentials, ConfigError> {
        let client_id = self.client_id.resolve_secret()?;
        masker.mask(client_id.expose());
        let client_secret = self.client_secret.resolve_secret()?;
        masker.mask(client_secret.expose());
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.client_id and auth.client_secret must not be empty".to_string(),
            ));
        }

        let mut credentials = ClientCredentials::new(self.token_url.clone(), client_id, client_secret);
        credentials.scope = self.scope.clone();
        credentials.audience = self.audience.clone();
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("auth.token_url", &self.token_url)
    }
}
