// ABOUTME: Token cache persisted in the process-wide store for reuse by later steps.
// ABOUTME: Reads never return an expired or malformed token.

use std::sync::Arc;
use tracing::{debug, info};

use super::error::AuthError;
use super::exchange::{ClientCredentials, TokenExchange};
use super::token::Token;
use crate::clock::Clock;
use crate::http::HttpClient;
use crate::store::EnvStore;

/// Caches one token under `<PREFIX>_AUTH_TOKEN`, `<PREFIX>_TOKEN_TYPE`
/// and `<PREFIX>_TOKEN_EXPIRES` (epoch milliseconds).
pub struct TokenCache {
    store: Arc<dyn EnvStore>,
    clock: Arc<dyn Clock>,
    prefix: String,
}

impl TokenCache {
    pub fn new(store: Arc<dyn EnvStore>, clock: Arc<dyn Clock>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            prefix: prefix.into(),
        }
    }

    pub fn token_key(&self) -> String {
        format!("{}_AUTH_TOKEN", self.prefix)
    }

    pub fn type_key(&self) -> String {
        format!("{}_TOKEN_TYPE", self.prefix)
    }

    pub fn expires_key(&self) -> String {
        format!("{}_TOKEN_EXPIRES", self.prefix)
    }

    /// Persist `token` with an absolute expiry of `now + expires_in`.
    pub fn store(&self, token: &Token) -> Result<(), AuthError> {
        let lifetime_ms = i64::try_from(token.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = self.clock.now_millis().saturating_add(lifetime_ms);

        self.store
            .set(&self.token_key(), token.access_token.expose())?;
        self.store.set(&self.type_key(), &token.token_type)?;
        self.store
            .set(&self.expires_key(), &expires_at.to_string())?;
        debug!(expires_at, "token cached");
        Ok(())
    }

    /// The cached token, if every field is present and it has not expired.
    ///
    /// `expires_in` of the result is the remaining lifetime in whole seconds.
    pub fn read(&self) -> Option<Token> {
        let access_token = self.store.get(&self.token_key()).filter(|v| !v.is_empty())?;
        let token_type = self.store.get(&self.type_key()).filter(|v| !v.is_empty())?;
        let expires_at: i64 = self.store.get(&self.expires_key())?.trim().parse().ok()?;

        let now = self.clock.now_millis();
        if expires_at <= now {
            debug!(expires_at, now, "cached token has expired");
            return None;
        }

        let remaining_secs = u64::try_from((expires_at - now) / 1000).unwrap_or(0);
        Some(Token::new(access_token, token_type, remaining_secs))
    }

    /// Reuse a valid cached token or obtain and cache a fresh one.
    ///
    /// Credentials are masked first in either case, and a reused token is
    /// masked again for the current step's log.
    pub async fn get_or_obtain<C: HttpClient>(
        &self,
        exchange: &TokenExchange<C>,
        credentials: &ClientCredentials,
    ) -> Result<Token, AuthError> {
        exchange.mask_credentials(credentials);

        if let Some(token) = self.read() {
            exchange.masker().mask(token.access_token.expose());
            info!(expires_in = token.expires_in, "reusing cached access token");
            return Ok(token);
        }

        let token = exchange.obtain(credentials).await?;
        self.store(&token)?;
        Ok(token)
    }
}
