// ABOUTME: Token command implementation.
// ABOUTME: Obtains or reuses an access token; later steps read it from the workflow environment.

use std::sync::Arc;
use stepguard::auth::{Token, TokenCache, TokenExchange};
use stepguard::clock::SystemClock;
use stepguard::config::Config;
use stepguard::error::Result;
use stepguard::http::ReqwestClient;
use stepguard::output::{Output, WorkflowMasker};
use stepguard::store::WorkflowEnvStore;

/// Cached token if still valid, otherwise a freshly exchanged one.
pub async fn obtain_token(config: &Config) -> Result<Token> {
    let credentials = config.require_auth()?.credentials(&WorkflowMasker)?;
    let exchange = TokenExchange::new(ReqwestClient::new()?, Arc::new(WorkflowMasker));
    let cache = TokenCache::new(
        Arc::new(WorkflowEnvStore::from_env()),
        Arc::new(SystemClock),
        config.env_prefix.as_str(),
    );
    Ok(cache.get_or_obtain(&exchange, &credentials).await?)
}

pub async fn token(config: &Config, output: Output) -> Result<()> {
    let token = obtain_token(config).await?;

    output.set_output("token-type", &token.token_type)?;
    output.set_output("expires-in", &token.expires_in.to_string())?;
    output.success(&format!(
        "Access token ready ({} s remaining)",
        token.expires_in
    ));
    Ok(())
}
