// ABOUTME: OAuth2 client-credentials exchange and the cross-step token cache.
// ABOUTME: Credentials are masked before any request is made.

mod cache;
mod error;
mod exchange;
mod token;

pub use cache::TokenCache;
pub use error::AuthError;
pub use exchange::{ClientCredentials, TokenExchange};
pub use token::{DEFAULT_EXPIRES_IN, DEFAULT_TOKEN_TYPE, Secret, Token};
