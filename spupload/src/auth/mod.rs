//! Access tokens for Microsoft Graph.
//!
//! The upload handler never talks to the identity provider directly. It asks a
//! [`TokenProvider`] for a token scoped to Graph, which keeps the handler testable with a
//! stand-in provider and leaves room for other credential types (managed identity, certificate)
//! behind the same trait.
//!
//! # Modules
//!
//! - [`client_secret`]: OAuth 2.0 client-credentials flow against the Entra ID token endpoint

use async_trait::async_trait;
use std::{fmt, time::Duration};
use thiserror::Error;

pub mod client_secret;

pub use client_secret::ClientSecretCredential;

/// A bearer token issued by the identity provider.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    /// Lifetime reported by the provider, if any
    pub expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
        }
    }

    /// The raw token, for the `Authorization` header only.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"***")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Errors that can occur while obtaining a token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint could not be reached or the response could not be read
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The identity provider answered with an OAuth error
    #[error("authentication failed: {message}")]
    Rejected { status: u16, code: String, message: String },

    /// The identity provider answered 2xx with something that is not a token
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The token endpoint URL could not be built from the configuration
    #[error("invalid token endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Issues bearer tokens for a scope.
///
/// Implementations fetch a fresh token on every call; nothing is cached between uploads.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_hides_secret() {
        let token = AccessToken::new("eyJ0eXAi.secret", Some(Duration::from_secs(3599)));
        let debug = format!("{token:?}");
        assert!(!debug.contains("eyJ0eXAi"));
        assert!(debug.contains("3599"));
        assert_eq!(token.secret(), "eyJ0eXAi.secret");
    }
}
