//! Client-credentials flow with an application secret.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{AccessToken, AuthError, TokenProvider};
use crate::config::{ClientSecret, GraphConfig};

/// Authenticates as the application itself using a tenant id, client id and client secret.
///
/// Every [`fetch_token`](TokenProvider::fetch_token) call posts to
/// `{authority}/{tenant}/oauth2/v2.0/token`.
pub struct ClientSecretCredential {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: ClientSecret,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Makes sure a url has a trailing slash so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

impl ClientSecretCredential {
    pub fn new(client: Client, config: &GraphConfig) -> Result<Self, AuthError> {
        let token_url = ensure_slash(&config.authority_url).join(&format!("{}/oauth2/v2.0/token", config.tenant_id))?;
        Ok(Self {
            client,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    #[instrument(skip(self), fields(client_id = %self.client_id), err)]
    async fn fetch_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        debug!("Requesting token from {}", self.token_url);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("scope", scope),
        ];
        let response = self.client.post(self.token_url.clone()).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(oauth_error) => AuthError::Rejected {
                    status: status.as_u16(),
                    message: oauth_error.error_description.unwrap_or_else(|| oauth_error.error.clone()),
                    code: oauth_error.error,
                },
                Err(_) => AuthError::Rejected {
                    status: status.as_u16(),
                    code: status.to_string(),
                    message: format!("token endpoint returned {status}: {body}"),
                },
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        debug!(expires_in = ?token.expires_in, "Token issued");

        Ok(AccessToken::new(token.access_token, token.expires_in.map(Duration::from_secs)))
    }
}
