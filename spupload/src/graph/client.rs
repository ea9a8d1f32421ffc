use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{DriveItem, DriveStore, GraphError};
use crate::auth::AccessToken;

/// `DriveStore` backed by the Microsoft Graph REST API.
pub struct GraphDriveClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GraphDriveClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Full URL for a drive path. The path is appended verbatim.
    fn url_for(&self, path: &str) -> Result<Url, GraphError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
    }
}

/// Turn a non-2xx Graph response into a `GraphError::Api`, preferring Graph's own message.
fn api_error(status: reqwest::StatusCode, body: &str) -> GraphError {
    match serde_json::from_str::<GraphErrorResponse>(body) {
        Ok(GraphErrorResponse {
            error: GraphErrorBody { code, message: Some(message) },
        }) => GraphError::Api {
            status: status.as_u16(),
            code,
            message,
        },
        Ok(GraphErrorResponse {
            error: GraphErrorBody { code, message: None },
        }) => GraphError::Api {
            status: status.as_u16(),
            message: format!("Graph API request failed with status {}: {}", status.as_u16(), code.as_deref().unwrap_or("unknown error")),
            code,
        },
        Err(_) => GraphError::Api {
            status: status.as_u16(),
            code: None,
            message: format!("Graph API request failed with status {}: {body}", status.as_u16()),
        },
    }
}

#[async_trait]
impl DriveStore for GraphDriveClient {
    #[instrument(skip(self, content, token), fields(bytes = content.len()), err)]
    async fn put_content(&self, path: &str, content: Bytes, token: &AccessToken) -> Result<DriveItem, GraphError> {
        let url = self.url_for(path)?;
        debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .bearer_auth(token.secret())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        // The file is already written at this point; a body we can't read is not a failure.
        let item = serde_json::from_str::<DriveItem>(&body).unwrap_or_else(|e| {
            debug!("Could not parse driveItem from upload response: {}", e);
            DriveItem::default()
        });
        Ok(item)
    }
}
