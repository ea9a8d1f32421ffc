//! Test utilities: configuration builders and in-memory stand-ins for the identity provider and
//! the drive.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use url::Url;

use crate::auth::{AccessToken, AuthError, TokenProvider};
use crate::config::{ClientSecret, Config, GraphConfig};
use crate::graph::{DriveItem, DriveStore, GraphError};
use crate::{AppState, build_router};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        graph: GraphConfig {
            tenant_id: "test-tenant".to_string(),
            client_id: "test-client".to_string(),
            client_secret: ClientSecret::new("test-secret"),
            site_id: "test-site".to_string(),
            drive_id: "test-drive".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Test config whose identity provider and Graph both live at `server_uri` (a wiremock server).
/// Graph is mounted under `/v1.0`, as in production.
pub fn create_test_config_for(server_uri: &str) -> Config {
    let mut config = create_test_config();
    config.graph.authority_url = Url::parse(server_uri).expect("valid mock server URI");
    config.graph.graph_url = Url::parse(&format!("{server_uri}/v1.0")).expect("valid mock server URI");
    config
}

pub fn create_test_state(config: Config, tokens: Arc<dyn TokenProvider>, store: Arc<dyn DriveStore>) -> AppState {
    AppState::builder().config(config).token_provider(tokens).drive_store(store).build()
}

pub fn create_test_server(state: AppState) -> TestServer {
    let router = build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// Token provider that hands out a fixed token, or always rejects.
pub struct StaticTokenProvider {
    outcome: Result<String, String>,
    scopes: Mutex<Vec<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            outcome: Ok(token.to_string()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    /// Provider that answers every request like an identity provider refusing the credential.
    pub fn rejecting(description: &str) -> Self {
        Self {
            outcome: Err(description.to_string()),
            scopes: Mutex::new(Vec::new()),
        }
    }

    /// Scopes requested so far, in order.
    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        self.scopes.lock().unwrap().push(scope.to_string());
        match &self.outcome {
            Ok(token) => Ok(AccessToken::new(token.clone(), None)),
            Err(description) => Err(AuthError::Rejected {
                status: 401,
                code: "invalid_client".to_string(),
                message: description.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub path: String,
    pub content: Bytes,
    pub token: String,
}

/// Drive that records every write, or fails them all with a Graph-style error.
#[derive(Default)]
pub struct RecordingDriveStore {
    uploads: Mutex<Vec<RecordedUpload>>,
    failure: Option<(u16, String)>,
}

impl RecordingDriveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            failure: Some((status, message.to_string())),
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DriveStore for RecordingDriveStore {
    async fn put_content(&self, path: &str, content: Bytes, token: &AccessToken) -> Result<DriveItem, GraphError> {
        if let Some((status, message)) = &self.failure {
            return Err(GraphError::Api {
                status: *status,
                code: None,
                message: message.clone(),
            });
        }

        let size = content.len() as u64;
        self.uploads.lock().unwrap().push(RecordedUpload {
            path: path.to_string(),
            content,
            token: token.secret().to_string(),
        });

        Ok(DriveItem {
            id: Some(format!("item-{}", self.uploads.lock().unwrap().len())),
            name: path.rsplit_once(":/content").and_then(|(p, _)| p.rsplit('/').next()).map(str::to_string),
            web_url: None,
            size: Some(size),
        })
    }
}
