//! # spupload: SharePoint upload function
//!
//! A small HTTP service that receives a JSON body carrying a filename and base64-encoded file
//! content, authenticates to Microsoft Entra ID with an app registration's client secret, and
//! writes the decoded bytes into a fixed SharePoint document library folder through Microsoft
//! Graph. It is built to run as an Azure Functions custom handler but is an ordinary Axum server.
//!
//! ## Request flow
//!
//! ```text
//! POST /api/upload {filename, fileContent}
//!   -> validate body (400 if either field is missing or empty)
//!   -> decode base64
//!   -> client-credentials token from login.microsoftonline.com/{tenant}
//!   -> PUT {graph}/drives/{drive}/root:/{folder}/{filename}:/content
//!   -> 200 "File uploaded successfully." | 500 "Upload failed: <reason>"
//! ```
//!
//! The identity provider and Graph sit behind the [`auth::TokenProvider`] and
//! [`graph::DriveStore`] traits, so [`upload::handle_upload`] can be driven without a network.
//!
//! ## Modules
//!
//! - [`config`]: CLI args, YAML + environment configuration, validation
//! - [`auth`]: OAuth2 client-credentials token acquisition
//! - [`graph`]: drive content uploads
//! - [`upload`]: the decode/authenticate/upload sequence
//! - [`api`]: HTTP handler and request model
//! - [`errors`]: error type and its HTTP mapping
//! - [`telemetry`]: logging and optional OTLP export

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod graph;
mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod upload;

use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, http, routing::get, routing::post};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::auth::{ClientSecretCredential, TokenProvider};
use crate::config::{CorsOrigin, GraphConfig};
use crate::graph::{DriveStore, GraphDriveClient};
use crate::openapi::ApiDoc;

/// Shared state handed to every request handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub token_provider: Arc<dyn TokenProvider>,
    pub drive_store: Arc<dyn DriveStore>,
}

fn build_http_client(config: &GraphConfig) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!("spupload/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Build the state backed by the real identity provider and Graph.
pub fn create_app_state(config: Config) -> anyhow::Result<AppState> {
    let client = build_http_client(&config.graph)?;
    let credential = ClientSecretCredential::new(client.clone(), &config.graph)?;
    let drive = GraphDriveClient::new(client, config.graph.graph_url.clone());

    info!(
        token_url = %credential.token_url(),
        graph_url = %config.graph.graph_url,
        site_id = %config.graph.site_id,
        drive_id = %config.graph.drive_id,
        folder_path = %config.graph.folder_path,
        "Upload target configured"
    );

    Ok(AppState::builder()
        .config(config)
        .token_provider(Arc::new(credential))
        .drive_store(Arc::new(drive))
        .build())
}

/// `None` when no origins are configured; the function host then owns CORS.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    if config.cors.allowed_origins.is_empty() {
        return Ok(None);
    }

    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<http::HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<http::HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::POST, http::Method::GET])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(Some(cors))
}

/// Build the router: the upload endpoint, health check, API docs, CORS and request tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_routes = Router::new()
        .route("/api/upload", post(api::handlers::upload::upload_file))
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes));

    let router = Router::new()
        .merge(upload_routes)
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .with_state(state.clone());

    let router = match create_cors_layer(&state.config)? {
        Some(cors) => router.layer(cors),
        None => router,
    };

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The configured service, ready to bind and serve.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let state = create_app_state(config.clone())?;
        let router = build_router(&state)?;
        Ok(Self { router, config })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves, then flush telemetry.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Upload function listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
