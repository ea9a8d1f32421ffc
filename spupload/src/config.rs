//! Application configuration management.
//!
//! Configuration is loaded once at process start from a YAML file with environment variable
//! overrides, then handed to the upload handler as a plain value. The configuration file path
//! defaults to `config.yaml` but can be specified via `-f` flag or `SPUPLOAD_CONFIG` environment
//! variable. A missing file is treated as empty, so a deployment configured purely through the
//! environment needs no file at all.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SPUPLOAD_` override YAML values
//! 3. **Function app settings** - `TENANT_ID`, `CLIENT_ID`, `CLIENT_SECRET`, `SITE_ID`,
//!    `DRIVE_ID` and `FOLDER_PATH` override the matching `graph.*` values
//! 4. **FUNCTIONS_CUSTOMHANDLER_PORT** - Special case: overrides `port` when running as an Azure
//!    Functions custom handler
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `SPUPLOAD_GRAPH__REQUEST_TIMEOUT=30s` sets the `graph.request_timeout` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use spupload::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Credentials and destination, named as in the function app settings
//! TENANT_ID=00000000-0000-0000-0000-000000000000
//! CLIENT_ID=11111111-1111-1111-1111-111111111111
//! CLIENT_SECRET=...
//! DRIVE_ID=b!abcdef
//! FOLDER_PATH="SWMS Submissions"
//!
//! # Override server port
//! SPUPLOAD_PORT=8080
//!
//! # Point at a sovereign cloud
//! SPUPLOAD_GRAPH__AUTHORITY_URL=https://login.microsoftonline.us
//! SPUPLOAD_GRAPH__GRAPH_URL=https://graph.microsoft.us/v1.0
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, time::Duration};
use url::Url;

use crate::errors::Error;

/// Function app settings that map one-to-one onto `graph.*` fields.
const GRAPH_APP_SETTINGS: [&str; 6] = ["TENANT_ID", "CLIENT_ID", "CLIENT_SECRET", "SITE_ID", "DRIVE_ID", "FOLDER_PATH"];

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SPUPLOAD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, but [`Config::validate`] requires the Graph credentials and the
/// drive id to be filled in before the server will start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Largest request body accepted by the upload endpoint, in bytes.
    ///
    /// Base64 inflates a file by a third, so this bounds uploads at roughly three quarters of
    /// the value. The default matches the Functions host's 100 MiB request limit.
    pub max_request_body_bytes: usize,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// CORS configuration for browser clients posting directly to the function
    pub cors: CorsConfig,
    /// Identity provider and SharePoint destination settings
    pub graph: GraphConfig,
}

/// Where uploads go and how to authenticate to get there.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Entra ID tenant the application is registered in
    pub tenant_id: String,
    /// Application (client) id with `Files.ReadWrite.All` or `Sites.ReadWrite.All`
    pub client_id: String,
    /// Client secret for the application
    pub client_secret: ClientSecret,
    /// SharePoint site id. Not part of the upload path; kept so the deployment documents
    /// which site the drive belongs to.
    pub site_id: String,
    /// Drive id of the document library uploads are written to
    pub drive_id: String,
    /// Folder within the drive, e.g. `SWMS Submissions`. Empty means the drive root.
    pub folder_path: String,
    /// Identity provider base URL; the tenant id is appended to it
    pub authority_url: Url,
    /// Microsoft Graph base URL including the API version
    pub graph_url: Url,
    /// Scope requested for the Graph token
    pub scope: String,
    /// Timeout applied to token and upload requests. Unset means no timeout.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

/// Client secret that stays out of `Debug` output and logs.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests. Empty disables the CORS layer entirely.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://forms.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_bytes: 100 * 1024 * 1024,
            enable_otel_export: false,
            cors: CorsConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: ClientSecret::default(),
            site_id: String::new(),
            drive_id: String::new(),
            folder_path: String::new(),
            authority_url: Url::parse("https://login.microsoftonline.com").expect("valid default authority URL"),
            graph_url: Url::parse("https://graph.microsoft.com/v1.0").expect("valid default Graph URL"),
            scope: "https://graph.microsoft.com/.default".to_string(),
            request_timeout: None,
        }
    }
}

/// Read the bare app settings as-is. `Env` would parse `FOLDER_PATH=2024` as an integer.
fn graph_app_settings() -> BTreeMap<String, String> {
    GRAPH_APP_SETTINGS
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_ascii_lowercase(), value)))
        .collect()
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("graph.tenant_id (TENANT_ID)", self.graph.tenant_id.trim().is_empty()),
            ("graph.client_id (CLIENT_ID)", self.graph.client_id.trim().is_empty()),
            ("graph.client_secret (CLIENT_SECRET)", self.graph.client_secret.is_empty()),
            ("graph.drive_id (DRIVE_ID)", self.graph.drive_id.trim().is_empty()),
        ];
        if let Some((name, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(Error::Config {
                message: format!("{name} is not configured"),
            });
        }

        if self.graph.scope.trim().is_empty() {
            return Err(Error::Config {
                message: "graph.scope cannot be empty".to_string(),
            });
        }

        if self.max_request_body_bytes == 0 {
            return Err(Error::Config {
                message: "max_request_body_bytes cannot be 0".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Config {
                message: "CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins.".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // SPUPLOAD_CONFIG names the file itself, it is not a config key
            .merge(Env::prefixed("SPUPLOAD_").ignore(&["config"]).split("__"))
            // Function app settings use bare names
            .merge(Serialized::defaults(graph_app_settings()).key("graph"))
            .merge(Env::raw().only(&["FUNCTIONS_CUSTOMHANDLER_PORT"]).map(|_| "port".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
