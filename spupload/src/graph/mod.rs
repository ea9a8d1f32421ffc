//! Microsoft Graph drive access.
//!
//! [`DriveStore`] is the seam between the upload handler and the document library. The
//! production implementation is [`GraphDriveClient`], which issues a single
//! `PUT /drives/{drive-id}/root:/{path}:/content` per upload.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AccessToken;

pub mod client;

pub use client::GraphDriveClient;

/// The subset of a Graph `driveItem` we care about after an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriveItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub web_url: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph could not be reached or the response could not be read
    #[error("request to Microsoft Graph failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Graph answered with an error status
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The upload URL could not be built from the configuration
    #[error("invalid Graph URL: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Writes file content into a drive.
#[async_trait]
pub trait DriveStore: Send + Sync {
    /// Replace the content at `path` (relative to the Graph base URL) with `content`.
    ///
    /// Writing to an existing path overwrites the file; nothing is appended or versioned by the
    /// caller.
    async fn put_content(&self, path: &str, content: Bytes, token: &AccessToken) -> Result<DriveItem, GraphError>;
}
