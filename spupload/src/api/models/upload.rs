//! Request and response shapes for the upload endpoint.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::errors::{Error, Result};

/// Body of the 200 response.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully.";

/// A validated upload request: both fields are present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct UploadRequest {
    /// Name the file is stored under, e.g. `Example.pdf`. Inserted into the drive path verbatim.
    #[schema(example = "Example.pdf")]
    pub filename: String,
    /// File bytes, base64-encoded
    #[serde(rename = "fileContent")]
    #[schema(example = "JVBERi0xLjcK")]
    pub file_content: String,
}

/// What the caller actually sent. Anything missing, null or of the wrong type fails to parse or
/// stays `None`, and both end up as the same 400.
#[derive(Debug, Deserialize)]
struct UploadRequestBody {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default, rename = "fileContent")]
    file_content: Option<String>,
}

impl UploadRequest {
    /// Parse and validate a raw request body.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let parsed: UploadRequestBody = serde_json::from_slice(body).map_err(|_| Error::missing_fields())?;

        match (parsed.filename, parsed.file_content) {
            (Some(filename), Some(file_content)) if !filename.is_empty() && !file_content.is_empty() => Ok(Self { filename, file_content }),
            _ => Err(Error::missing_fields()),
        }
    }
}
