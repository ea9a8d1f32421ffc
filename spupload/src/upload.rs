//! The upload handler proper.
//!
//! [`handle_upload`] is a plain async function of the validated request, the Graph
//! configuration and the two collaborators. It does not read the environment or hold state, so
//! the HTTP layer and the tests drive it the same way:
//!
//! ```text
//! decode fileContent -> fetch token -> build drive path -> PUT content
//! ```
//!
//! Every step after decoding can fail; failures propagate as [`Error`] and become a 500 with
//! the underlying message.

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::api::models::upload::UploadRequest;
use crate::auth::TokenProvider;
use crate::config::GraphConfig;
use crate::errors::Result;
use crate::graph::{DriveItem, DriveStore};

/// Standard alphabet, padding optional, stray low bits ignored.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Drive path the content was written to
    pub path: String,
    /// Number of decoded bytes sent
    pub size: usize,
    /// Item metadata returned by Graph
    pub item: DriveItem,
}

/// Decode base64 text without ever failing.
///
/// Whitespace and characters outside the alphabet are skipped, the URL-safe `-`/`_` are accepted,
/// decoding stops at the first `=`, and a dangling sixth-bit group at the end is dropped. Garbage
/// in therefore means short or empty output, not an error.
pub fn decode_file_content(text: &str) -> Vec<u8> {
    let mut sextets: Vec<u8> = text
        .bytes()
        .take_while(|b| *b != b'=')
        .filter_map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => Some(b),
            b'-' => Some(b'+'),
            b'_' => Some(b'/'),
            _ => None,
        })
        .collect();

    // A single leftover character carries fewer than 8 bits.
    if sextets.len() % 4 == 1 {
        sextets.pop();
    }

    LENIENT_BASE64.decode(&sextets).unwrap_or_else(|e| {
        warn!("Discarding undecodable file content: {}", e);
        Vec::new()
    })
}

/// Drive-relative path of the content endpoint for `filename`.
///
/// A non-empty `folder_path` is followed by exactly one `/`; an empty one puts the file at the
/// drive root. Neither the folder nor the filename is escaped.
pub fn upload_path(drive_id: &str, folder_path: &str, filename: &str) -> String {
    let folder = folder_path.trim_end_matches('/');
    if folder.is_empty() {
        format!("drives/{drive_id}/root:/{filename}:/content")
    } else {
        format!("drives/{drive_id}/root:/{folder}/{filename}:/content")
    }
}

/// Decode the request, authenticate, and write the file into the configured drive folder.
#[instrument(skip_all, fields(filename = %request.filename))]
pub async fn handle_upload(
    request: UploadRequest,
    config: &GraphConfig,
    tokens: &dyn TokenProvider,
    store: &dyn DriveStore,
) -> Result<UploadOutcome> {
    let content = Bytes::from(decode_file_content(&request.file_content));
    let size = content.len();

    let token = tokens.fetch_token(&config.scope).await?;

    let path = upload_path(&config.drive_id, &config.folder_path, &request.filename);
    let item = store.put_content(&path, content, &token).await?;

    info!(path = %path, size, item_id = ?item.id, "File uploaded");

    Ok(UploadOutcome { path, size, item })
}
