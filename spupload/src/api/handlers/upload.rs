//! HTTP handler for the upload endpoint.

use axum::{body::Bytes, extract::State};

use crate::api::models::upload::{UPLOAD_SUCCESS_MESSAGE, UploadRequest};
use crate::errors::Result;
use crate::{AppState, upload};

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    summary = "Upload file",
    description = "Decode a base64-encoded file and write it into the configured SharePoint folder, replacing any file with the same name.",
    request_body(content = UploadRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "File uploaded successfully.", body = String, content_type = "text/plain"),
        (status = 400, description = "Request must include filename and fileContent.", body = String, content_type = "text/plain"),
        (status = 413, description = "Payload too large"),
        (status = 500, description = "Upload failed, with the identity provider's or Graph's message", body = String, content_type = "text/plain")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(State(state): State<AppState>, body: Bytes) -> Result<&'static str> {
    let request = UploadRequest::from_body(&body)?;

    upload::handle_upload(
        request,
        &state.config.graph,
        state.token_provider.as_ref(),
        state.drive_store.as_ref(),
    )
    .await?;

    Ok(UPLOAD_SUCCESS_MESSAGE)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_utils::{RecordingDriveStore, StaticTokenProvider, create_test_config, create_test_server, create_test_state};

    #[tokio::test]
    async fn test_upload_returns_success_message() {
        let mut config = create_test_config();
        config.graph.folder_path = "Submissions".to_string();
        let tokens = Arc::new(StaticTokenProvider::new("token"));
        let store = Arc::new(RecordingDriveStore::new());
        let server = create_test_server(create_test_state(config, tokens.clone(), store.clone()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "A.pdf", "fileContent": "JVBERi0xLjcK" }))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.text(), "File uploaded successfully.");

        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, "drives/test-drive/root:/Submissions/A.pdf:/content");
        assert_eq!(&uploads[0].content[..], b"%PDF-1.7\n");
    }

    #[tokio::test]
    async fn test_missing_fields_make_no_calls() {
        let tokens = Arc::new(StaticTokenProvider::new("token"));
        let store = Arc::new(RecordingDriveStore::new());
        let server = create_test_server(create_test_state(create_test_config(), tokens.clone(), store.clone()));

        for body in [
            json!({ "fileContent": "aGk=" }),
            json!({ "filename": "A.pdf" }),
            json!({ "filename": "", "fileContent": "aGk=" }),
            json!({ "filename": "A.pdf", "fileContent": "" }),
        ] {
            let response = server.post("/api/upload").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.text(), "Request must include filename and fileContent.");
        }

        let response = server.post("/api/upload").text("not json").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert!(tokens.scopes().is_empty());
        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credential_is_500() {
        let tokens = Arc::new(StaticTokenProvider::rejecting("AADSTS7000215: Invalid client secret provided."));
        let store = Arc::new(RecordingDriveStore::new());
        let server = create_test_server(create_test_state(create_test_config(), tokens, store.clone()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "A.pdf", "fileContent": "aGk=" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let text = response.text();
        assert!(text.starts_with("Upload failed: "));
        assert!(text.contains("AADSTS7000215: Invalid client secret provided."));
        assert!(store.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_drive_failure_is_500() {
        let tokens = Arc::new(StaticTokenProvider::new("token"));
        let store = Arc::new(RecordingDriveStore::failing(404, "The resource could not be found."));
        let server = create_test_server(create_test_state(create_test_config(), tokens, store));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "A.pdf", "fileContent": "aGk=" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), "Upload failed: The resource could not be found.");
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let mut config = create_test_config();
        config.max_request_body_bytes = 64;
        let tokens = Arc::new(StaticTokenProvider::new("token"));
        let store = Arc::new(RecordingDriveStore::new());
        let server = create_test_server(create_test_state(config, tokens, store.clone()));

        let response = server
            .post("/api/upload")
            .json(&json!({ "filename": "A.pdf", "fileContent": "a".repeat(256) }))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.uploads().is_empty());
    }
}
