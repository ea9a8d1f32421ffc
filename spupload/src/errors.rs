use crate::auth::AuthError;
use crate::graph::GraphError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Body of the 400 response for a request without usable `filename`/`fileContent`.
pub const MISSING_FIELDS_MESSAGE: &str = "Request must include filename and fileContent.";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Required request fields missing or empty
    #[error("{message}")]
    BadRequest { message: String },

    /// Identity provider refused or failed to issue a token
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Graph rejected or failed the upload
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Invalid or incomplete configuration
    #[error("Config validation: {message}")]
    Config { message: String },
}

impl Error {
    pub fn missing_fields() -> Self {
        Error::BadRequest {
            message: MISSING_FIELDS_MESSAGE.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Auth(_) | Error::Graph(_) | Error::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the plain-text body sent to the caller.
    ///
    /// Client errors are returned as-is. Everything else is reported as a failed upload with the
    /// underlying message attached, so callers see why Graph or the identity provider refused.
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            other => format!("Upload failed: {other}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Auth(_) => {
                tracing::warn!("Token request failed: {}", self);
            }
            Error::Graph(_) => {
                tracing::warn!("Graph upload failed: {}", self);
            }
            Error::Config { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_bad_request_keeps_message() {
        let err = Error::missing_fields();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Request must include filename and fileContent.");
    }

    #[test]
    fn test_failures_collapse_to_upload_failed() {
        let auth = Error::Auth(AuthError::Rejected {
            status: 401,
            code: "invalid_client".to_string(),
            message: "AADSTS7000215: Invalid client secret provided.".to_string(),
        });
        assert_eq!(auth.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            auth.user_message(),
            "Upload failed: authentication failed: AADSTS7000215: Invalid client secret provided."
        );

        let graph = Error::Graph(GraphError::Api {
            status: 404,
            code: Some("itemNotFound".to_string()),
            message: "The resource could not be found.".to_string(),
        });
        assert_eq!(graph.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(graph.user_message(), "Upload failed: The resource could not be found.");

        let config = Error::Config {
            message: "graph.drive_id (DRIVE_ID) is not configured".to_string(),
        };
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_into_response_is_plain_text() {
        let response = Error::Graph(GraphError::Api {
            status: 507,
            code: Some("insufficientStorage".to_string()),
            message: "Insufficient Storage".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            response.headers()[axum::http::header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Upload failed: Insufficient Storage");
    }
}
