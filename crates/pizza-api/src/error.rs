//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pizza_media::MediaError;
use pizza_models::ErrorResponse;
use pizza_reports::ReportError;
use pizza_storage::StorageError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned in place of server error details in production.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Response extension marking a body that carries a server error's own
/// message, so it can be masked per deployment.
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorDetail;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unsupported file type")]
    UnsupportedType,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        if err.is_client_error() {
            Self::UnsupportedType
        } else {
            Self::Media(err)
        }
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedType | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Internal(_)
            | ApiError::Media(_)
            | ApiError::Storage(_)
            | ApiError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let mut response = (status, Json(ErrorResponse { error: self.to_string() })).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(InternalErrorDetail);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_is_client_error() {
        let err = ApiError::from(MediaError::unsupported_type("notes.txt"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Unsupported file type");
    }

    #[test]
    fn test_pipeline_failures_are_server_errors() {
        let err = ApiError::from(MediaError::detection_failed("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::from(StorageError::LockPoisoned);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_only_server_errors_are_marked() {
        let response = ApiError::internal("disk full").into_response();
        assert!(response.extensions().get::<InternalErrorDetail>().is_some());

        let response = ApiError::UnsupportedType.into_response();
        assert!(response.extensions().get::<InternalErrorDetail>().is_none());
    }
}
