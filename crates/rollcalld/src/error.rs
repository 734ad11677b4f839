use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rollcall_core::encoder::EncoderError;
use rollcall_core::matcher::EnrollmentError;
use thiserror::Error;

/// Handler-level errors. Every variant converts to a
/// `{success: false, error}` body; messages are the wire contract.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MissingField(&'static str),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("No image provided")]
    NoImage,
    #[error("Invalid image data")]
    InvalidImage,
    #[error("No known faces enrolled")]
    EnrollmentMissing,
    #[error("Known faces database is empty")]
    EnrollmentEmpty,
    #[error("No face detected")]
    NoFaceDetected,
    #[error("Face not recognized")]
    FaceNotRecognized,
    #[error("{0}")]
    RecordNotFound(&'static str),
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingField(_)
            | Self::InvalidBody(_)
            | Self::NoImage
            | Self::InvalidImage
            | Self::EnrollmentMissing
            | Self::EnrollmentEmpty
            | Self::NoFaceDetected
            | Self::FaceNotRecognized => StatusCode::BAD_REQUEST,
            Self::RecordNotFound(_) => StatusCode::NOT_FOUND,
            Self::Encoder(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::Empty | EnrollmentError::LengthMismatch { .. } => {
                Self::EnrollmentEmpty
            }
            EnrollmentError::Parse(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NoImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidBody("expected value".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::FaceNotRecognized.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RecordNotFound("No check-in record found for today.").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_are_the_wire_contract() {
        assert_eq!(ApiError::NoImage.to_string(), "No image provided");
        assert_eq!(ApiError::InvalidImage.to_string(), "Invalid image data");
        assert_eq!(
            ApiError::EnrollmentMissing.to_string(),
            "No known faces enrolled"
        );
        assert_eq!(
            ApiError::EnrollmentEmpty.to_string(),
            "Known faces database is empty"
        );
        assert_eq!(ApiError::NoFaceDetected.to_string(), "No face detected");
        assert_eq!(
            ApiError::FaceNotRecognized.to_string(),
            "Face not recognized"
        );
    }

    #[test]
    fn test_enrollment_misalignment_reads_as_empty_database() {
        let err: ApiError = EnrollmentError::LengthMismatch {
            names: 2,
            embeddings: 1,
        }
        .into();
        assert!(matches!(err, ApiError::EnrollmentEmpty));
    }
}
