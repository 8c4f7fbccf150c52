//! Translation of domain errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use shared::{ErrorKind, ErrorResponse};
use tracing::error;

use crate::backend::domain::media_service::{MediaServiceError, UploadRejection};
use crate::backend::domain::student_service::StudentServiceError;
use crate::backend::domain::transport_service::TransportServiceError;

/// An error body together with the status it is sent with
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl RestError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(kind, message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorKind::NotFound, message)
    }

    /// Storage failures are logged in full and reported generically
    pub fn internal(context: &str, e: &anyhow::Error) -> Self {
        error!("{}: {:#}", context, e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, context)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StudentServiceError> for RestError {
    fn from(e: StudentServiceError) -> Self {
        let message = e.to_string();
        match e {
            StudentServiceError::NotFound(_) => Self::not_found(message),
            StudentServiceError::DuplicateIdentifier(_) => {
                Self::new(StatusCode::CONFLICT, ErrorKind::Conflict, message)
            }
            StudentServiceError::IdentifierMismatch(_)
            | StudentServiceError::IdentifierUnavailable(_)
            | StudentServiceError::DocumentNumberChanged => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation, message)
            }
            StudentServiceError::Invalid(field_errors) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: ErrorResponse::new(ErrorKind::Validation, message).with_field_errors(field_errors),
            },
            StudentServiceError::Storage(e) => Self::internal("Student storage failure", &e),
        }
    }
}

impl From<TransportServiceError> for RestError {
    fn from(e: TransportServiceError) -> Self {
        match e {
            TransportServiceError::Invalid(message) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation, message)
            }
            TransportServiceError::Storage(e) => Self::internal("Transport storage failure", &e),
        }
    }
}

impl From<UploadRejection> for RestError {
    fn from(rejection: UploadRejection) -> Self {
        let status = match rejection {
            UploadRejection::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadRejection::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadRejection::Empty => StatusCode::BAD_REQUEST,
        };
        Self::new(status, ErrorKind::Rejected, rejection.to_string())
    }
}

impl From<MediaServiceError> for RestError {
    fn from(e: MediaServiceError) -> Self {
        match e {
            MediaServiceError::Rejected(rejection) => rejection.into(),
            MediaServiceError::Storage(e) => Self::internal("Upload storage failure", &e),
        }
    }
}
