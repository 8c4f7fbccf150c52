//! The records API as seen by an enrollment session.
//!
//! [`RecordsApi`] is implemented by [`HttpApiClient`](super::http_client::HttpApiClient)
//! for a remote server and by [`AppState`](crate::backend::AppState) for
//! in-process use.

use async_trait::async_trait;
use shared::{
    CreateStudentRequest, CreateStudentResponse, ErrorKind, ErrorResponse, Stop, StudentRecord,
    UpdateStudentRequest, UploadImageResponse, Vehicle,
};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Duplicate identifier; the message comes from the server unchanged
    #[error("{message}")]
    Conflict { message: String },
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: BTreeMap<String, String>,
    },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Rejected { message: String },
    #[error("Records API error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Records API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Records API failure: {0}")]
    Internal(String),
}

impl ApiError {
    /// Build the error for a non-success response
    pub fn from_error_response(status: u16, body: ErrorResponse) -> Self {
        match body.kind {
            ErrorKind::Conflict => ApiError::Conflict { message: body.error },
            ErrorKind::Validation => ApiError::Validation {
                message: body.error,
                field_errors: body.field_errors,
            },
            ErrorKind::NotFound => ApiError::NotFound { message: body.error },
            ErrorKind::Rejected => ApiError::Rejected { message: body.error },
            ErrorKind::Internal => ApiError::Server { status, message: body.error },
        }
    }

    /// A conflict can succeed after the user edits and resubmits
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn fetch_existing_identifiers(&self) -> Result<Vec<String>, ApiError>;

    async fn fetch_vehicle_catalog(&self) -> Result<Vec<Vehicle>, ApiError>;

    async fn fetch_stops(&self, route_ref: &str) -> Result<Vec<Stop>, ApiError>;

    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<UploadImageResponse, ApiError>;

    async fn create_record(&self, request: CreateStudentRequest) -> Result<CreateStudentResponse, ApiError>;

    async fn update_record(&self, id: &str, request: UpdateStudentRequest) -> Result<StudentRecord, ApiError>;
}
