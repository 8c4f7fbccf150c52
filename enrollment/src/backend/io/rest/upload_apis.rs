//! # REST API for Photo Uploads
//!
//! Images are posted as the raw request body with their `content-type`
//! header, and served back from `/uploads/<file name>`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{error, info};

use crate::backend::domain::commands::media::UploadImageCommand;
use crate::backend::domain::media_service::content_type_for;
use crate::backend::io::rest::error::RestError;
use crate::backend::AppState;
use shared::UploadImageResponse;

/// Store an uploaded image
pub async fn upload_image(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    info!("POST /api/uploads - type: {}, size: {}", content_type, body.len());

    let command = UploadImageCommand {
        content_type,
        bytes: body.to_vec(),
    };
    match state.media_service.upload_image(command).await {
        Ok(url) => (StatusCode::CREATED, Json(UploadImageResponse { url })).into_response(),
        Err(e) => {
            error!("Failed to store upload: {}", e);
            RestError::from(e).into_response()
        }
    }
}

/// Serve a stored upload
pub async fn get_upload(State(state): State<AppState>, Path(file_name): Path<String>) -> impl IntoResponse {
    info!("GET /uploads/{}", file_name);

    match state.media_service.load_image(&file_name).await {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type_for(&file_name)),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => RestError::not_found(format!("No upload named {}", file_name)).into_response(),
        Err(e) => RestError::internal("Error reading upload", &e).into_response(),
    }
}
