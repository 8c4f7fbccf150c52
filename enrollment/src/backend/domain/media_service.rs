//! Photo uploads.
//!
//! [`check_image_upload`] is the shared pre-check: the enrollment session runs
//! it before calling the records API, and the upload endpoint runs it again.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::domain::commands::media::UploadImageCommand;
use crate::backend::storage::{Connection, MediaStorage};

/// 5 MB
pub const DEFAULT_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

/// Public URL prefix under which stored uploads are served
pub const UPLOADS_PATH: &str = "/uploads";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("Only image files can be uploaded (got '{0}')")]
    UnsupportedType(String),
    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("Uploaded file is empty")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaServiceError {
    #[error(transparent)]
    Rejected(#[from] UploadRejection),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Media type without parameters, lowercased (`"Image/PNG; q=1"` -> `"image/png"`)
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn check_image_upload(content_type: &str, size: usize, limit: usize) -> Result<(), UploadRejection> {
    let media_type = essence(content_type);
    // svg is script-capable markup, not a photo
    if !media_type.starts_with("image/") || media_type.len() <= "image/".len() || media_type.contains("svg") {
        return Err(UploadRejection::UnsupportedType(content_type.to_string()));
    }
    if size == 0 {
        return Err(UploadRejection::Empty);
    }
    if size > limit {
        return Err(UploadRejection::TooLarge { size, limit });
    }
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    match essence(content_type).as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "img",
    }
}

/// Content type to serve a stored upload with, from its extension
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct MediaService<C: Connection> {
    media_repository: C::MediaRepository,
    upload_limit: usize,
}

impl<C: Connection> MediaService<C> {
    pub fn new(connection: Arc<C>, upload_limit: usize) -> Self {
        Self {
            media_repository: connection.create_media_repository(),
            upload_limit,
        }
    }

    pub fn upload_limit(&self) -> usize {
        self.upload_limit
    }

    /// Store an image and return the URL it is served under
    pub async fn upload_image(&self, command: UploadImageCommand) -> Result<String, MediaServiceError> {
        info!("Uploading image: type={}, size={}", command.content_type, command.bytes.len());

        if let Err(rejection) = check_image_upload(&command.content_type, command.bytes.len(), self.upload_limit) {
            warn!("Upload rejected: {}", rejection);
            return Err(rejection.into());
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(&command.content_type));
        self.media_repository.store_image(&file_name, &command.bytes).await?;

        Ok(format!("{}/{}", UPLOADS_PATH, file_name))
    }

    pub async fn load_image(&self, file_name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.media_repository.load_image(file_name).await
    }
}
