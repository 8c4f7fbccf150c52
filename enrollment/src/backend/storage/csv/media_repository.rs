use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::connection::CsvConnection;
use crate::backend::storage::traits::MediaStorage;

/// Uploaded images, stored as plain files under `uploads/`
#[derive(Clone)]
pub struct MediaRepository {
    connection: CsvConnection,
}

impl MediaRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Only bare file names are accepted; anything with a path component is refused
    fn get_image_path(&self, file_name: &str) -> Result<PathBuf> {
        let is_bare = !file_name.is_empty()
            && file_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !file_name.starts_with('.');
        if !is_bare {
            return Err(anyhow::anyhow!("Invalid upload file name: {}", file_name));
        }
        Ok(self.connection.uploads_directory().join(file_name))
    }
}

#[async_trait]
impl MediaStorage for MediaRepository {
    async fn store_image(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.get_image_path(file_name)?;
        self.connection.write_atomically(&path, bytes)?;
        info!("Stored upload {} ({} bytes)", file_name, bytes.len());
        Ok(())
    }

    async fn load_image(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        let path = match self.get_image_path(file_name) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }
}
