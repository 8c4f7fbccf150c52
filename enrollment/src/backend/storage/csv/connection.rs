use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::{MediaRepository, StudentRepository, TransportRepository};
use crate::backend::storage::traits::Connection;

/// CsvConnection owns the data directory layout and the write lock shared by
/// every repository created from it
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Open (and create if needed) a data directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        for directory in [
            base_path.clone(),
            base_path.join("students"),
            base_path.join("transport"),
            base_path.join("uploads"),
        ] {
            if !directory.exists() {
                fs::create_dir_all(&directory)
                    .with_context(|| format!("Failed to create data directory {}", directory.display()))?;
            }
        }

        info!("Using data directory: {}", base_path.display());

        Ok(Self {
            base_directory: base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn students_directory(&self) -> PathBuf {
        self.base_directory.join("students")
    }

    pub fn transport_directory(&self) -> PathBuf {
        self.base_directory.join("transport")
    }

    pub fn uploads_directory(&self) -> PathBuf {
        self.base_directory.join("uploads")
    }

    /// Serialize writes across all repositories of this connection
    pub fn lock_writes(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Storage write lock poisoned"))
    }

    /// Write through a temp file and rename into place
    pub fn write_atomically(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }
}

impl Connection for CsvConnection {
    type StudentRepository = StudentRepository;
    type TransportRepository = TransportRepository;
    type MediaRepository = MediaRepository;

    fn create_student_repository(&self) -> Self::StudentRepository {
        StudentRepository::new(self.clone())
    }

    fn create_transport_repository(&self) -> Self::TransportRepository {
        TransportRepository::new(self.clone())
    }

    fn create_media_repository(&self) -> Self::MediaRepository {
        MediaRepository::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_creates_layout() {
        let dir = tempdir().unwrap();
        let connection = CsvConnection::new(dir.path().join("data")).unwrap();

        assert!(connection.students_directory().is_dir());
        assert!(connection.transport_directory().is_dir());
        assert!(connection.uploads_directory().is_dir());
    }

    #[test]
    fn test_write_atomically_replaces_content() {
        let dir = tempdir().unwrap();
        let connection = CsvConnection::new(dir.path()).unwrap();
        let path = dir.path().join("file.yaml");

        connection.write_atomically(&path, b"first").unwrap();
        connection.write_atomically(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("tmp").exists());
    }
}
