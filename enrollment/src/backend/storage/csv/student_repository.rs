//! # Student Repository
//!
//! One YAML file per student under `students/`, named after the storage id
//! (`student::<uuid>` becomes `student_<uuid>.yaml`). Files hold the shared
//! [`StudentRecord`] shape so they stay readable and hand-editable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::StudentRecord;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::connection::CsvConnection;
use crate::backend::domain::models::student::DomainStudent;
use crate::backend::io::rest::mappers::student_mapper::StudentMapper;
use crate::backend::storage::traits::StudentStorage;

#[derive(Clone)]
pub struct StudentRepository {
    connection: CsvConnection,
}

impl StudentRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn get_student_yaml_path(&self, id: &str) -> PathBuf {
        let file_stem: String = id
            .replace("::", "_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.connection.students_directory().join(format!("{}.yaml", file_stem))
    }

    fn load_student(&self, path: &PathBuf) -> Result<DomainStudent> {
        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record: StudentRecord = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        StudentMapper::to_domain(record).context("Failed to map stored student record")
    }

    fn discover_students(&self) -> Result<Vec<DomainStudent>> {
        let students_dir = self.connection.students_directory();
        if !students_dir.exists() {
            debug!("Students directory doesn't exist, returning empty list");
            return Ok(Vec::new());
        }

        let mut students = Vec::new();
        for entry in fs::read_dir(&students_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            match self.load_student(&path) {
                Ok(student) => students.push(student),
                Err(e) => warn!("Skipping unreadable student file {}: {:#}", path.display(), e),
            }
        }

        students.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(students)
    }

    fn save_student(&self, student: &DomainStudent) -> Result<()> {
        let yaml_path = self.get_student_yaml_path(&student.id);
        let yaml_content = serde_yaml::to_string(&StudentMapper::to_dto(student.clone()))?;
        self.connection.write_atomically(&yaml_path, yaml_content.as_bytes())?;
        info!("Saved student {} to {}", student.student_id, yaml_path.display());
        Ok(())
    }

    fn insert_locked(&self, student: &DomainStudent) -> Result<bool> {
        let _guard = self.connection.lock_writes()?;

        let taken = self
            .discover_students()?
            .iter()
            .any(|existing| existing.student_id == student.student_id);
        if taken {
            warn!("Identifier {} is already assigned", student.student_id);
            return Ok(false);
        }

        self.save_student(student)?;
        Ok(true)
    }

    fn update_locked(&self, student: &DomainStudent) -> Result<()> {
        let _guard = self.connection.lock_writes()?;

        if !self.get_student_yaml_path(&student.id).exists() {
            return Err(anyhow::anyhow!("Student not found: {}", student.id));
        }
        self.save_student(student)
    }
}

#[async_trait]
impl StudentStorage for StudentRepository {
    async fn insert_student(&self, student: &DomainStudent) -> Result<bool> {
        self.insert_locked(student)
    }

    async fn get_student(&self, id: &str) -> Result<Option<DomainStudent>> {
        let path = self.get_student_yaml_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.load_student(&path).map(Some)
    }

    async fn list_students(&self) -> Result<Vec<DomainStudent>> {
        self.discover_students()
    }

    async fn update_student(&self, student: &DomainStudent) -> Result<()> {
        self.update_locked(student)
    }

    async fn list_identifiers(&self) -> Result<Vec<String>> {
        Ok(self
            .discover_students()?
            .into_iter()
            .map(|student| student.student_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::StudentProfile;
    use tempfile::tempdir;

    fn student(student_id: &str) -> DomainStudent {
        let now = Utc::now();
        DomainStudent {
            id: DomainStudent::generate_id(),
            student_id: student_id.to_string(),
            profile: StudentProfile {
                document_number: "123456789012".to_string(),
                given_name: "Asha".to_string(),
                family_name: "Rao".to_string(),
                full_name: "Asha Rao".to_string(),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_student() {
        let dir = tempdir().unwrap();
        let repo = StudentRepository::new(CsvConnection::new(dir.path()).unwrap());

        let asha = student("2026-9012-0001");
        assert!(repo.insert_student(&asha).await.unwrap());

        let loaded = repo.get_student(&asha.id).await.unwrap().unwrap();
        assert_eq!(loaded.student_id, "2026-9012-0001");
        assert_eq!(loaded.profile.full_name, "Asha Rao");
        assert!(repo.get_student("student::missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_refused() {
        let dir = tempdir().unwrap();
        let repo = StudentRepository::new(CsvConnection::new(dir.path()).unwrap());

        assert!(repo.insert_student(&student("2026-9012-0001")).await.unwrap());
        assert!(!repo.insert_student(&student("2026-9012-0001")).await.unwrap());
        assert_eq!(repo.list_students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_identifiers_sorted() {
        let dir = tempdir().unwrap();
        let repo = StudentRepository::new(CsvConnection::new(dir.path()).unwrap());

        repo.insert_student(&student("2026-9012-0002")).await.unwrap();
        repo.insert_student(&student("2026-4821-0001")).await.unwrap();

        let identifiers = repo.list_identifiers().await.unwrap();
        assert_eq!(identifiers, vec!["2026-4821-0001".to_string(), "2026-9012-0002".to_string()]);
    }

    #[tokio::test]
    async fn test_update_requires_existing_file() {
        let dir = tempdir().unwrap();
        let repo = StudentRepository::new(CsvConnection::new(dir.path()).unwrap());

        let mut asha = student("2026-9012-0001");
        assert!(repo.update_student(&asha).await.is_err());

        repo.insert_student(&asha).await.unwrap();
        asha.profile.class.section = "B".to_string();
        repo.update_student(&asha).await.unwrap();

        let loaded = repo.get_student(&asha.id).await.unwrap().unwrap();
        assert_eq!(loaded.profile.class.section, "B");
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let connection = CsvConnection::new(dir.path()).unwrap();
        fs::write(connection.students_directory().join("broken.yaml"), "not: [valid").unwrap();
        let repo = StudentRepository::new(connection);

        repo.insert_student(&student("2026-9012-0001")).await.unwrap();
        assert_eq!(repo.list_students().await.unwrap().len(), 1);
    }
}
