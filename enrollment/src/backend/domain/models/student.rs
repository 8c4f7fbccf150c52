use chrono::{DateTime, Utc};
use shared::StudentProfile;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct DomainStudent {
    pub id: String,
    pub student_id: String,
    pub profile: StudentProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainStudent {
    pub fn generate_id() -> String {
        format!("student::{}", Uuid::new_v4())
    }
}
