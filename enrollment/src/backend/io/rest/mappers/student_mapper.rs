use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::{
    CreateStudentRequest, CreateStudentResponse, IdentifierListResponse, StudentListResponse, StudentRecord,
    UpdateStudentRequest,
};

use crate::backend::domain::commands::students::{CreateStudentCommand, UpdateStudentCommand};
use crate::backend::domain::models::student::DomainStudent;

/// Mapper to convert between shared student DTOs and the domain student model.
pub struct StudentMapper;

impl StudentMapper {
    pub fn to_domain(dto: StudentRecord) -> Result<DomainStudent> {
        let created_at = DateTime::parse_from_rfc3339(&dto.created_at)
            .context("Failed to parse created_at from student record")?
            .with_timezone(&Utc);
        let updated_at = DateTime::parse_from_rfc3339(&dto.updated_at)
            .context("Failed to parse updated_at from student record")?
            .with_timezone(&Utc);

        Ok(DomainStudent {
            id: dto.id,
            student_id: dto.student_id,
            profile: dto.profile,
            created_at,
            updated_at,
        })
    }

    pub fn to_dto(domain: DomainStudent) -> StudentRecord {
        StudentRecord {
            id: domain.id,
            student_id: domain.student_id,
            profile: domain.profile,
            created_at: domain.created_at.to_rfc3339(),
            updated_at: domain.updated_at.to_rfc3339(),
        }
    }

    pub fn to_student_list_dto(students: Vec<DomainStudent>) -> StudentListResponse {
        StudentListResponse {
            students: students.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_identifier_list_dto(identifiers: Vec<String>) -> IdentifierListResponse {
        IdentifierListResponse { identifiers }
    }

    pub fn to_create_response_dto(domain: DomainStudent) -> CreateStudentResponse {
        let success_message = format!("{} enrolled as {}", domain.profile.full_name, domain.student_id);
        CreateStudentResponse {
            student: Self::to_dto(domain),
            success_message,
        }
    }

    pub fn to_create_command(request: CreateStudentRequest) -> CreateStudentCommand {
        CreateStudentCommand {
            student_id: request.student_id.filter(|id| !id.trim().is_empty()),
            profile: request.profile,
        }
    }

    pub fn to_update_command(id: String, request: UpdateStudentRequest) -> UpdateStudentCommand {
        UpdateStudentCommand {
            id,
            profile: request.profile,
        }
    }
}
