//! # REST API for Student Records
//!
//! Endpoints for enrolling students and maintaining their records. The
//! identifier of a record is assigned on create and never changes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{error, info};

use crate::backend::io::rest::error::RestError;
use crate::backend::io::rest::mappers::student_mapper::StudentMapper;
use crate::backend::AppState;
use shared::{CreateStudentRequest, UpdateStudentRequest};

/// List every identifier already assigned
pub async fn list_identifiers(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/students/identifiers");

    match state.student_service.list_identifiers().await {
        Ok(identifiers) => {
            (StatusCode::OK, Json(StudentMapper::to_identifier_list_dto(identifiers))).into_response()
        }
        Err(e) => RestError::internal("Error listing identifiers", &e).into_response(),
    }
}

/// List all student records
pub async fn list_students(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/students");

    match state.student_service.list_students().await {
        Ok(students) => (StatusCode::OK, Json(StudentMapper::to_student_list_dto(students))).into_response(),
        Err(e) => RestError::internal("Error listing students", &e).into_response(),
    }
}

/// Get a student record by ID
pub async fn get_student(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    info!("GET /api/students/{}", id);

    match state.student_service.get_student(&id).await {
        Ok(student) => (StatusCode::OK, Json(StudentMapper::to_dto(student))).into_response(),
        Err(e) => RestError::from(e).into_response(),
    }
}

/// Enroll a new student
pub async fn create_student(
    State(state): State<AppState>,
    Json(request): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/students - {} {} (identifier: {:?})",
        request.profile.given_name, request.profile.family_name, request.student_id
    );

    let command = StudentMapper::to_create_command(request);
    match state.student_service.create_student(command).await {
        Ok(student) => (StatusCode::CREATED, Json(StudentMapper::to_create_response_dto(student))).into_response(),
        Err(e) => {
            error!("Failed to create student: {}", e);
            RestError::from(e).into_response()
        }
    }
}

/// Replace the profile of an existing record
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStudentRequest>,
) -> impl IntoResponse {
    info!("PUT /api/students/{}", id);

    let command = StudentMapper::to_update_command(id, request);
    match state.student_service.update_student(command).await {
        Ok(student) => (StatusCode::OK, Json(StudentMapper::to_dto(student))).into_response(),
        Err(e) => {
            error!("Failed to update student: {}", e);
            RestError::from(e).into_response()
        }
    }
}
