//! Records API served directly by the backend services, without HTTP.
//!
//! Errors go through the same translation as the REST layer, so a session
//! sees identical [`ApiError`]s whichever way it is connected.

use async_trait::async_trait;
use shared::{
    CreateStudentRequest, CreateStudentResponse, Stop, StudentRecord, UpdateStudentRequest, UploadImageResponse,
    Vehicle,
};

use crate::backend::domain::commands::media::UploadImageCommand;
use crate::backend::io::records_api::{ApiError, RecordsApi};
use crate::backend::io::rest::error::RestError;
use crate::backend::io::rest::mappers::student_mapper::StudentMapper;
use crate::backend::io::rest::mappers::transport_mapper::TransportMapper;
use crate::backend::AppState;

impl From<RestError> for ApiError {
    fn from(e: RestError) -> Self {
        ApiError::from_error_response(e.status.as_u16(), e.body)
    }
}

fn internal(context: &str, e: anyhow::Error) -> ApiError {
    RestError::internal(context, &e).into()
}

#[async_trait]
impl RecordsApi for AppState {
    async fn fetch_existing_identifiers(&self) -> Result<Vec<String>, ApiError> {
        self.student_service
            .list_identifiers()
            .await
            .map_err(|e| internal("Error listing identifiers", e))
    }

    async fn fetch_vehicle_catalog(&self) -> Result<Vec<Vehicle>, ApiError> {
        let vehicles = self
            .transport_service
            .list_vehicles()
            .await
            .map_err(|e| internal("Error listing vehicles", e))?;
        Ok(vehicles.into_iter().map(TransportMapper::to_vehicle_dto).collect())
    }

    async fn fetch_stops(&self, route_ref: &str) -> Result<Vec<Stop>, ApiError> {
        let stops = self
            .transport_service
            .list_stops(route_ref)
            .await
            .map_err(|e| internal("Error listing stops", e))?;
        Ok(TransportMapper::to_stop_list_dto(route_ref, stops).stops)
    }

    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<UploadImageResponse, ApiError> {
        let command = UploadImageCommand {
            content_type: content_type.to_string(),
            bytes,
        };
        let url = self.media_service.upload_image(command).await.map_err(RestError::from)?;
        Ok(UploadImageResponse { url })
    }

    async fn create_record(&self, request: CreateStudentRequest) -> Result<CreateStudentResponse, ApiError> {
        let student = self
            .student_service
            .create_student(StudentMapper::to_create_command(request))
            .await
            .map_err(RestError::from)?;
        Ok(StudentMapper::to_create_response_dto(student))
    }

    async fn update_record(&self, id: &str, request: UpdateStudentRequest) -> Result<StudentRecord, ApiError> {
        let student = self
            .student_service
            .update_student(StudentMapper::to_update_command(id.to_string(), request))
            .await
            .map_err(RestError::from)?;
        Ok(StudentMapper::to_dto(student))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::enrollment_service::EnrollmentSession;
    use crate::backend::domain::models::draft::{AddressField, FieldKey, GuardianField, GuardianSlot, RuleKey};
    use crate::backend::domain::wizard::{ReferenceSnapshot, WizardController, WizardMode};
    use crate::backend::test_support::{sample_profile, setup_test_state};
    use chrono::{Datelike, Local};
    use shared::{RegisterRouteRequest, RegisterVehicleRequest};

    #[tokio::test]
    async fn test_conflict_matches_rest_translation() {
        let (_dir, state) = setup_test_state().unwrap();
        let created = state
            .create_record(CreateStudentRequest { student_id: None, profile: sample_profile() })
            .await
            .unwrap();

        let error = state
            .create_record(CreateStudentRequest {
                student_id: Some(created.student.student_id.clone()),
                profile: sample_profile(),
            })
            .await
            .unwrap_err();
        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn test_upload_rejection_is_rejected() {
        let (_dir, state) = setup_test_state().unwrap();
        let error = state.upload_image(b"hello".to_vec(), "text/plain").await.unwrap_err();
        assert!(matches!(error, ApiError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_session_enrolls_with_transport_against_backend() {
        let (_dir, state) = setup_test_state().unwrap();
        let vehicle = state
            .transport_service
            .register_vehicle(TransportMapper::to_register_vehicle_command(RegisterVehicleRequest {
                label: "Bus 1".to_string(),
                route_ref: "R1".to_string(),
            }))
            .await
            .unwrap();
        state
            .transport_service
            .register_route(TransportMapper::to_register_route_command(RegisterRouteRequest {
                route_ref: "R1".to_string(),
                stops: vec![Stop { name: "Main Gate".to_string(), lat: None, lon: None }],
            }))
            .await
            .unwrap();

        let mut session = EnrollmentSession::new(state.clone(), WizardController::new(ReferenceSnapshot::default()));
        session.refresh_reference_data().await;
        session.select_vehicle(&vehicle.id).await;
        assert_eq!(session.stops().len(), 1);

        let profile = sample_profile();
        let wizard = session.wizard_mut();
        for (key, value) in [
            (RuleKey::Field(FieldKey::DocumentNumber), "1234-5678-9012"),
            (RuleKey::Field(FieldKey::GivenName), profile.given_name.as_str()),
            (RuleKey::Field(FieldKey::FamilyName), profile.family_name.as_str()),
            (RuleKey::Field(FieldKey::DateOfBirth), profile.date_of_birth.as_str()),
            (RuleKey::Field(FieldKey::Gender), profile.gender.as_str()),
            (RuleKey::Address(AddressField::Line), profile.address.line.as_str()),
            (RuleKey::Address(AddressField::City), profile.address.city.as_str()),
            (RuleKey::Address(AddressField::State), profile.address.state.as_str()),
            (RuleKey::Address(AddressField::PostalCode), profile.address.postal_code.as_str()),
            (RuleKey::Field(FieldKey::Grade), profile.class.grade.as_str()),
            (RuleKey::Field(FieldKey::Section), profile.class.section.as_str()),
            (RuleKey::Guardian(GuardianSlot::First, GuardianField::Name), "Ravi Rao"),
            (RuleKey::Field(FieldKey::PrimaryContactPhone), profile.contacts.primary_contact_phone.as_str()),
        ] {
            wizard.edit(key, value);
        }
        wizard.set_transport_enabled(true);
        wizard.author_stop("New Colony", Some(18.5), Some(73.8));
        for _ in 0..3 {
            wizard.advance();
        }

        let record = session.submit().await.unwrap();

        assert_eq!(record.student_id, format!("{}-9012-0001", Local::now().year()));
        assert_eq!(record.profile.transport.route_ref.as_deref(), Some("R1"));
        assert!(matches!(session.wizard().mode(), WizardMode::Edit { .. }));

        session.load_stops().await;
        let names: Vec<&str> = session.stops().iter().map(|stop| stop.name.as_str()).collect();
        assert_eq!(names, vec!["Main Gate", "New Colony"]);
    }
}
