//! Student records on the server side.
//!
//! The service is authoritative for identifiers: it derives one when the
//! client sent none, refuses a proposed identifier whose suffix does not
//! belong to the document number, and reports duplicates as conflicts. Every
//! create and update runs the same rule table as the wizard.

use chrono::{Datelike, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::assembly::{assemble_profile, draft_from_profile};
use crate::backend::domain::clock::{Clock, SystemClock};
use crate::backend::domain::commands::students::{CreateStudentCommand, UpdateStudentCommand};
use crate::backend::domain::identity::{
    next_identifier, normalize_document_number, IdentifierError, PENDING_IDENTIFIER,
};
use crate::backend::domain::models::draft::{DraftRecord, RuleKey, TransportField};
use crate::backend::domain::models::student::DomainStudent;
use crate::backend::domain::transport_service::TransportService;
use crate::backend::domain::validation::{AgeBounds, ErrorMap, RuleContext, RuleTable, Step};
use crate::backend::storage::{Connection, StudentStorage};

/// Attempts at deriving a free identifier before giving up
const DERIVATION_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum StudentServiceError {
    #[error("Student not found: {0}")]
    NotFound(String),
    #[error("Identifier {0} is already assigned to another student")]
    DuplicateIdentifier(String),
    #[error("Identifier {0} is not the next identifier for this identity document number")]
    IdentifierMismatch(String),
    #[error(transparent)]
    IdentifierUnavailable(#[from] IdentifierError),
    #[error("The identity document number of an existing record cannot be changed")]
    DocumentNumberChanged,
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(BTreeMap<String, String>),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct StudentService<C: Connection> {
    student_repository: C::StudentRepository,
    transport_service: TransportService<C>,
    rules: RuleTable,
    clock: Arc<dyn Clock>,
    age_bounds: AgeBounds,
}

impl<C: Connection> StudentService<C> {
    pub fn new(connection: Arc<C>, transport_service: TransportService<C>, age_bounds: AgeBounds) -> Self {
        Self {
            student_repository: connection.create_student_repository(),
            transport_service,
            rules: RuleTable::student(),
            clock: Arc::new(SystemClock),
            age_bounds,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a student record
    pub async fn create_student(&self, command: CreateStudentCommand) -> Result<DomainStudent, StudentServiceError> {
        let document_number = normalize_document_number(&command.profile.document_number);
        info!(
            "Creating student: name={} {}, proposed identifier={:?}",
            command.profile.given_name, command.profile.family_name, command.student_id
        );

        let draft = draft_from_profile(&command.profile, PENDING_IDENTIFIER);
        self.validate(&draft).await?;
        let profile = assemble_profile(&draft);

        let now = Utc::now();
        let mut student = DomainStudent {
            id: DomainStudent::generate_id(),
            student_id: String::new(),
            profile,
            created_at: now,
            updated_at: now,
        };

        match command.student_id.filter(|id| !id.trim().is_empty() && id != PENDING_IDENTIFIER) {
            Some(proposed) => {
                student.student_id = self.check_proposed_identifier(proposed.trim(), &document_number).await?;
                if !self.student_repository.insert_student(&student).await? {
                    return Err(StudentServiceError::DuplicateIdentifier(student.student_id));
                }
            }
            None => self.insert_with_derived_identifier(&mut student, &document_number).await?,
        }

        self.record_authored_stop(&student).await;

        info!("Created student {} with ID: {}", student.student_id, student.id);
        Ok(student)
    }

    /// A proposed identifier is accepted only when it is the one the server
    /// would derive right now: current year, the document's suffix, next sequence.
    async fn check_proposed_identifier(
        &self,
        proposed: &str,
        document_number: &str,
    ) -> Result<String, StudentServiceError> {
        let identifiers = self.student_repository.list_identifiers().await?;
        if identifiers.iter().any(|existing| existing == proposed) {
            return Err(StudentServiceError::DuplicateIdentifier(proposed.to_string()));
        }

        let expected = next_identifier(self.clock.today().year(), document_number, &identifiers)?;
        if proposed != expected {
            warn!("Rejected identifier {}, expected {}", proposed, expected);
            return Err(StudentServiceError::IdentifierMismatch(proposed.to_string()));
        }
        Ok(expected)
    }

    async fn insert_with_derived_identifier(
        &self,
        student: &mut DomainStudent,
        document_number: &str,
    ) -> Result<(), StudentServiceError> {
        let year = self.clock.today().year();
        for _ in 0..DERIVATION_ATTEMPTS {
            let identifiers = self.student_repository.list_identifiers().await?;
            student.student_id = next_identifier(year, document_number, &identifiers)?;
            if self.student_repository.insert_student(student).await? {
                return Ok(());
            }
            warn!("Derived identifier {} was taken concurrently, retrying", student.student_id);
        }
        Err(StudentServiceError::DuplicateIdentifier(student.student_id.clone()))
    }

    /// Replace the profile of an existing record. The identifier and the
    /// document number stay as they are.
    pub async fn update_student(&self, command: UpdateStudentCommand) -> Result<DomainStudent, StudentServiceError> {
        info!("Updating student: {}", command.id);

        let mut student = self
            .student_repository
            .get_student(&command.id)
            .await?
            .ok_or_else(|| StudentServiceError::NotFound(command.id.clone()))?;

        let document_number = normalize_document_number(&command.profile.document_number);
        if document_number != student.profile.document_number {
            warn!("Refusing to change the document number of {}", student.student_id);
            return Err(StudentServiceError::DocumentNumberChanged);
        }

        let draft = draft_from_profile(&command.profile, &student.student_id);
        self.validate(&draft).await?;

        student.profile = assemble_profile(&draft);
        student.updated_at = Utc::now();
        self.student_repository.update_student(&student).await?;
        self.record_authored_stop(&student).await;

        info!("Updated student {} with ID: {}", student.student_id, student.id);
        Ok(student)
    }

    pub async fn get_student(&self, id: &str) -> Result<DomainStudent, StudentServiceError> {
        info!("Getting student: {}", id);
        self.student_repository
            .get_student(id)
            .await?
            .ok_or_else(|| StudentServiceError::NotFound(id.to_string()))
    }

    pub async fn list_students(&self) -> anyhow::Result<Vec<DomainStudent>> {
        let students = self.student_repository.list_students().await?;
        info!("Found {} students", students.len());
        Ok(students)
    }

    pub async fn list_identifiers(&self) -> anyhow::Result<Vec<String>> {
        self.student_repository.list_identifiers().await
    }

    async fn validate(&self, draft: &DraftRecord) -> Result<(), StudentServiceError> {
        let context = RuleContext {
            today: self.clock.today(),
            age_bounds: self.age_bounds,
        };

        let mut errors = ErrorMap::new();
        for step in Step::REQUIRED {
            errors.extend(self.rules.evaluate_step(step, draft, &context));
        }
        if draft.transport.enabled {
            errors.extend(self.rules.evaluate_step(Step::Transport, draft, &context));
            if let Some(vehicle_id) = &draft.transport.vehicle_id {
                if self.transport_service.find_vehicle(vehicle_id).await?.is_none() {
                    errors.insert(
                        RuleKey::Transport(TransportField::Vehicle),
                        "Selected vehicle does not exist".to_string(),
                    );
                }
            }
        }

        if errors.is_empty() {
            return Ok(());
        }

        warn!("Student record failed validation on {} field(s)", errors.len());
        Err(StudentServiceError::Invalid(
            errors.into_iter().map(|(key, message)| (key.to_string(), message)).collect(),
        ))
    }

    /// Failures here are logged only; the record is already saved
    async fn record_authored_stop(&self, student: &DomainStudent) {
        let transport = &student.profile.transport;
        let (Some(route_ref), Some(stop)) = (&transport.route_ref, &transport.stop) else {
            return;
        };
        if let Err(e) = self.transport_service.record_authored_stop(route_ref, stop).await {
            warn!("Could not add stop '{}' to route {}: {:#}", stop.name, route_ref, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::clock::FixedClock;
    use crate::backend::domain::commands::transport::{RegisterRouteCommand, RegisterVehicleCommand};
    use crate::backend::storage::csv::CsvConnection;
    use chrono::NaiveDate;
    use shared::{Address, ClassPlacement, Guardian, GuardianContacts, Stop, StudentProfile, TransportEnrollment};
    use tempfile::tempdir;

    fn setup_test() -> (tempfile::TempDir, StudentService<CsvConnection>) {
        let dir = tempdir().unwrap();
        let connection = Arc::new(CsvConnection::new(dir.path()).unwrap());
        let transport_service = TransportService::new(connection.clone());
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let service = StudentService::new(connection, transport_service, AgeBounds::default())
            .with_clock(Arc::new(FixedClock(today)));
        (dir, service)
    }

    fn profile(document_number: &str) -> StudentProfile {
        StudentProfile {
            document_number: document_number.to_string(),
            given_name: "Asha".to_string(),
            family_name: "Rao".to_string(),
            full_name: String::new(),
            date_of_birth: "2016-01-10".to_string(),
            gender: "Female".to_string(),
            address: Address {
                line: "12 Lake Road".to_string(),
                city: "Pune".to_string(),
                state: "Maharashtra".to_string(),
                postal_code: "411001".to_string(),
            },
            class: ClassPlacement { grade: "5".to_string(), section: "A".to_string() },
            contacts: GuardianContacts {
                guardians: vec![Guardian {
                    name: "Ravi Rao".to_string(),
                    phone: Some("7123456789".to_string()),
                    occupation: None,
                }],
                primary_contact_phone: "7123456789".to_string(),
            },
            ..Default::default()
        }
    }

    fn create(student_id: Option<&str>, document_number: &str) -> CreateStudentCommand {
        CreateStudentCommand {
            student_id: student_id.map(str::to_string),
            profile: profile(document_number),
        }
    }

    #[tokio::test]
    async fn test_create_derives_identifier_when_absent() {
        let (_dir, service) = setup_test();

        let first = service.create_student(create(None, "1234-5678-9012")).await.unwrap();
        let second = service.create_student(create(None, "9999-8888-9012")).await.unwrap();

        assert_eq!(first.student_id, "2026-9012-0001");
        assert_eq!(second.student_id, "2026-9012-0002");
        assert_eq!(first.profile.document_number, "123456789012");
        assert_eq!(first.profile.full_name, "Asha Rao");
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_a_conflict() {
        let (_dir, service) = setup_test();

        service
            .create_student(create(Some("2026-9012-0001"), "123456789012"))
            .await
            .unwrap();
        let result = service
            .create_student(create(Some("2026-9012-0001"), "111122229012"))
            .await;

        assert!(matches!(result, Err(StudentServiceError::DuplicateIdentifier(id)) if id == "2026-9012-0001"));
    }

    #[tokio::test]
    async fn test_identifier_must_match_document() {
        let (_dir, service) = setup_test();
        let result = service
            .create_student(create(Some("2026-4821-0001"), "123456789012"))
            .await;
        assert!(matches!(result, Err(StudentServiceError::IdentifierMismatch(_))));
    }

    #[tokio::test]
    async fn test_proposed_identifier_must_be_current_and_next() {
        let (_dir, service) = setup_test();

        for forged in ["1999-9012-0001", "2026-9012-9999", "2026-9012-0002"] {
            let result = service.create_student(create(Some(forged), "123456789012")).await;
            assert!(
                matches!(&result, Err(StudentServiceError::IdentifierMismatch(id)) if id == forged),
                "{} was accepted",
                forged
            );
        }
        assert!(service.list_identifiers().await.unwrap().is_empty());

        let created = service
            .create_student(create(Some("2026-9012-0001"), "123456789012"))
            .await
            .unwrap();
        assert_eq!(created.student_id, "2026-9012-0001");
        let next = service.create_student(create(None, "123456789012")).await.unwrap();
        assert_eq!(next.student_id, "2026-9012-0002");
    }

    #[tokio::test]
    async fn test_exhausted_partition_is_not_a_conflict() {
        let (_dir, service) = setup_test();
        let now = Utc::now();
        service
            .student_repository
            .insert_student(&DomainStudent {
                id: DomainStudent::generate_id(),
                student_id: "2026-9012-9999".to_string(),
                profile: profile("123456789012"),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let result = service.create_student(create(None, "123456789012")).await;
        assert!(matches!(
            result,
            Err(StudentServiceError::IdentifierUnavailable(IdentifierError::SequenceExhausted { year: 2026, .. }))
        ));
        assert_eq!(service.list_identifiers().await.unwrap(), vec!["2026-9012-9999".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_profile_reports_field_paths() {
        let (_dir, service) = setup_test();
        let mut command = create(None, "1234");
        command.profile.address.postal_code = "41".to_string();

        let Err(StudentServiceError::Invalid(errors)) = service.create_student(command).await else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("document_number").map(String::as_str), Some("Identity document number must be 12 digits"));
        assert_eq!(errors.get("address.postal_code").map(String::as_str), Some("Postal code must be 6 digits"));
        assert!(service.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unnamed_second_guardian_is_rejected() {
        let (_dir, service) = setup_test();
        let mut command = create(None, "1234-5678-9012");
        command.profile.contacts.guardians.push(Guardian {
            name: String::new(),
            phone: Some("9876543210".to_string()),
            occupation: Some("Engineer".to_string()),
        });

        let Err(StudentServiceError::Invalid(errors)) = service.create_student(command).await else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key("guardian.second.name"));
        assert!(service.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_vehicle_must_exist() {
        let (_dir, service) = setup_test();
        let mut command = create(None, "123456789012");
        command.profile.transport = TransportEnrollment {
            enabled: true,
            vehicle_id: Some("vehicle::missing".to_string()),
            route_ref: Some("R1".to_string()),
            stop: Some(Stop { name: "Main Gate".to_string(), lat: None, lon: None }),
        };

        let Err(StudentServiceError::Invalid(errors)) = service.create_student(command).await else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key("transport.vehicle"));
    }

    #[tokio::test]
    async fn test_authored_stop_is_added_to_route() {
        let (_dir, service) = setup_test();
        let vehicle = service
            .transport_service
            .register_vehicle(RegisterVehicleCommand { label: "Bus 1".to_string(), route_ref: "R1".to_string() })
            .await
            .unwrap();
        service
            .transport_service
            .register_route(RegisterRouteCommand {
                route_ref: "R1".to_string(),
                stops: vec![Stop { name: "Main Gate".to_string(), lat: None, lon: None }],
            })
            .await
            .unwrap();

        let mut command = create(None, "123456789012");
        command.profile.transport = TransportEnrollment {
            enabled: true,
            vehicle_id: Some(vehicle.id),
            route_ref: Some("R1".to_string()),
            stop: Some(Stop { name: "New Colony".to_string(), lat: Some(18.5), lon: Some(73.8) }),
        };
        service.create_student(command).await.unwrap();

        let stops = service.transport_service.list_stops("R1").await.unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].name, "New Colony");
    }

    #[tokio::test]
    async fn test_update_keeps_identifier_and_document() {
        let (_dir, service) = setup_test();
        let created = service.create_student(create(None, "123456789012")).await.unwrap();

        let mut changed = profile("1234-5678-9012");
        changed.class.section = "B".to_string();
        let updated = service
            .update_student(UpdateStudentCommand { id: created.id.clone(), profile: changed })
            .await
            .unwrap();
        assert_eq!(updated.student_id, created.student_id);
        assert_eq!(updated.profile.class.section, "B");

        let result = service
            .update_student(UpdateStudentCommand { id: created.id.clone(), profile: profile("999988887777") })
            .await;
        assert!(matches!(result, Err(StudentServiceError::DocumentNumberChanged)));
    }

    #[tokio::test]
    async fn test_update_unknown_student() {
        let (_dir, service) = setup_test();
        let result = service
            .update_student(UpdateStudentCommand {
                id: "student::missing".to_string(),
                profile: profile("123456789012"),
            })
            .await;
        assert!(matches!(result, Err(StudentServiceError::NotFound(_))));
        assert!(matches!(
            service.get_student("student::missing").await,
            Err(StudentServiceError::NotFound(_))
        ));
    }
}
