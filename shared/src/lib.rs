use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Postal address block of a student record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub line: String,
    pub city: String,
    pub state: String,
    /// Six digit postal code
    pub postal_code: String,
}

/// One guardian entry on a student record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Guardian {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
}

/// Guardian/contact block: up to two guardians plus the designated contact number
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardianContacts {
    pub guardians: Vec<Guardian>,
    /// The number the school calls first (10 digits, starts with 6-9)
    pub primary_contact_phone: String,
}

/// Grade and section a student is placed in
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassPlacement {
    pub grade: String,
    pub section: String,
}

/// A pickup/drop stop, either from a route catalog or authored during enrollment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Transport enrollment sub-record.
///
/// A disabled enrollment serializes as `{"enabled": false}` and nothing else.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportEnrollment {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,
}

impl TransportEnrollment {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Everything about a student that the enrollment wizard collects
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Normalized 12 digit identity document number (no separators)
    pub document_number: String,
    pub given_name: String,
    pub family_name: String,
    /// Given and family name joined with a single space
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// ISO 8601 date (YYYY-MM-DD)
    pub date_of_birth: String,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_notes: Option<String>,
    pub address: Address,
    pub class: ClassPlacement,
    pub contacts: GuardianContacts,
    pub transport: TransportEnrollment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A persisted student record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Storage id, format "student::<uuid>"
    pub id: String,
    /// Human-readable identifier, format "YYYY-NNNN-SSSS"
    pub student_id: String,
    #[serde(flatten)]
    pub profile: StudentProfile,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

/// Request to create a student record.
///
/// `student_id` is omitted when the client could not derive one yet; the
/// records API assigns it in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(flatten)]
    pub profile: StudentProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStudentResponse {
    pub student: StudentRecord,
    pub success_message: String,
}

/// Request to update an existing record. The identifier never changes on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStudentRequest {
    #[serde(flatten)]
    pub profile: StudentProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<StudentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierListResponse {
    pub identifiers: Vec<String>,
}

/// A school vehicle and the route it serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub label: String,
    pub route_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleListResponse {
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterVehicleRequest {
    pub label: String,
    pub route_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopListResponse {
    pub route_ref: String,
    pub stops: Vec<Stop>,
}

/// Request to register (or replace) the itinerary of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRouteRequest {
    pub route_ref: String,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub url: String,
}

/// Category of a failed API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The record collides with an existing one (duplicate identifier)
    Conflict,
    /// One or more fields failed validation
    Validation,
    NotFound,
    /// The request was refused before processing (bad upload type, too large)
    Rejected,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// Error body returned by every records API endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub error: String,
    /// Field path -> message, filled for validation failures
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            field_errors: BTreeMap::new(),
        }
    }

    pub fn with_field_errors(mut self, field_errors: BTreeMap<String, String>) -> Self {
        self.field_errors = field_errors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_profile() -> StudentProfile {
        StudentProfile {
            document_number: "123456789012".to_string(),
            given_name: "Asha".to_string(),
            family_name: "Rao".to_string(),
            full_name: "Asha Rao".to_string(),
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
                guardians: vec![Guardian { name: "Ravi Rao".to_string(), ..Default::default() }],
                primary_contact_phone: "7123456789".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_transport_serializes_to_flag_only() {
        let value = serde_json::to_value(TransportEnrollment::disabled()).unwrap();
        assert_eq!(value, json!({ "enabled": false }));
    }

    #[test]
    fn test_create_request_omits_missing_identifier() {
        let request = CreateStudentRequest { student_id: None, profile: sample_profile() };
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("student_id").is_none());
        assert_eq!(value["full_name"], "Asha Rao");
        assert_eq!(value["class"]["section"], "A");
    }

    #[test]
    fn test_student_record_flattens_profile() {
        let record = StudentRecord {
            id: "student::abc".to_string(),
            student_id: "2026-9012-0001".to_string(),
            profile: sample_profile(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };

        let text = serde_json::to_string(&record).unwrap();
        let parsed: StudentRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, record);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["document_number"], "123456789012");
    }

    #[test]
    fn test_error_response_kind_is_snake_case() {
        let body = ErrorResponse::new(ErrorKind::NotFound, "Student not found");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["kind"], "not_found");
        assert!(value.get("field_errors").is_none());
    }
}
