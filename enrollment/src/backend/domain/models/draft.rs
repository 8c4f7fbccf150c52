//! The in-progress student record edited by the enrollment wizard.
//!
//! Every edit returns a new [`DraftRecord`] value; nothing mutates a draft in
//! place. Field paths are addressed through [`RuleKey`], a tagged union of the
//! flat fields and the nested groups (address, guardians, transport).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::domain::identity::PENDING_IDENTIFIER;

/// Flat (top-level) draft fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    DocumentNumber,
    GivenName,
    FamilyName,
    Email,
    DateOfBirth,
    Gender,
    BloodGroup,
    Nationality,
    Religion,
    MedicalNotes,
    Grade,
    Section,
    PrimaryContactPhone,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::DocumentNumber => "document_number",
            FieldKey::GivenName => "given_name",
            FieldKey::FamilyName => "family_name",
            FieldKey::Email => "email",
            FieldKey::DateOfBirth => "date_of_birth",
            FieldKey::Gender => "gender",
            FieldKey::BloodGroup => "blood_group",
            FieldKey::Nationality => "nationality",
            FieldKey::Religion => "religion",
            FieldKey::MedicalNotes => "medical_notes",
            FieldKey::Grade => "grade",
            FieldKey::Section => "section",
            FieldKey::PrimaryContactPhone => "primary_contact_phone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Line,
    City,
    State,
    PostalCode,
}

impl AddressField {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressField::Line => "line",
            AddressField::City => "city",
            AddressField::State => "state",
            AddressField::PostalCode => "postal_code",
        }
    }
}

/// Which of the two guardian sub-records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianSlot {
    First,
    Second,
}

impl GuardianSlot {
    pub fn index(self) -> usize {
        match self {
            GuardianSlot::First => 0,
            GuardianSlot::Second => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GuardianSlot::First => "first",
            GuardianSlot::Second => "second",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianField {
    Name,
    Phone,
    Occupation,
}

impl GuardianField {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardianField::Name => "name",
            GuardianField::Phone => "phone",
            GuardianField::Occupation => "occupation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportField {
    Vehicle,
    Stop,
}

impl TransportField {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportField::Vehicle => "vehicle",
            TransportField::Stop => "stop",
        }
    }
}

/// Path of a draft field: a flat field or a `(group, field)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKey {
    Field(FieldKey),
    Address(AddressField),
    Guardian(GuardianSlot, GuardianField),
    Transport(TransportField),
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKey::Field(field) => f.write_str(field.as_str()),
            RuleKey::Address(field) => write!(f, "address.{}", field.as_str()),
            RuleKey::Guardian(slot, field) => write!(f, "guardian.{}.{}", slot.as_str(), field.as_str()),
            RuleKey::Transport(field) => write!(f, "transport.{}", field.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AddressDraft {
    pub line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardianDraft {
    pub name: String,
    pub phone: String,
    pub occupation: String,
}

/// How the student's stop was chosen
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum StopChoice {
    #[default]
    Unselected,
    /// Picked from the selected vehicle's route
    Selected(String),
    /// Typed in by the operator, optionally with coordinates
    Authored {
        name: String,
        lat: Option<f64>,
        lon: Option<f64>,
    },
}

impl StopChoice {
    pub fn name(&self) -> Option<&str> {
        match self {
            StopChoice::Unselected => None,
            StopChoice::Selected(name) => Some(name),
            StopChoice::Authored { name, .. } => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportDraft {
    pub enabled: bool,
    pub vehicle_id: Option<String>,
    pub route_ref: Option<String>,
    pub stop: StopChoice,
}

/// The value a rule sees for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    /// A guardian name, seen together with the rest of its sub-record
    Guardian(&'a GuardianDraft),
    Transport(&'a TransportDraft),
}

impl<'a> FieldValue<'a> {
    pub fn as_text(&self) -> &'a str {
        match *self {
            FieldValue::Text(text) => text,
            FieldValue::Guardian(guardian) => &guardian.name,
            FieldValue::Transport(_) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Derived identifier; holds [`PENDING_IDENTIFIER`] until derivable
    pub identifier: String,
    pub document_number: String,
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub date_of_birth: String,
    pub gender: String,
    pub blood_group: String,
    pub nationality: String,
    pub religion: String,
    pub medical_notes: String,
    pub address: AddressDraft,
    pub grade: String,
    pub section: String,
    pub guardians: [GuardianDraft; 2],
    pub primary_contact_phone: String,
    pub transport: TransportDraft,
    pub photo_url: Option<String>,
}

impl Default for DraftRecord {
    fn default() -> Self {
        Self {
            identifier: PENDING_IDENTIFIER.to_string(),
            document_number: String::new(),
            given_name: String::new(),
            family_name: String::new(),
            email: String::new(),
            date_of_birth: String::new(),
            gender: String::new(),
            blood_group: String::new(),
            nationality: String::new(),
            religion: String::new(),
            medical_notes: String::new(),
            address: AddressDraft::default(),
            grade: String::new(),
            section: String::new(),
            guardians: Default::default(),
            primary_contact_phone: String::new(),
            transport: TransportDraft::default(),
            photo_url: None,
        }
    }
}

impl DraftRecord {
    /// Current value of a field path
    pub fn value_of(&self, key: RuleKey) -> FieldValue<'_> {
        match key {
            RuleKey::Field(field) => FieldValue::Text(self.flat_field(field)),
            RuleKey::Address(field) => FieldValue::Text(match field {
                AddressField::Line => &self.address.line,
                AddressField::City => &self.address.city,
                AddressField::State => &self.address.state,
                AddressField::PostalCode => &self.address.postal_code,
            }),
            RuleKey::Guardian(slot, field) => {
                let guardian = &self.guardians[slot.index()];
                match field {
                    GuardianField::Name => FieldValue::Guardian(guardian),
                    GuardianField::Phone => FieldValue::Text(&guardian.phone),
                    GuardianField::Occupation => FieldValue::Text(&guardian.occupation),
                }
            }
            RuleKey::Transport(_) => FieldValue::Transport(&self.transport),
        }
    }

    fn flat_field(&self, field: FieldKey) -> &str {
        match field {
            FieldKey::DocumentNumber => &self.document_number,
            FieldKey::GivenName => &self.given_name,
            FieldKey::FamilyName => &self.family_name,
            FieldKey::Email => &self.email,
            FieldKey::DateOfBirth => &self.date_of_birth,
            FieldKey::Gender => &self.gender,
            FieldKey::BloodGroup => &self.blood_group,
            FieldKey::Nationality => &self.nationality,
            FieldKey::Religion => &self.religion,
            FieldKey::MedicalNotes => &self.medical_notes,
            FieldKey::Grade => &self.grade,
            FieldKey::Section => &self.section,
            FieldKey::PrimaryContactPhone => &self.primary_contact_phone,
        }
    }

    /// New draft with a text field replaced.
    ///
    /// Transport paths are not text: `transport.vehicle` sets the vehicle id
    /// (keeping the route) and `transport.stop` selects a catalog stop by name.
    pub fn with_text(&self, key: RuleKey, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut next = self.clone();
        match key {
            RuleKey::Field(field) => {
                let slot = match field {
                    FieldKey::DocumentNumber => &mut next.document_number,
                    FieldKey::GivenName => &mut next.given_name,
                    FieldKey::FamilyName => &mut next.family_name,
                    FieldKey::Email => &mut next.email,
                    FieldKey::DateOfBirth => &mut next.date_of_birth,
                    FieldKey::Gender => &mut next.gender,
                    FieldKey::BloodGroup => &mut next.blood_group,
                    FieldKey::Nationality => &mut next.nationality,
                    FieldKey::Religion => &mut next.religion,
                    FieldKey::MedicalNotes => &mut next.medical_notes,
                    FieldKey::Grade => &mut next.grade,
                    FieldKey::Section => &mut next.section,
                    FieldKey::PrimaryContactPhone => &mut next.primary_contact_phone,
                };
                *slot = value;
            }
            RuleKey::Address(field) => {
                let slot = match field {
                    AddressField::Line => &mut next.address.line,
                    AddressField::City => &mut next.address.city,
                    AddressField::State => &mut next.address.state,
                    AddressField::PostalCode => &mut next.address.postal_code,
                };
                *slot = value;
            }
            RuleKey::Guardian(guardian_slot, field) => {
                let guardian = &mut next.guardians[guardian_slot.index()];
                let slot = match field {
                    GuardianField::Name => &mut guardian.name,
                    GuardianField::Phone => &mut guardian.phone,
                    GuardianField::Occupation => &mut guardian.occupation,
                };
                *slot = value;
            }
            RuleKey::Transport(TransportField::Vehicle) => {
                next.transport.vehicle_id = non_blank(value);
            }
            RuleKey::Transport(TransportField::Stop) => {
                next.transport.stop = match non_blank(value) {
                    Some(name) => StopChoice::Selected(name),
                    None => StopChoice::Unselected,
                };
            }
        }
        next
    }

    pub fn with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), ..self.clone() }
    }

    pub fn with_transport_enabled(&self, enabled: bool) -> Self {
        let mut next = self.clone();
        next.transport.enabled = enabled;
        next
    }

    /// Select a vehicle; the previously chosen stop belonged to another route and is dropped
    pub fn with_vehicle(&self, vehicle_id: impl Into<String>, route_ref: Option<String>) -> Self {
        let mut next = self.clone();
        next.transport.vehicle_id = non_blank(vehicle_id.into());
        next.transport.route_ref = route_ref;
        next.transport.stop = StopChoice::Unselected;
        next
    }

    pub fn with_stop(&self, stop: StopChoice) -> Self {
        let mut next = self.clone();
        next.transport.stop = stop;
        next
    }

    pub fn with_photo_url(&self, photo_url: Option<String>) -> Self {
        Self { photo_url, ..self.clone() }
    }

    pub fn has_pending_identifier(&self) -> bool {
        self.identifier == PENDING_IDENTIFIER
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_text_returns_new_value() {
        let draft = DraftRecord::default();
        let edited = draft.with_text(RuleKey::Field(FieldKey::GivenName), "Asha");

        assert_eq!(draft.given_name, "");
        assert_eq!(edited.given_name, "Asha");
        assert_eq!(edited.value_of(RuleKey::Field(FieldKey::GivenName)), FieldValue::Text("Asha"));
    }

    #[test]
    fn test_nested_paths() {
        let draft = DraftRecord::default()
            .with_text(RuleKey::Address(AddressField::PostalCode), "411001")
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone), "9876543210");

        assert_eq!(draft.address.postal_code, "411001");
        assert_eq!(draft.guardians[1].phone, "9876543210");
        assert_eq!(draft.guardians[0].phone, "");
    }

    #[test]
    fn test_vehicle_change_clears_stop() {
        let draft = DraftRecord::default()
            .with_vehicle("vehicle::1", Some("R1".to_string()))
            .with_stop(StopChoice::Selected("Main Gate".to_string()))
            .with_vehicle("vehicle::2", Some("R2".to_string()));

        assert_eq!(draft.transport.vehicle_id.as_deref(), Some("vehicle::2"));
        assert_eq!(draft.transport.stop, StopChoice::Unselected);
    }

    #[test]
    fn test_rule_key_paths() {
        assert_eq!(RuleKey::Field(FieldKey::DocumentNumber).to_string(), "document_number");
        assert_eq!(RuleKey::Address(AddressField::PostalCode).to_string(), "address.postal_code");
        assert_eq!(
            RuleKey::Guardian(GuardianSlot::First, GuardianField::Phone).to_string(),
            "guardian.first.phone"
        );
        assert_eq!(RuleKey::Transport(TransportField::Stop).to_string(), "transport.stop");
    }

    #[test]
    fn test_default_identifier_is_pending() {
        assert!(DraftRecord::default().has_pending_identifier());
    }
}
