//! Conversion between the wizard draft and the external record shape.
//!
//! `assemble_profile` is applied once a draft has passed validation: it
//! normalizes the document number, builds the full name, trims text fields,
//! drops blank optional values, and restructures the guardian, address and
//! transport blocks. `draft_from_profile` goes the other way for edits and
//! for server-side re-validation.

use shared::{Address, ClassPlacement, Guardian, GuardianContacts, StudentProfile, Stop, TransportEnrollment};

use crate::backend::domain::identity::normalize_document_number;
use crate::backend::domain::models::draft::{
    AddressDraft, DraftRecord, GuardianDraft, StopChoice, TransportDraft,
};

pub fn assemble_profile(draft: &DraftRecord) -> StudentProfile {
    let given_name = draft.given_name.trim().to_string();
    let family_name = draft.family_name.trim().to_string();
    let full_name = format!("{} {}", given_name, family_name).trim().to_string();

    StudentProfile {
        document_number: normalize_document_number(&draft.document_number),
        given_name,
        family_name,
        full_name,
        email: optional(&draft.email),
        date_of_birth: draft.date_of_birth.trim().to_string(),
        gender: draft.gender.trim().to_string(),
        blood_group: optional(&draft.blood_group).map(|group| group.to_uppercase()),
        nationality: optional(&draft.nationality),
        religion: optional(&draft.religion),
        medical_notes: optional(&draft.medical_notes),
        address: Address {
            line: draft.address.line.trim().to_string(),
            city: draft.address.city.trim().to_string(),
            state: draft.address.state.trim().to_string(),
            postal_code: draft.address.postal_code.trim().to_string(),
        },
        class: ClassPlacement {
            grade: draft.grade.trim().to_string(),
            section: draft.section.trim().to_string(),
        },
        contacts: GuardianContacts {
            guardians: draft
                .guardians
                .iter()
                // validation requires a name once phone or occupation is filled
                .filter(|guardian| !guardian.name.trim().is_empty())
                .map(|guardian| Guardian {
                    name: guardian.name.trim().to_string(),
                    phone: optional(&guardian.phone),
                    occupation: optional(&guardian.occupation),
                })
                .collect(),
            primary_contact_phone: draft.primary_contact_phone.trim().to_string(),
        },
        transport: assemble_transport(&draft.transport),
        photo_url: draft.photo_url.clone(),
    }
}

/// A disabled enrollment collapses to `{enabled: false}` whatever else was typed
pub fn assemble_transport(transport: &TransportDraft) -> TransportEnrollment {
    if !transport.enabled {
        return TransportEnrollment::disabled();
    }

    let stop = match &transport.stop {
        StopChoice::Unselected => None,
        StopChoice::Selected(name) => Some(Stop { name: name.trim().to_string(), lat: None, lon: None }),
        StopChoice::Authored { name, lat, lon } => Some(Stop {
            name: name.trim().to_string(),
            lat: *lat,
            lon: *lon,
        }),
    };

    TransportEnrollment {
        enabled: true,
        vehicle_id: transport.vehicle_id.clone(),
        route_ref: transport.route_ref.clone(),
        stop,
    }
}

/// Rebuild a draft from a stored or submitted profile
pub fn draft_from_profile(profile: &StudentProfile, identifier: &str) -> DraftRecord {
    let mut guardians: [GuardianDraft; 2] = Default::default();
    for (slot, guardian) in guardians.iter_mut().zip(&profile.contacts.guardians) {
        *slot = GuardianDraft {
            name: guardian.name.clone(),
            phone: guardian.phone.clone().unwrap_or_default(),
            occupation: guardian.occupation.clone().unwrap_or_default(),
        };
    }

    let transport = &profile.transport;
    let stop = match &transport.stop {
        None => StopChoice::Unselected,
        Some(stop) if stop.lat.is_some() || stop.lon.is_some() => StopChoice::Authored {
            name: stop.name.clone(),
            lat: stop.lat,
            lon: stop.lon,
        },
        Some(stop) => StopChoice::Selected(stop.name.clone()),
    };

    DraftRecord {
        identifier: identifier.to_string(),
        document_number: profile.document_number.clone(),
        given_name: profile.given_name.clone(),
        family_name: profile.family_name.clone(),
        email: profile.email.clone().unwrap_or_default(),
        date_of_birth: profile.date_of_birth.clone(),
        gender: profile.gender.clone(),
        blood_group: profile.blood_group.clone().unwrap_or_default(),
        nationality: profile.nationality.clone().unwrap_or_default(),
        religion: profile.religion.clone().unwrap_or_default(),
        medical_notes: profile.medical_notes.clone().unwrap_or_default(),
        address: AddressDraft {
            line: profile.address.line.clone(),
            city: profile.address.city.clone(),
            state: profile.address.state.clone(),
            postal_code: profile.address.postal_code.clone(),
        },
        grade: profile.class.grade.clone(),
        section: profile.class.section.clone(),
        guardians,
        primary_contact_phone: profile.contacts.primary_contact_phone.clone(),
        transport: TransportDraft {
            enabled: transport.enabled,
            vehicle_id: transport.vehicle_id.clone(),
            route_ref: transport.route_ref.clone(),
            stop,
        },
        photo_url: profile.photo_url.clone(),
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::draft::{FieldKey, GuardianField, GuardianSlot, RuleKey};

    #[test]
    fn test_assemble_normalizes_identity() {
        let draft = DraftRecord::default()
            .with_text(RuleKey::Field(FieldKey::DocumentNumber), "1234-5678 9012")
            .with_text(RuleKey::Field(FieldKey::GivenName), " Asha ")
            .with_text(RuleKey::Field(FieldKey::FamilyName), "Rao")
            .with_text(RuleKey::Field(FieldKey::Email), "  ");

        let profile = assemble_profile(&draft);
        assert_eq!(profile.document_number, "123456789012");
        assert_eq!(profile.full_name, "Asha Rao");
        assert_eq!(profile.email, None);
    }

    #[test]
    fn test_blank_second_guardian_is_dropped() {
        let draft = DraftRecord::default()
            .with_text(RuleKey::Guardian(GuardianSlot::First, GuardianField::Name), "Ravi Rao")
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Occupation), "  ");

        let profile = assemble_profile(&draft);
        assert_eq!(profile.contacts.guardians.len(), 1);
        assert_eq!(profile.contacts.guardians[0].name, "Ravi Rao");
        assert_eq!(profile.contacts.guardians[0].phone, None);
    }

    #[test]
    fn test_second_guardian_with_details_keeps_its_phone() {
        let draft = DraftRecord::default()
            .with_text(RuleKey::Guardian(GuardianSlot::First, GuardianField::Name), "Ravi Rao")
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Name), "Meera Rao")
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone), "9876543210");

        let profile = assemble_profile(&draft);
        assert_eq!(profile.contacts.guardians.len(), 2);
        assert_eq!(profile.contacts.guardians[1].phone.as_deref(), Some("9876543210"));

        let rebuilt = draft_from_profile(&profile, "2026-9012-0001");
        assert_eq!(rebuilt.guardians[1].phone, "9876543210");
    }

    #[test]
    fn test_disabled_transport_collapses() {
        let transport = TransportDraft {
            enabled: false,
            vehicle_id: Some("vehicle::7".to_string()),
            route_ref: Some("R7".to_string()),
            stop: StopChoice::Selected("Clock Tower".to_string()),
        };
        assert_eq!(assemble_transport(&transport), TransportEnrollment::disabled());
    }

    #[test]
    fn test_authored_stop_keeps_coordinates() {
        let transport = TransportDraft {
            enabled: true,
            vehicle_id: Some("vehicle::7".to_string()),
            route_ref: Some("R7".to_string()),
            stop: StopChoice::Authored { name: "New Colony".to_string(), lat: Some(18.5), lon: Some(73.8) },
        };
        let assembled = assemble_transport(&transport);
        let stop = assembled.stop.unwrap();
        assert_eq!(stop.name, "New Colony");
        assert_eq!(stop.lat, Some(18.5));
    }

    #[test]
    fn test_profile_round_trips_through_draft() {
        let draft = DraftRecord::default()
            .with_text(RuleKey::Field(FieldKey::DocumentNumber), "123456789012")
            .with_text(RuleKey::Field(FieldKey::GivenName), "Asha")
            .with_text(RuleKey::Field(FieldKey::FamilyName), "Rao")
            .with_text(RuleKey::Guardian(GuardianSlot::First, GuardianField::Name), "Ravi Rao")
            .with_text(RuleKey::Field(FieldKey::PrimaryContactPhone), "7123456789");

        let profile = assemble_profile(&draft);
        let rebuilt = draft_from_profile(&profile, "2026-9012-0001");
        assert_eq!(rebuilt.identifier, "2026-9012-0001");
        assert_eq!(assemble_profile(&rebuilt), profile);
    }
}
