//! Field validation rules for the enrollment wizard.
//!
//! The [`RuleTable`] maps every validated [`RuleKey`] to a rule function. A
//! rule looks at a single field value (plus the date context for age checks)
//! and returns an error message, or `None` when the value is acceptable.
//! Optional fields pass when empty but must still have the right shape when
//! filled in.
//!
//! ## Fail-open evaluation
//!
//! A rule that panics is caught, logged at `warn`, and treated as "no error".
//! The records API runs the same table again when a record is created.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

use crate::backend::domain::identity::{is_complete_document_number, normalize_document_number};
use crate::backend::domain::models::draft::{
    AddressField, DraftRecord, FieldKey, FieldValue, GuardianField, GuardianSlot, RuleKey, StopChoice,
    TransportField,
};

/// Field path -> current error message. Absent key means the field is fine.
pub type ErrorMap = BTreeMap<RuleKey, String>;

/// A rule: field value in, error message out
pub type Rule = fn(FieldValue<'_>, &RuleContext) -> Option<String>;

/// Inclusive age range (in whole years) accepted for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for AgeBounds {
    fn default() -> Self {
        Self { min: 3, max: 22 }
    }
}

/// Everything a rule may depend on besides the field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub today: NaiveDate,
    pub age_bounds: AgeBounds,
}

/// Wizard pages in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    Identity = 1,
    Personal = 2,
    ClassAndFamily = 3,
    Transport = 4,
}

const IDENTITY_KEYS: &[RuleKey] = &[
    RuleKey::Field(FieldKey::DocumentNumber),
    RuleKey::Field(FieldKey::GivenName),
    RuleKey::Field(FieldKey::FamilyName),
    RuleKey::Field(FieldKey::Email),
];

const PERSONAL_KEYS: &[RuleKey] = &[
    RuleKey::Field(FieldKey::DateOfBirth),
    RuleKey::Field(FieldKey::Gender),
    RuleKey::Field(FieldKey::BloodGroup),
    RuleKey::Address(AddressField::Line),
    RuleKey::Address(AddressField::City),
    RuleKey::Address(AddressField::State),
    RuleKey::Address(AddressField::PostalCode),
];

const CLASS_AND_FAMILY_KEYS: &[RuleKey] = &[
    RuleKey::Field(FieldKey::Grade),
    RuleKey::Field(FieldKey::Section),
    RuleKey::Guardian(GuardianSlot::First, GuardianField::Name),
    RuleKey::Guardian(GuardianSlot::First, GuardianField::Phone),
    RuleKey::Guardian(GuardianSlot::First, GuardianField::Occupation),
    RuleKey::Guardian(GuardianSlot::Second, GuardianField::Name),
    RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone),
    RuleKey::Guardian(GuardianSlot::Second, GuardianField::Occupation),
    RuleKey::Field(FieldKey::PrimaryContactPhone),
];

const TRANSPORT_KEYS: &[RuleKey] = &[
    RuleKey::Transport(TransportField::Vehicle),
    RuleKey::Transport(TransportField::Stop),
];

impl Step {
    pub const FIRST: Step = Step::Identity;
    pub const LAST: Step = Step::Transport;

    /// Steps whose rules must pass before a record can be created
    pub const REQUIRED: [Step; 3] = [Step::Identity, Step::Personal, Step::ClassAndFamily];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Step::Identity),
            2 => Some(Step::Personal),
            3 => Some(Step::ClassAndFamily),
            4 => Some(Step::Transport),
            _ => None,
        }
    }

    /// Following step, saturating at the last one
    pub fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(Self::LAST)
    }

    /// Preceding step, saturating at the first one
    pub fn previous(self) -> Self {
        Self::from_number(self.number().saturating_sub(1)).unwrap_or(Self::FIRST)
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Identity => "Identity",
            Step::Personal => "Personal",
            Step::ClassAndFamily => "Class & Family",
            Step::Transport => "Transport",
        }
    }

    /// Ordered field paths validated on this step
    pub fn keys(self) -> &'static [RuleKey] {
        match self {
            Step::Identity => IDENTITY_KEYS,
            Step::Personal => PERSONAL_KEYS,
            Step::ClassAndFamily => CLASS_AND_FAMILY_KEYS,
            Step::Transport => TRANSPORT_KEYS,
        }
    }

    /// The step a field path is shown on
    pub fn of_key(key: RuleKey) -> Self {
        [Step::Identity, Step::Personal, Step::ClassAndFamily, Step::Transport]
            .into_iter()
            .find(|step| step.keys().contains(&key))
            .unwrap_or(Step::FIRST)
    }
}

/// Rule lookup and evaluation
#[derive(Clone)]
pub struct RuleTable {
    rules: BTreeMap<RuleKey, Rule>,
}

impl RuleTable {
    /// The rule set for student enrollment
    pub fn student() -> Self {
        let rules: [(RuleKey, Rule); 22] = [
            (RuleKey::Field(FieldKey::DocumentNumber), document_number_rule),
            (RuleKey::Field(FieldKey::GivenName), given_name_rule),
            (RuleKey::Field(FieldKey::FamilyName), family_name_rule),
            (RuleKey::Field(FieldKey::Email), email_rule),
            (RuleKey::Field(FieldKey::DateOfBirth), date_of_birth_rule),
            (RuleKey::Field(FieldKey::Gender), gender_rule),
            (RuleKey::Field(FieldKey::BloodGroup), blood_group_rule),
            (RuleKey::Address(AddressField::Line), address_line_rule),
            (RuleKey::Address(AddressField::City), city_rule),
            (RuleKey::Address(AddressField::State), state_rule),
            (RuleKey::Address(AddressField::PostalCode), postal_code_rule),
            (RuleKey::Field(FieldKey::Grade), grade_rule),
            (RuleKey::Field(FieldKey::Section), section_rule),
            (RuleKey::Guardian(GuardianSlot::First, GuardianField::Name), primary_guardian_name_rule),
            (RuleKey::Guardian(GuardianSlot::Second, GuardianField::Name), secondary_guardian_name_rule),
            (RuleKey::Field(FieldKey::PrimaryContactPhone), primary_contact_phone_rule),
            (RuleKey::Transport(TransportField::Vehicle), transport_vehicle_rule),
            (RuleKey::Transport(TransportField::Stop), transport_stop_rule),
            (RuleKey::Guardian(GuardianSlot::First, GuardianField::Phone), optional_phone_rule),
            (RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone), optional_phone_rule),
            (RuleKey::Guardian(GuardianSlot::First, GuardianField::Occupation), occupation_rule),
            (RuleKey::Guardian(GuardianSlot::Second, GuardianField::Occupation), occupation_rule),
        ];

        Self { rules: rules.into_iter().collect() }
    }

    /// Replace (or add) the rule for a key
    pub fn with_rule(mut self, key: RuleKey, rule: Rule) -> Self {
        self.rules.insert(key, rule);
        self
    }

    pub fn has_rule(&self, key: RuleKey) -> bool {
        self.rules.contains_key(&key)
    }

    /// Evaluate the rule for `key` against `value`.
    ///
    /// Keys without a rule (free-text fields) always pass. A panicking rule
    /// is reported as passing.
    pub fn evaluate(&self, key: RuleKey, value: FieldValue<'_>, context: &RuleContext) -> Option<String> {
        let rule = self.rules.get(&key)?;
        match panic::catch_unwind(AssertUnwindSafe(|| rule(value, context))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Validation rule for '{}' panicked; treating the field as valid", key);
                None
            }
        }
    }

    /// Evaluate a list of keys against the draft and collect the failures
    pub fn evaluate_keys(&self, keys: &[RuleKey], draft: &DraftRecord, context: &RuleContext) -> ErrorMap {
        keys.iter()
            .filter_map(|key| {
                self.evaluate(*key, draft.value_of(*key), context)
                    .map(|message| (*key, message))
            })
            .collect()
    }

    pub fn evaluate_step(&self, step: Step, draft: &DraftRecord, context: &RuleContext) -> ErrorMap {
        self.evaluate_keys(step.keys(), draft, context)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::student()
    }
}

/// Age in whole years on `today`, counting a birthday only once it is reached
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    phone.len() == 10
        && phone.chars().all(|c| c.is_ascii_digit())
        && matches!(phone.chars().next(), Some('6'..='9'))
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && !host.ends_with('.') && !host.starts_with('.'),
        None => false,
    }
}

fn is_letters_and_spaces(value: &str) -> bool {
    value.chars().all(|c| c.is_alphabetic() || c == ' ')
}

fn coordinates_in_range(lat: Option<f64>, lon: Option<f64>) -> Result<(), String> {
    match (lat, lon) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) {
                Err("Latitude must be between -90 and 90".to_string())
            } else if !(-180.0..=180.0).contains(&lon) {
                Err("Longitude must be between -180 and 180".to_string())
            } else {
                Ok(())
            }
        }
        _ => Err("Enter both latitude and longitude, or neither".to_string()),
    }
}

/// Itinerary rule for route records: at least one stop with a name, and any
/// coordinates given must be in range.
pub fn validate_itinerary(stops: &[shared::Stop]) -> Option<String> {
    for stop in stops {
        if let Err(message) = coordinates_in_range(stop.lat, stop.lon) {
            return Some(format!("Stop '{}': {}", stop.name.trim(), message));
        }
    }
    if stops.iter().any(|stop| !stop.name.trim().is_empty()) {
        None
    } else {
        Some("Route must have at least one stop with a name".to_string())
    }
}

fn document_number_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text();
    if text.trim().is_empty() {
        return Some("Identity document number is required".to_string());
    }
    if !is_complete_document_number(&normalize_document_number(text)) {
        return Some("Identity document number must be 12 digits".to_string());
    }
    None
}

fn name_rule(text: &str, label: &str, min_chars: usize) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Some(format!("{} is required", label))
    } else if trimmed.chars().count() < min_chars {
        Some(format!("{} must be at least {} characters", label, min_chars))
    } else if !is_letters_and_spaces(trimmed) {
        Some(format!("{} can only contain letters and spaces", label))
    } else {
        None
    }
}

fn given_name_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    name_rule(value.as_text(), "First name", 2)
}

fn family_name_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    name_rule(value.as_text(), "Last name", 1)
}

fn email_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() || is_valid_email(text) {
        None
    } else {
        Some("Enter a valid email address".to_string())
    }
}

fn date_of_birth_rule(value: FieldValue<'_>, context: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() {
        return Some("Date of birth is required".to_string());
    }
    let Ok(date_of_birth) = NaiveDate::parse_from_str(text, "%Y-%m-%d") else {
        return Some("Enter date of birth as YYYY-MM-DD".to_string());
    };
    if date_of_birth > context.today {
        return Some("Date of birth cannot be in the future".to_string());
    }

    let age = age_on(date_of_birth, context.today);
    let bounds = context.age_bounds;
    if age < bounds.min as i32 {
        Some(format!("Student must be at least {} years old", bounds.min))
    } else if age > bounds.max as i32 {
        Some(format!("Student must be at most {} years old", bounds.max))
    } else {
        None
    }
}

const GENDERS: &[&str] = &["Male", "Female", "Other"];
const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
const GRADES: &[&str] = &[
    "Nursery", "LKG", "UKG", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12",
];

fn gender_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() {
        Some("Gender is required".to_string())
    } else if !GENDERS.iter().any(|g| g.eq_ignore_ascii_case(text)) {
        Some("Select Male, Female or Other".to_string())
    } else {
        None
    }
}

fn blood_group_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() || BLOOD_GROUPS.iter().any(|g| g.eq_ignore_ascii_case(text)) {
        None
    } else {
        Some("Select a valid blood group".to_string())
    }
}

fn required(text: &str, label: &str) -> Option<String> {
    if text.trim().is_empty() {
        Some(format!("{} is required", label))
    } else {
        None
    }
}

fn address_line_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    required(value.as_text(), "Address")
}

fn city_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    required(value.as_text(), "City")
}

fn state_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    required(value.as_text(), "State")
}

fn postal_code_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() {
        Some("Postal code is required".to_string())
    } else if text.len() != 6 || !text.chars().all(|c| c.is_ascii_digit()) {
        Some("Postal code must be 6 digits".to_string())
    } else {
        None
    }
}

fn grade_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() {
        Some("Grade is required".to_string())
    } else if !GRADES.iter().any(|g| g.eq_ignore_ascii_case(text)) {
        Some("Select a valid grade".to_string())
    } else {
        None
    }
}

fn section_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text().trim();
    if text.is_empty() {
        Some("Section is required".to_string())
    } else if text.chars().count() != 1 {
        Some("Section must be a single character".to_string())
    } else {
        None
    }
}

fn primary_guardian_name_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    name_rule(value.as_text(), "Guardian name", 2)
}

/// Optional, unless the second guardian's phone or occupation is filled
fn secondary_guardian_name_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text();
    if !text.trim().is_empty() {
        return name_rule(text, "Guardian name", 2);
    }
    match value {
        FieldValue::Guardian(guardian)
            if !guardian.phone.trim().is_empty() || !guardian.occupation.trim().is_empty() =>
        {
            Some("Guardian name is required when a phone or occupation is given".to_string())
        }
        _ => None,
    }
}

fn occupation_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    if value.as_text().trim().chars().count() > 100 {
        Some("Occupation cannot exceed 100 characters".to_string())
    } else {
        None
    }
}

fn primary_contact_phone_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text();
    if text.trim().is_empty() {
        Some("Contact phone is required".to_string())
    } else if !is_valid_phone(text) {
        Some("Phone number must be 10 digits starting with 6-9".to_string())
    } else {
        None
    }
}

fn optional_phone_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let text = value.as_text();
    if text.trim().is_empty() || is_valid_phone(text) {
        None
    } else {
        Some("Phone number must be 10 digits starting with 6-9".to_string())
    }
}

fn transport_vehicle_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let FieldValue::Transport(transport) = value else {
        return None;
    };
    if transport.enabled && transport.vehicle_id.is_none() {
        Some("Select a vehicle".to_string())
    } else {
        None
    }
}

fn transport_stop_rule(value: FieldValue<'_>, _: &RuleContext) -> Option<String> {
    let FieldValue::Transport(transport) = value else {
        return None;
    };
    if !transport.enabled {
        return None;
    }
    match &transport.stop {
        StopChoice::Unselected => Some("Select or enter a stop".to_string()),
        StopChoice::Selected(name) if name.trim().is_empty() => Some("Select or enter a stop".to_string()),
        StopChoice::Selected(_) => None,
        StopChoice::Authored { name, lat, lon } => {
            if name.trim().is_empty() {
                Some("Enter a name for the new stop".to_string())
            } else {
                coordinates_in_range(*lat, *lon).err()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::draft::TransportDraft;
    use chrono::Months;

    fn context() -> RuleContext {
        RuleContext {
            today: NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
            age_bounds: AgeBounds::default(),
        }
    }

    fn check(key: RuleKey, text: &str) -> Option<String> {
        RuleTable::student().evaluate(key, FieldValue::Text(text), &context())
    }

    #[test]
    fn test_document_number_rule() {
        let key = RuleKey::Field(FieldKey::DocumentNumber);
        assert_eq!(check(key, ""), Some("Identity document number is required".to_string()));
        assert_eq!(check(key, "1234-5678"), Some("Identity document number must be 12 digits".to_string()));
        assert_eq!(check(key, "1234-5678-9012"), None);
        assert_eq!(check(key, "1234 5678 9012"), None);
    }

    #[test]
    fn test_name_rules() {
        let given = RuleKey::Field(FieldKey::GivenName);
        let family = RuleKey::Field(FieldKey::FamilyName);

        assert!(check(given, "A").is_some());
        assert!(check(given, "Asha1").is_some());
        assert_eq!(check(given, "Asha Devi"), None);
        assert_eq!(check(family, "R"), None);
        assert!(check(family, "  ").is_some());
    }

    #[test]
    fn test_email_is_optional_but_shaped() {
        let key = RuleKey::Field(FieldKey::Email);
        assert_eq!(check(key, ""), None);
        assert_eq!(check(key, "asha@example.in"), None);
        assert!(check(key, "asha@example").is_some());
        assert!(check(key, "asha example.com").is_some());
        assert!(check(key, "@example.com").is_some());
    }

    #[test]
    fn test_age_boundary() {
        let ctx = context();
        let table = RuleTable::student();
        let key = RuleKey::Field(FieldKey::DateOfBirth);

        let exactly_three = ctx.today.checked_sub_months(Months::new(36)).unwrap();
        let one_day_short = exactly_three.succ_opt().unwrap();
        let three = exactly_three.format("%Y-%m-%d").to_string();
        let short = one_day_short.format("%Y-%m-%d").to_string();

        assert_eq!(table.evaluate(key, FieldValue::Text(&three), &ctx), None);
        assert_eq!(
            table.evaluate(key, FieldValue::Text(&short), &ctx),
            Some("Student must be at least 3 years old".to_string())
        );
    }

    #[test]
    fn test_future_date_of_birth_always_fails() {
        let key = RuleKey::Field(FieldKey::DateOfBirth);
        assert_eq!(check(key, "2026-06-16"), Some("Date of birth cannot be in the future".to_string()));
        assert_eq!(check(key, "2040-01-01"), Some("Date of birth cannot be in the future".to_string()));
    }

    #[test]
    fn test_upper_age_bound() {
        let key = RuleKey::Field(FieldKey::DateOfBirth);
        assert_eq!(check(key, "2003-06-15"), Some("Student must be at most 22 years old".to_string()));
        assert_eq!(check(key, "2003-06-16"), None);
        assert!(check(key, "15/06/2016").is_some());
    }

    #[test]
    fn test_postal_code_and_section() {
        assert_eq!(check(RuleKey::Address(AddressField::PostalCode), "411001"), None);
        assert!(check(RuleKey::Address(AddressField::PostalCode), "41100").is_some());
        assert!(check(RuleKey::Address(AddressField::PostalCode), "41100a").is_some());

        assert_eq!(check(RuleKey::Field(FieldKey::Section), "A"), None);
        assert!(check(RuleKey::Field(FieldKey::Section), "AB").is_some());
        assert!(check(RuleKey::Field(FieldKey::Section), "").is_some());
    }

    #[test]
    fn test_phone_rules() {
        let primary = RuleKey::Field(FieldKey::PrimaryContactPhone);
        let secondary = RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone);

        assert_eq!(check(primary, "7123456789"), None);
        assert!(check(primary, "").is_some());
        assert!(check(primary, "5123456789").is_some());
        assert!(check(primary, "712345678").is_some());

        assert_eq!(check(secondary, ""), None);
        assert!(check(secondary, "12345").is_some());
    }

    #[test]
    fn test_second_guardian_name_required_with_details() {
        let table = RuleTable::student();
        let ctx = context();
        let name = RuleKey::Guardian(GuardianSlot::Second, GuardianField::Name);

        let blank = DraftRecord::default();
        assert_eq!(table.evaluate(name, blank.value_of(name), &ctx), None);

        let phone_only = blank
            .clone()
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Phone), "9876543210");
        assert!(table.evaluate(name, phone_only.value_of(name), &ctx).is_some());

        let occupation_only = blank
            .clone()
            .with_text(RuleKey::Guardian(GuardianSlot::Second, GuardianField::Occupation), "Teacher");
        assert!(table.evaluate(name, occupation_only.value_of(name), &ctx).is_some());

        let named = phone_only.with_text(name, "Meera Rao");
        assert_eq!(table.evaluate(name, named.value_of(name), &ctx), None);

        let errors = table.evaluate_step(Step::ClassAndFamily, &occupation_only, &ctx);
        assert!(errors.contains_key(&name));
    }

    #[test]
    fn test_rule_evaluation_is_idempotent() {
        let table = RuleTable::student();
        let ctx = context();
        for (key, text) in [
            (RuleKey::Field(FieldKey::DocumentNumber), "12-34"),
            (RuleKey::Field(FieldKey::Email), "not-an-email"),
            (RuleKey::Field(FieldKey::DateOfBirth), "2016-01-01"),
        ] {
            let first = table.evaluate(key, FieldValue::Text(text), &ctx);
            let second = table.evaluate(key, FieldValue::Text(text), &ctx);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_transport_rules_only_apply_when_enabled() {
        let table = RuleTable::student();
        let ctx = context();
        let vehicle = RuleKey::Transport(TransportField::Vehicle);
        let stop = RuleKey::Transport(TransportField::Stop);

        let disabled = TransportDraft::default();
        assert_eq!(table.evaluate(vehicle, FieldValue::Transport(&disabled), &ctx), None);
        assert_eq!(table.evaluate(stop, FieldValue::Transport(&disabled), &ctx), None);

        let enabled = TransportDraft { enabled: true, ..Default::default() };
        assert!(table.evaluate(vehicle, FieldValue::Transport(&enabled), &ctx).is_some());
        assert!(table.evaluate(stop, FieldValue::Transport(&enabled), &ctx).is_some());

        let authored = TransportDraft {
            enabled: true,
            vehicle_id: Some("vehicle::1".to_string()),
            route_ref: Some("R1".to_string()),
            stop: StopChoice::Authored { name: "Temple Road".to_string(), lat: Some(18.5), lon: None },
        };
        assert_eq!(table.evaluate(vehicle, FieldValue::Transport(&authored), &ctx), None);
        assert_eq!(
            table.evaluate(stop, FieldValue::Transport(&authored), &ctx),
            Some("Enter both latitude and longitude, or neither".to_string())
        );
    }

    #[test]
    fn test_panicking_rule_fails_open() {
        fn broken(_: FieldValue<'_>, _: &RuleContext) -> Option<String> {
            panic!("rule bug");
        }
        let key = RuleKey::Field(FieldKey::GivenName);
        let table = RuleTable::student().with_rule(key, broken);
        assert_eq!(table.evaluate(key, FieldValue::Text(""), &context()), None);
    }

    #[test]
    fn test_free_text_fields_have_no_rule() {
        let table = RuleTable::student();
        assert!(!table.has_rule(RuleKey::Field(FieldKey::MedicalNotes)));
        assert_eq!(check(RuleKey::Field(FieldKey::Nationality), ""), None);
    }

    #[test]
    fn test_every_step_key_has_a_rule() {
        let table = RuleTable::student();
        for step in [Step::Identity, Step::Personal, Step::ClassAndFamily, Step::Transport] {
            for key in step.keys() {
                assert!(table.has_rule(*key), "missing rule for {}", key);
                assert_eq!(Step::of_key(*key), step);
            }
        }
    }

    #[test]
    fn test_step_navigation_saturates() {
        assert_eq!(Step::Identity.previous(), Step::Identity);
        assert_eq!(Step::Identity.next(), Step::Personal);
        assert_eq!(Step::Transport.next(), Step::Transport);
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(5), None);
    }

    #[test]
    fn test_itinerary_needs_a_named_stop() {
        let unnamed = vec![shared::Stop { name: " ".to_string(), lat: None, lon: None }];
        assert!(validate_itinerary(&[]).is_some());
        assert!(validate_itinerary(&unnamed).is_some());

        let named = vec![shared::Stop { name: "Main Gate".to_string(), lat: Some(18.52), lon: Some(73.85) }];
        assert_eq!(validate_itinerary(&named), None);

        let bad_coordinates = vec![shared::Stop { name: "Far".to_string(), lat: Some(120.0), lon: Some(0.0) }];
        assert!(validate_itinerary(&bad_coordinates).is_some());
    }

    #[test]
    fn test_age_on_counts_birthdays() {
        let dob = NaiveDate::from_ymd_opt(2016, 6, 16).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()), 9);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2026, 6, 16).unwrap()), 10);
    }
}
