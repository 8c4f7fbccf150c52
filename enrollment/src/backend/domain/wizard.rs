//! The stepped enrollment wizard.
//!
//! [`WizardController`] owns the draft for one enrollment session and moves
//! it through the four steps. Forward navigation is gated on the current
//! step's rules, backward navigation is free, and submission re-validates
//! every required step before assembling the outgoing request.
//!
//! Reference data (existing identifiers, the vehicle catalog) is an injected
//! [`ReferenceSnapshot`]; the controller never fetches anything itself.

use chrono::Datelike;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::{CreateStudentRequest, StudentRecord, UpdateStudentRequest, Vehicle};

use crate::backend::domain::assembly::{assemble_profile, draft_from_profile};
use crate::backend::domain::clock::{Clock, SystemClock};
use crate::backend::domain::identity::generate_identifier_for_year;
use crate::backend::domain::models::draft::{DraftRecord, FieldKey, RuleKey, StopChoice, TransportField};
use crate::backend::domain::validation::{AgeBounds, ErrorMap, RuleContext, RuleTable, Step};

/// How many messages the error banner lists before collapsing the rest
pub const SUMMARY_LIMIT: usize = 3;

/// Read-only reference lists the wizard works against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSnapshot {
    pub identifiers: Vec<String>,
    pub vehicles: Vec<Vehicle>,
}

impl ReferenceSnapshot {
    pub fn route_for(&self, vehicle_id: &str) -> Option<String> {
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.id == vehicle_id)
            .map(|vehicle| vehicle.route_ref.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardMode {
    /// A new record; the identifier is derived from the document number
    Create,
    /// An existing record; the identifier is frozen
    Edit { record_id: String },
}

/// The request a successful submit hands to the records API
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create(CreateStudentRequest),
    Update {
        record_id: String,
        request: UpdateStudentRequest,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("Submit is only available from the last step (currently on {})", .step.label())]
    NotOnLastStep { step: Step },
    #[error("{count} field(s) need attention, starting on the {} step", .step.label())]
    Invalid { step: Step, count: usize },
    #[error("A submission is already in progress")]
    Busy,
}

/// Banner content: the first few messages in step order plus how many were left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSummary {
    pub messages: Vec<String>,
    pub overflow: usize,
}

impl ErrorSummary {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub struct WizardController {
    mode: WizardMode,
    step: Step,
    draft: DraftRecord,
    errors: ErrorMap,
    touched: BTreeSet<RuleKey>,
    busy: bool,
    reference: ReferenceSnapshot,
    rules: RuleTable,
    clock: Arc<dyn Clock>,
    age_bounds: AgeBounds,
}

impl WizardController {
    pub fn new(reference: ReferenceSnapshot) -> Self {
        Self {
            mode: WizardMode::Create,
            step: Step::FIRST,
            draft: DraftRecord::default(),
            errors: ErrorMap::new(),
            touched: BTreeSet::new(),
            busy: false,
            reference,
            rules: RuleTable::student(),
            clock: Arc::new(SystemClock),
            age_bounds: AgeBounds::default(),
        }
    }

    /// Open a persisted record for editing
    pub fn for_existing(record: &StudentRecord, reference: ReferenceSnapshot) -> Self {
        info!("Opening student {} ({}) for editing", record.student_id, record.id);
        Self {
            mode: WizardMode::Edit { record_id: record.id.clone() },
            draft: draft_from_profile(&record.profile, &record.student_id),
            ..Self::new(reference)
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.sync_identifier();
        self
    }

    pub fn with_age_bounds(mut self, age_bounds: AgeBounds) -> Self {
        self.age_bounds = age_bounds;
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &DraftRecord {
        &self.draft
    }

    pub fn identifier(&self) -> &str {
        &self.draft.identifier
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_touched(&self, key: RuleKey) -> bool {
        self.touched.contains(&key)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn mode(&self) -> &WizardMode {
        &self.mode
    }

    pub fn reference(&self) -> &ReferenceSnapshot {
        &self.reference
    }

    fn context(&self) -> RuleContext {
        RuleContext {
            today: self.clock.today(),
            age_bounds: self.age_bounds,
        }
    }

    /// Replace a field value. Editing the document number re-derives the identifier.
    pub fn edit(&mut self, key: RuleKey, value: impl Into<String>) {
        if key == RuleKey::Transport(TransportField::Vehicle) {
            self.select_vehicle(&value.into());
            return;
        }

        self.draft = self.draft.with_text(key, value);
        if key == RuleKey::Field(FieldKey::DocumentNumber) {
            self.sync_identifier();
        }
    }

    pub fn set_transport_enabled(&mut self, enabled: bool) {
        self.draft = self.draft.with_transport_enabled(enabled);
    }

    /// Pick a vehicle from the catalog; its route comes from the snapshot
    pub fn select_vehicle(&mut self, vehicle_id: &str) {
        let route_ref = self.reference.route_for(vehicle_id);
        if route_ref.is_none() && !vehicle_id.trim().is_empty() {
            warn!("Vehicle {} is not in the current catalog", vehicle_id);
        }
        self.draft = self.draft.with_vehicle(vehicle_id, route_ref);
    }

    pub fn select_stop(&mut self, name: &str) {
        self.draft = self.draft.with_text(RuleKey::Transport(TransportField::Stop), name);
    }

    /// Enter a stop that is not on the route yet
    pub fn author_stop(&mut self, name: &str, lat: Option<f64>, lon: Option<f64>) {
        self.draft = self.draft.with_stop(StopChoice::Authored {
            name: name.to_string(),
            lat,
            lon,
        });
    }

    pub fn set_photo_url(&mut self, photo_url: Option<String>) {
        self.draft = self.draft.with_photo_url(photo_url);
    }

    /// Swap in freshly fetched reference lists
    pub fn refresh_reference(&mut self, reference: ReferenceSnapshot) {
        debug!(
            "Reference data refreshed: {} identifiers, {} vehicles",
            reference.identifiers.len(),
            reference.vehicles.len()
        );
        self.reference = reference;
        self.sync_identifier();
    }

    fn sync_identifier(&mut self) {
        if self.mode != WizardMode::Create {
            return;
        }
        let identifier = generate_identifier_for_year(
            self.clock.today().year(),
            &self.draft.document_number,
            &self.reference.identifiers,
        );
        if identifier != self.draft.identifier {
            debug!("Derived identifier changed to {}", identifier);
            self.draft = self.draft.with_identifier(identifier);
        }
    }

    /// Validate the current step and move forward if it passes
    pub fn advance(&mut self) -> Step {
        let errors = self.rules.evaluate_step(self.step, &self.draft, &self.context());
        if errors.is_empty() {
            self.touched.extend(self.step.keys().iter().copied());
            self.errors.clear();
            self.step = self.step.next();
        } else {
            debug!("{} error(s) on the {} step", errors.len(), self.step.label());
            self.touched.extend(errors.keys().copied());
            self.errors = errors;
        }
        self.step
    }

    pub fn retreat(&mut self) -> Step {
        self.step = self.step.previous();
        self.errors.clear();
        self.step
    }

    /// Re-check a single field once the user leaves it
    pub fn blur(&mut self, key: RuleKey) {
        self.touched.insert(key);
        match self.rules.evaluate(key, self.draft.value_of(key), &self.context()) {
            Some(message) => {
                self.errors.insert(key, message);
            }
            None => {
                self.errors.remove(&key);
            }
        }
    }

    /// Validate every step and assemble the outgoing request.
    ///
    /// Failures in the first three steps send the wizard back to step one;
    /// transport failures keep it on the transport step.
    pub fn submit(&mut self) -> Result<Submission, SubmitRejection> {
        if self.busy {
            return Err(SubmitRejection::Busy);
        }
        if self.step != Step::LAST {
            return Err(SubmitRejection::NotOnLastStep { step: self.step });
        }

        let context = self.context();
        let mut failures = ErrorMap::new();
        for step in Step::REQUIRED {
            failures.extend(self.rules.evaluate_step(step, &self.draft, &context));
        }
        if !failures.is_empty() {
            return Err(self.reject(failures, Step::FIRST));
        }

        if self.draft.transport.enabled {
            let failures = self.rules.evaluate_step(Step::Transport, &self.draft, &context);
            if !failures.is_empty() {
                return Err(self.reject(failures, Step::Transport));
            }
        }

        let profile = assemble_profile(&self.draft);
        let submission = match &self.mode {
            WizardMode::Create => {
                let student_id = if self.draft.has_pending_identifier() {
                    None
                } else {
                    Some(self.draft.identifier.clone())
                };
                Submission::Create(CreateStudentRequest { student_id, profile })
            }
            WizardMode::Edit { record_id } => Submission::Update {
                record_id: record_id.clone(),
                request: UpdateStudentRequest { profile },
            },
        };

        info!("Submission ready for {}", self.draft.identifier);
        Ok(submission)
    }

    fn reject(&mut self, failures: ErrorMap, step: Step) -> SubmitRejection {
        let count = failures.len();
        warn!("Submit blocked by {} invalid field(s)", count);
        self.touched.extend(failures.keys().copied());
        self.errors.extend(failures);
        self.step = step;
        SubmitRejection::Invalid { step, count }
    }

    /// Submit and raise the busy flag until [`finish_submit`](Self::finish_submit)
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitRejection> {
        let submission = self.submit()?;
        self.busy = true;
        Ok(submission)
    }

    /// Record the outcome of the outstanding submission.
    ///
    /// `Some(record)` switches the wizard to editing the saved record. `None`
    /// leaves the draft as it was, on the last step.
    pub fn finish_submit(&mut self, saved: Option<&StudentRecord>) {
        self.busy = false;
        match saved {
            Some(record) => {
                info!("Student {} saved as {}", record.student_id, record.id);
                if !self.reference.identifiers.contains(&record.student_id) {
                    self.reference.identifiers.push(record.student_id.clone());
                }
                self.draft = self.draft.with_identifier(record.student_id.clone());
                self.mode = WizardMode::Edit { record_id: record.id.clone() };
            }
            None => {
                self.step = Step::LAST;
            }
        }
    }

    pub fn error_summary(&self) -> ErrorSummary {
        let messages: Vec<&String> = [Step::Identity, Step::Personal, Step::ClassAndFamily, Step::Transport]
            .into_iter()
            .flat_map(|step| step.keys().iter())
            .filter_map(|key| self.errors.get(key))
            .collect();

        ErrorSummary {
            messages: messages.iter().take(SUMMARY_LIMIT).map(|m| m.to_string()).collect(),
            overflow: messages.len().saturating_sub(SUMMARY_LIMIT),
        }
    }

    /// The error to show next to a field; hidden until the field is touched
    pub fn visible_error(&self, key: RuleKey) -> Option<&str> {
        if self.touched.contains(&key) {
            self.errors.get(&key).map(String::as_str)
        } else {
            None
        }
    }
}
