//! An enrollment session: the wizard plus the records API it needs.
//!
//! The session owns one [`WizardController`] and performs the awaited calls
//! around it. Reference fetches are non-fatal: a failure is logged, the
//! affected list stays empty, and a notice is kept for the operator. Submit
//! failures are returned and leave the draft as it was.

use shared::{Stop, StudentRecord};
use tracing::{info, warn};

use crate::backend::domain::media_service::{check_image_upload, UploadRejection, DEFAULT_UPLOAD_LIMIT};
use crate::backend::domain::wizard::{ReferenceSnapshot, SubmitRejection, Submission, WizardController};
use crate::backend::io::records_api::{ApiError, RecordsApi};

#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error(transparent)]
    Rejected(#[from] SubmitRejection),
    #[error(transparent)]
    Upload(#[from] UploadRejection),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl EnrollmentError {
    /// Duplicate identifiers are worth resubmitting after an edit
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnrollmentError::Api(error) if error.is_conflict())
    }
}

pub struct EnrollmentSession<A: RecordsApi> {
    api: A,
    wizard: WizardController,
    stops: Vec<Stop>,
    notices: Vec<String>,
    upload_limit: usize,
}

impl<A: RecordsApi> EnrollmentSession<A> {
    pub fn new(api: A, wizard: WizardController) -> Self {
        Self {
            api,
            wizard,
            stops: Vec::new(),
            notices: Vec::new(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }

    pub fn with_upload_limit(mut self, upload_limit: usize) -> Self {
        self.upload_limit = upload_limit;
        self
    }

    pub fn wizard(&self) -> &WizardController {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut WizardController {
        &mut self.wizard
    }

    /// Stops of the selected vehicle's route
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Non-fatal problems since the last call, oldest first
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn notice(&mut self, message: String) {
        warn!("{}", message);
        self.notices.push(message);
    }

    /// Fetch the identifier list and vehicle catalog into the wizard
    pub async fn refresh_reference_data(&mut self) {
        let identifiers = match self.api.fetch_existing_identifiers().await {
            Ok(identifiers) => identifiers,
            Err(e) => {
                self.notice(format!("Could not load existing identifiers: {}", e));
                Vec::new()
            }
        };
        let vehicles = match self.api.fetch_vehicle_catalog().await {
            Ok(vehicles) => vehicles,
            Err(e) => {
                self.notice(format!("Could not load the vehicle catalog: {}", e));
                Vec::new()
            }
        };

        self.wizard.refresh_reference(ReferenceSnapshot { identifiers, vehicles });
    }

    /// Select a vehicle and load the stops of its route
    pub async fn select_vehicle(&mut self, vehicle_id: &str) {
        self.wizard.select_vehicle(vehicle_id);
        self.load_stops().await;
    }

    pub async fn load_stops(&mut self) {
        self.stops.clear();
        let Some(route_ref) = self.wizard.draft().transport.route_ref.clone() else {
            return;
        };
        match self.api.fetch_stops(&route_ref).await {
            Ok(stops) => self.stops = stops,
            Err(e) => self.notice(format!("Could not load stops for route {}: {}", route_ref, e)),
        }
    }

    /// Upload a photo and attach its URL to the draft.
    ///
    /// The photo stays unset on any failure; enrollment can continue without it.
    pub async fn attach_photo(&mut self, bytes: Vec<u8>, content_type: &str) -> Result<String, EnrollmentError> {
        check_image_upload(content_type, bytes.len(), self.upload_limit)?;

        match self.api.upload_image(bytes, content_type).await {
            Ok(response) => {
                info!("Photo uploaded: {}", response.url);
                self.wizard.set_photo_url(Some(response.url.clone()));
                Ok(response.url)
            }
            Err(e) => {
                self.notice(format!("Photo upload failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Validate, assemble and send the record.
    ///
    /// A server conflict message is returned unchanged. On any failure the
    /// wizard stays on the last step with the draft intact.
    pub async fn submit(&mut self) -> Result<StudentRecord, EnrollmentError> {
        let submission = self.wizard.begin_submit()?;

        let outcome = match submission {
            Submission::Create(request) => self.api.create_record(request).await.map(|response| response.student),
            Submission::Update { record_id, request } => self.api.update_record(&record_id, request).await,
        };

        match outcome {
            Ok(record) => {
                self.wizard.finish_submit(Some(&record));
                Ok(record)
            }
            Err(e) => {
                warn!("Submit failed: {}", e);
                self.wizard.finish_submit(None);
                Err(e.into())
            }
        }
    }
}
