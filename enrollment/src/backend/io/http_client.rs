//! Records API client over HTTP.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use shared::{
    CreateStudentRequest, CreateStudentResponse, ErrorKind, ErrorResponse, IdentifierListResponse, Stop,
    StopListResponse, StudentRecord, UpdateStudentRequest, UploadImageResponse, Vehicle, VehicleListResponse,
};
use tracing::{debug, warn};

use crate::backend::io::records_api::{ApiError, RecordsApi};
use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApiClient {
    /// Creates a client for the records API served at `base_url`
    /// (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Internal(format!("invalid records API URL '{}': {}", base_url, e)))?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    /// Client for the records API named by `api_url` (`SCHOOL_API_URL`)
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        debug!("Records API client targets {}", config.api_url);
        Self::new(&config.api_url)
    }

    /// URL for the given path segments, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Internal(format!("records API URL {} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Parse a success body, or turn an error body into an [`ApiError`]
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await?;
        let body = serde_json::from_str::<ErrorResponse>(&text)
            .unwrap_or_else(|_| ErrorResponse::new(ErrorKind::Internal, text));
        warn!("Records API responded {}: {}", status, body.error);
        Err(ApiError::from_error_response(status.as_u16(), body))
    }
}

#[async_trait]
impl RecordsApi for HttpApiClient {
    async fn fetch_existing_identifiers(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["api", "students", "identifiers"])?;
        debug!("Fetching identifiers from {}", url);
        let response = self.client.get(url).send().await?;
        Ok(Self::handle_response::<IdentifierListResponse>(response).await?.identifiers)
    }

    async fn fetch_vehicle_catalog(&self) -> Result<Vec<Vehicle>, ApiError> {
        let url = self.endpoint(&["api", "transport", "vehicles"])?;
        debug!("Fetching vehicle catalog from {}", url);
        let response = self.client.get(url).send().await?;
        Ok(Self::handle_response::<VehicleListResponse>(response).await?.vehicles)
    }

    async fn fetch_stops(&self, route_ref: &str) -> Result<Vec<Stop>, ApiError> {
        let url = self.endpoint(&["api", "transport", "routes", route_ref, "stops"])?;
        debug!("Fetching stops from {}", url);
        let response = self.client.get(url).send().await?;
        Ok(Self::handle_response::<StopListResponse>(response).await?.stops)
    }

    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<UploadImageResponse, ApiError> {
        let url = self.endpoint(&["api", "uploads"])?;
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|_| ApiError::Internal(format!("invalid content type '{}'", content_type)))?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn create_record(&self, request: CreateStudentRequest) -> Result<CreateStudentResponse, ApiError> {
        let url = self.endpoint(&["api", "students"])?;
        let response = self.client.post(url).json(&request).send().await?;
        Self::handle_response(response).await
    }

    async fn update_record(&self, id: &str, request: UpdateStudentRequest) -> Result<StudentRecord, ApiError> {
        let url = self.endpoint(&["api", "students", id])?;
        let response = self.client.put(url).json(&request).send().await?;
        Self::handle_response(response).await
    }
}
