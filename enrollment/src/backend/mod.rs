//! # Backend Module
//!
//! Everything behind the enrollment screens: the wizard core, the records
//! services, their file-backed storage, and the interfaces that expose them.
//!
//! ## Architecture
//!
//! ```text
//! Enrollment session (wizard + RecordsApi)
//!     ↓
//! IO Layer (REST API, HTTP client, in-process API)
//!     ↓
//! Domain Layer (validation, identifiers, services)
//!     ↓
//! Storage Layer (YAML records, CSV catalogs, uploads)
//! ```

pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::backend::domain::{MediaService, StudentService, TransportService};
use crate::backend::io::rest::{student_apis, transport_apis, upload_apis};
use crate::backend::storage::csv::CsvConnection;
use crate::config::AppConfig;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub student_service: StudentService<CsvConnection>,
    pub transport_service: TransportService<CsvConnection>,
    pub media_service: MediaService<CsvConnection>,
}

impl AppState {
    pub fn new(connection: Arc<CsvConnection>, config: &AppConfig) -> Self {
        let transport_service = TransportService::new(connection.clone());
        let student_service = StudentService::new(connection.clone(), transport_service.clone(), config.age_bounds);
        let media_service = MediaService::new(connection, config.upload_limit);

        Self {
            student_service,
            transport_service,
            media_service,
        }
    }
}

/// Initialize the backend with all required services
pub fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up records store at {}", config.data_dir.display());
    let connection = CsvConnection::new(&config.data_dir)
        .with_context(|| format!("Failed to open records store at {}", config.data_dir.display()))?;

    info!("Setting up application state");
    Ok(AppState::new(Arc::new(connection), config))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);
    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("Ignoring invalid CORS origin '{}'", config.cors_origin);
            cors
        }
    };

    // Leave headroom so oversized photos reach the upload check and get a JSON rejection
    let body_limit = app_state.media_service.upload_limit().saturating_add(64 * 1024);

    let api_routes = Router::new()
        .route("/students", get(student_apis::list_students).post(student_apis::create_student))
        .route("/students/identifiers", get(student_apis::list_identifiers))
        .route("/students/:id", get(student_apis::get_student).put(student_apis::update_student))
        .route(
            "/transport/vehicles",
            get(transport_apis::list_vehicles).post(transport_apis::register_vehicle),
        )
        .route("/transport/routes", post(transport_apis::register_route))
        .route("/transport/routes/:route_ref/stops", get(transport_apis::list_stops))
        .route("/uploads", post(upload_apis::upload_image));

    Router::new()
        .nest("/api", api_routes)
        .route("/uploads/:file_name", get(upload_apis::get_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app_state)
}
