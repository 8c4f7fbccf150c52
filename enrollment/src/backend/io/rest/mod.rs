//! # REST API Interface Layer
//!
//! HTTP endpoints of the records API. Handlers translate requests into
//! domain commands, call the services held in [`AppState`](crate::backend::AppState),
//! and translate domain errors into status codes with a JSON
//! [`ErrorResponse`](shared::ErrorResponse) body.

pub mod error;
pub mod mappers;
pub mod student_apis;
pub mod transport_apis;
pub mod upload_apis;
