//! # Domain Module
//!
//! Enrollment rules and the services built on them.
//!
//! ## Module Organization
//!
//! - **identity**: document number normalization and identifier derivation
//! - **validation**: the rule table and the four wizard steps
//! - **wizard**: the step-by-step enrollment controller
//! - **assembly**: turning a draft into a record profile and back
//! - **enrollment_service**: a wizard wired to a records API
//! - **student_service**, **transport_service**, **media_service**: the records API side
//!
//! Services work against the [`Connection`](crate::backend::storage::Connection)
//! traits and never touch files directly.

pub mod assembly;
pub mod clock;
pub mod commands;
pub mod enrollment_service;
pub mod identity;
pub mod media_service;
pub mod models;
pub mod student_service;
pub mod transport_service;
pub mod validation;
pub mod wizard;

pub use enrollment_service::{EnrollmentError, EnrollmentSession};
pub use media_service::MediaService;
pub use student_service::StudentService;
pub use transport_service::TransportService;
pub use wizard::WizardController;
