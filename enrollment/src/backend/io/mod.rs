//! # IO Module
//!
//! Interfaces around the domain: the axum records API ([`rest`]), the
//! [`RecordsApi`](records_api::RecordsApi) contract an enrollment session
//! talks to, and its two implementations ([`http_client`] over HTTP,
//! [`in_process`] straight into the services).

pub mod http_client;
pub mod in_process;
pub mod records_api;
pub mod rest;

pub use http_client::HttpApiClient;
pub use records_api::{ApiError, RecordsApi};
