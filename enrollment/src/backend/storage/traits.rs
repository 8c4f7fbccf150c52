//! # Storage Traits
//!
//! Storage abstractions used by the domain services. The CSV/YAML file
//! backend in [`super::csv`] is the only implementation today.

use anyhow::Result;
use async_trait::async_trait;

use crate::backend::domain::models::student::DomainStudent;
use crate::backend::domain::models::transport::{DomainStop, DomainVehicle};

/// Persistence for student records
#[async_trait]
pub trait StudentStorage: Send + Sync {
    /// Store a new student unless its identifier is already taken.
    ///
    /// The uniqueness check and the write happen under one lock. Returns
    /// `false` (and writes nothing) on a duplicate identifier.
    async fn insert_student(&self, student: &DomainStudent) -> Result<bool>;

    /// Retrieve a student by storage id
    async fn get_student(&self, id: &str) -> Result<Option<DomainStudent>>;

    /// List all students ordered by identifier
    async fn list_students(&self) -> Result<Vec<DomainStudent>>;

    /// Overwrite an existing student
    async fn update_student(&self, student: &DomainStudent) -> Result<()>;

    /// Every identifier assigned so far
    async fn list_identifiers(&self) -> Result<Vec<String>>;
}

/// Persistence for the vehicle catalog and route itineraries
#[async_trait]
pub trait TransportStorage: Send + Sync {
    async fn list_vehicles(&self) -> Result<Vec<DomainVehicle>>;

    async fn store_vehicle(&self, vehicle: &DomainVehicle) -> Result<()>;

    /// Stops of a route in itinerary order
    async fn list_stops(&self, route_ref: &str) -> Result<Vec<DomainStop>>;

    /// Replace a route's itinerary
    async fn replace_stops(&self, route_ref: &str, stops: &[DomainStop]) -> Result<()>;

    /// Append a stop to the end of a route unless a stop with that name exists.
    /// Returns `true` when the stop was added.
    async fn append_stop(&self, stop: &DomainStop) -> Result<bool>;
}

/// Persistence for uploaded images
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn store_image(&self, file_name: &str, bytes: &[u8]) -> Result<()>;

    async fn load_image(&self, file_name: &str) -> Result<Option<Vec<u8>>>;
}

/// Abstraction over a storage backend that hands out its repositories
pub trait Connection: Send + Sync + Clone {
    type StudentRepository: StudentStorage + Clone;
    type TransportRepository: TransportStorage + Clone;
    type MediaRepository: MediaStorage + Clone;

    fn create_student_repository(&self) -> Self::StudentRepository;
    fn create_transport_repository(&self) -> Self::TransportRepository;
    fn create_media_repository(&self) -> Self::MediaRepository;
}
