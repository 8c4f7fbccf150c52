//! Vehicle catalog and route itineraries.

use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::commands::transport::{RegisterRouteCommand, RegisterVehicleCommand};
use crate::backend::domain::models::transport::{DomainStop, DomainVehicle};
use crate::backend::domain::validation::validate_itinerary;
use crate::backend::storage::{Connection, TransportStorage};

#[derive(Debug, thiserror::Error)]
pub enum TransportServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TransportService<C: Connection> {
    transport_repository: C::TransportRepository,
}

impl<C: Connection> TransportService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            transport_repository: connection.create_transport_repository(),
        }
    }

    pub async fn list_vehicles(&self) -> anyhow::Result<Vec<DomainVehicle>> {
        let vehicles = self.transport_repository.list_vehicles().await?;
        info!("Found {} vehicles", vehicles.len());
        Ok(vehicles)
    }

    pub async fn find_vehicle(&self, vehicle_id: &str) -> anyhow::Result<Option<DomainVehicle>> {
        Ok(self
            .transport_repository
            .list_vehicles()
            .await?
            .into_iter()
            .find(|vehicle| vehicle.id == vehicle_id))
    }

    pub async fn register_vehicle(
        &self,
        command: RegisterVehicleCommand,
    ) -> Result<DomainVehicle, TransportServiceError> {
        info!("Registering vehicle: label={}, route={}", command.label, command.route_ref);

        let label = command.label.trim();
        let route_ref = command.route_ref.trim();
        if label.is_empty() {
            return Err(TransportServiceError::Invalid("Vehicle label is required".to_string()));
        }
        if route_ref.is_empty() {
            return Err(TransportServiceError::Invalid("Route reference is required".to_string()));
        }

        let vehicle = DomainVehicle {
            id: DomainVehicle::generate_id(),
            label: label.to_string(),
            route_ref: route_ref.to_string(),
        };
        self.transport_repository.store_vehicle(&vehicle).await?;

        info!("Registered vehicle {} with ID: {}", vehicle.label, vehicle.id);
        Ok(vehicle)
    }

    pub async fn list_stops(&self, route_ref: &str) -> anyhow::Result<Vec<DomainStop>> {
        let stops = self.transport_repository.list_stops(route_ref).await?;
        if stops.is_empty() {
            warn!("Route {} has no stops", route_ref);
        }
        Ok(stops)
    }

    /// Replace a route's itinerary. Stops without a name are dropped.
    pub async fn register_route(
        &self,
        command: RegisterRouteCommand,
    ) -> Result<Vec<DomainStop>, TransportServiceError> {
        let route_ref = command.route_ref.trim().to_string();
        info!("Registering route {} with {} stop(s)", route_ref, command.stops.len());

        if route_ref.is_empty() {
            return Err(TransportServiceError::Invalid("Route reference is required".to_string()));
        }
        if let Some(message) = validate_itinerary(&command.stops) {
            return Err(TransportServiceError::Invalid(message));
        }

        let stops: Vec<DomainStop> = command
            .stops
            .iter()
            .filter(|stop| !stop.name.trim().is_empty())
            .zip(1u32..)
            .map(|(stop, position)| DomainStop {
                route_ref: route_ref.clone(),
                position,
                name: stop.name.trim().to_string(),
                lat: stop.lat,
                lon: stop.lon,
            })
            .collect();

        self.transport_repository.replace_stops(&route_ref, &stops).await?;
        Ok(stops)
    }

    /// Add a stop typed in during enrollment to the end of its route
    pub async fn record_authored_stop(&self, route_ref: &str, stop: &shared::Stop) -> anyhow::Result<bool> {
        let added = self
            .transport_repository
            .append_stop(&DomainStop {
                route_ref: route_ref.to_string(),
                position: 0,
                name: stop.name.trim().to_string(),
                lat: stop.lat,
                lon: stop.lon,
            })
            .await?;
        if added {
            info!("Stop '{}' added to route {}", stop.name, route_ref);
        }
        Ok(added)
    }
}
