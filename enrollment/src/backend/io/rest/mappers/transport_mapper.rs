use shared::{RegisterRouteRequest, RegisterVehicleRequest, Stop, StopListResponse, Vehicle, VehicleListResponse};

use crate::backend::domain::commands::transport::{RegisterRouteCommand, RegisterVehicleCommand};
use crate::backend::domain::models::transport::{DomainStop, DomainVehicle};

/// Mapper between the transport DTOs and domain vehicles and stops.
pub struct TransportMapper;

impl TransportMapper {
    pub fn to_vehicle_dto(domain: DomainVehicle) -> Vehicle {
        Vehicle {
            id: domain.id,
            label: domain.label,
            route_ref: domain.route_ref,
        }
    }

    pub fn to_vehicle_list_dto(vehicles: Vec<DomainVehicle>) -> VehicleListResponse {
        VehicleListResponse {
            vehicles: vehicles.into_iter().map(Self::to_vehicle_dto).collect(),
        }
    }

    pub fn to_stop_dto(domain: DomainStop) -> Stop {
        Stop {
            name: domain.name,
            lat: domain.lat,
            lon: domain.lon,
        }
    }

    /// Stops in itinerary order
    pub fn to_stop_list_dto(route_ref: &str, mut stops: Vec<DomainStop>) -> StopListResponse {
        stops.sort_by_key(|stop| stop.position);
        StopListResponse {
            route_ref: route_ref.to_string(),
            stops: stops.into_iter().map(Self::to_stop_dto).collect(),
        }
    }

    pub fn to_register_vehicle_command(request: RegisterVehicleRequest) -> RegisterVehicleCommand {
        RegisterVehicleCommand {
            label: request.label,
            route_ref: request.route_ref,
        }
    }

    pub fn to_register_route_command(request: RegisterRouteRequest) -> RegisterRouteCommand {
        RegisterRouteCommand {
            route_ref: request.route_ref,
            stops: request.stops,
        }
    }
}
