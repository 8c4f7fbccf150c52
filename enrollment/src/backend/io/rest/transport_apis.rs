//! # REST API for Transport
//!
//! The vehicle catalog and the stop itineraries of routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::{error, info};

use crate::backend::io::rest::error::RestError;
use crate::backend::io::rest::mappers::transport_mapper::TransportMapper;
use crate::backend::AppState;
use shared::{RegisterRouteRequest, RegisterVehicleRequest};

/// List the vehicle catalog
pub async fn list_vehicles(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/transport/vehicles");

    match state.transport_service.list_vehicles().await {
        Ok(vehicles) => (StatusCode::OK, Json(TransportMapper::to_vehicle_list_dto(vehicles))).into_response(),
        Err(e) => RestError::internal("Error listing vehicles", &e).into_response(),
    }
}

/// Register a vehicle serving a route
pub async fn register_vehicle(
    State(state): State<AppState>,
    Json(request): Json<RegisterVehicleRequest>,
) -> impl IntoResponse {
    info!("POST /api/transport/vehicles - request: {:?}", request);

    let command = TransportMapper::to_register_vehicle_command(request);
    match state.transport_service.register_vehicle(command).await {
        Ok(vehicle) => (StatusCode::CREATED, Json(TransportMapper::to_vehicle_dto(vehicle))).into_response(),
        Err(e) => {
            error!("Failed to register vehicle: {}", e);
            RestError::from(e).into_response()
        }
    }
}

/// List the stops of a route in itinerary order
pub async fn list_stops(State(state): State<AppState>, Path(route_ref): Path<String>) -> impl IntoResponse {
    info!("GET /api/transport/routes/{}/stops", route_ref);

    match state.transport_service.list_stops(&route_ref).await {
        Ok(stops) => (StatusCode::OK, Json(TransportMapper::to_stop_list_dto(&route_ref, stops))).into_response(),
        Err(e) => RestError::internal("Error listing stops", &e).into_response(),
    }
}

/// Register (or replace) a route itinerary
pub async fn register_route(
    State(state): State<AppState>,
    Json(request): Json<RegisterRouteRequest>,
) -> impl IntoResponse {
    info!("POST /api/transport/routes - route {} with {} stop(s)", request.route_ref, request.stops.len());

    let route_ref = request.route_ref.trim().to_string();
    let command = TransportMapper::to_register_route_command(request);
    match state.transport_service.register_route(command).await {
        Ok(stops) => (StatusCode::CREATED, Json(TransportMapper::to_stop_list_dto(&route_ref, stops))).into_response(),
        Err(e) => {
            error!("Failed to register route: {}", e);
            RestError::from(e).into_response()
        }
    }
}
