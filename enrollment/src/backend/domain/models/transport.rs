use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainVehicle {
    pub id: String,
    pub label: String,
    pub route_ref: String,
}

impl DomainVehicle {
    pub fn generate_id() -> String {
        format!("vehicle::{}", Uuid::new_v4())
    }
}

/// One stop on a route, in itinerary order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStop {
    pub route_ref: String,
    pub position: u32,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}
