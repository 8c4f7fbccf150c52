//! # Transport Repository
//!
//! The vehicle catalog lives in `transport/vehicles.csv` and every route's
//! itinerary in `transport/stops.csv`, one row per stop:
//!
//! ```text
//! route_ref,position,name,lat,lon
//! R1,1,Main Gate,18.52,73.85
//! R1,2,Clock Tower,,
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::{Reader, Writer};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::connection::CsvConnection;
use crate::backend::domain::models::transport::{DomainStop, DomainVehicle};
use crate::backend::storage::traits::TransportStorage;

#[derive(Clone)]
pub struct TransportRepository {
    connection: CsvConnection,
}

impl TransportRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn get_vehicles_file_path(&self) -> PathBuf {
        self.connection.transport_directory().join("vehicles.csv")
    }

    fn get_stops_file_path(&self) -> PathBuf {
        self.connection.transport_directory().join("stops.csv")
    }

    fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            debug!("{} doesn't exist yet, returning empty list", path.display());
            return Ok(Vec::new());
        }

        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut reader = Reader::from_reader(file);
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row.with_context(|| format!("Malformed row in {}", path.display()))?);
        }
        Ok(rows)
    }

    fn write_rows<T: serde::Serialize>(&self, path: &Path, rows: &[T]) -> Result<()> {
        let mut writer = Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer.into_inner().context("Failed to flush CSV buffer")?;
        self.connection.write_atomically(path, &bytes)
    }

    fn store_vehicle_locked(&self, vehicle: &DomainVehicle) -> Result<()> {
        let _guard = self.connection.lock_writes()?;
        let path = self.get_vehicles_file_path();
        let mut vehicles: Vec<DomainVehicle> = Self::read_rows(&path)?;
        vehicles.retain(|existing| existing.id != vehicle.id);
        vehicles.push(vehicle.clone());
        self.write_rows(&path, &vehicles)?;
        info!("Stored vehicle {} ({}) on route {}", vehicle.label, vehicle.id, vehicle.route_ref);
        Ok(())
    }

    fn replace_stops_locked(&self, route_ref: &str, stops: &[DomainStop]) -> Result<()> {
        let _guard = self.connection.lock_writes()?;
        let path = self.get_stops_file_path();
        let mut all_stops: Vec<DomainStop> = Self::read_rows(&path)?;
        all_stops.retain(|stop| stop.route_ref != route_ref);
        all_stops.extend(stops.iter().cloned());
        self.write_rows(&path, &all_stops)?;
        info!("Route {} now has {} stop(s)", route_ref, stops.len());
        Ok(())
    }

    fn append_stop_locked(&self, stop: &DomainStop) -> Result<bool> {
        let _guard = self.connection.lock_writes()?;
        let path = self.get_stops_file_path();
        let mut all_stops: Vec<DomainStop> = Self::read_rows(&path)?;

        let on_route = all_stops.iter().filter(|existing| existing.route_ref == stop.route_ref);
        let mut last_position = 0;
        for existing in on_route {
            if existing.name.eq_ignore_ascii_case(stop.name.trim()) {
                return Ok(false);
            }
            last_position = last_position.max(existing.position);
        }

        all_stops.push(DomainStop {
            position: last_position + 1,
            ..stop.clone()
        });
        self.write_rows(&path, &all_stops)?;
        info!("Added stop '{}' to route {}", stop.name, stop.route_ref);
        Ok(true)
    }
}

#[async_trait]
impl TransportStorage for TransportRepository {
    async fn list_vehicles(&self) -> Result<Vec<DomainVehicle>> {
        let mut vehicles: Vec<DomainVehicle> = Self::read_rows(&self.get_vehicles_file_path())?;
        vehicles.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(vehicles)
    }

    async fn store_vehicle(&self, vehicle: &DomainVehicle) -> Result<()> {
        self.store_vehicle_locked(vehicle)
    }

    async fn list_stops(&self, route_ref: &str) -> Result<Vec<DomainStop>> {
        let mut stops: Vec<DomainStop> = Self::read_rows::<DomainStop>(&self.get_stops_file_path())?
            .into_iter()
            .filter(|stop| stop.route_ref == route_ref)
            .collect();
        stops.sort_by_key(|stop| stop.position);
        Ok(stops)
    }

    async fn replace_stops(&self, route_ref: &str, stops: &[DomainStop]) -> Result<()> {
        self.replace_stops_locked(route_ref, stops)
    }

    async fn append_stop(&self, stop: &DomainStop) -> Result<bool> {
        self.append_stop_locked(stop)
    }
}
