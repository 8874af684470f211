use serde::Serialize;
use tracing::debug;

use crate::gtfs_rt::FeedMessage;
use crate::parser::EntityPayload;
use crate::time::epoch_to_iso;

pub const VEHICLE_POSITIONS_SOURCE: &str = "511_vehicle_positions_rg";

/// Snapshot of one vehicle as reported by one feed entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRow {
    pub ingested_at: String,
    pub feed_timestamp: Option<String>,
    pub source: &'static str,
    pub entity_id: String,
    pub vehicle_id: Option<String>,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub position_lat: Option<f32>,
    pub position_lon: Option<f32>,
    pub bearing: Option<f32>,
    pub speed: Option<f32>,
    pub current_status: String,
    pub current_stop_sequence: Option<u32>,
    pub stop_id: Option<String>,
    pub timestamp: Option<String>,
}

/// Emits exactly one row per vehicle-bearing entity, in feed order.
#[tracing::instrument(skip_all, fields(entities = feed.entity.len()))]
pub fn project_vehicle_positions(feed: &FeedMessage, ingested_at: &str) -> Vec<VehicleRow> {
    let feed_timestamp = epoch_to_iso(feed.header.timestamp);

    let rows: Vec<VehicleRow> = feed
        .entity
        .iter()
        .filter_map(|entity| match EntityPayload::of(entity) {
            Some(EntityPayload::Vehicle(v)) => Some((entity, v)),
            _ => None,
        })
        .map(|(entity, v)| {
            let trip = v.trip.as_ref();
            // the four columns are null together exactly when the position is
            // missing; inside a position, unset bearing/speed take the schema default
            let (position_lat, position_lon, bearing, speed) = match &v.position {
                Some(p) => (
                    Some(p.latitude),
                    Some(p.longitude),
                    Some(p.bearing()),
                    Some(p.speed()),
                ),
                None => (None, None, None, None),
            };

            VehicleRow {
                ingested_at: ingested_at.to_string(),
                feed_timestamp: feed_timestamp.clone(),
                source: VEHICLE_POSITIONS_SOURCE,
                entity_id: entity.id.clone(),
                vehicle_id: v.vehicle.as_ref().and_then(|d| d.id.clone()),
                trip_id: trip.and_then(|t| t.trip_id.clone()),
                route_id: trip.and_then(|t| t.route_id.clone()),
                position_lat,
                position_lon,
                bearing,
                speed,
                current_status: (v.current_status() as i32).to_string(),
                current_stop_sequence: v.current_stop_sequence,
                stop_id: v.stop_id.clone(),
                timestamp: epoch_to_iso(v.timestamp),
            }
        })
        .collect();

    debug!(rows = rows.len(), "Projected vehicle position rows");
    rows
}
