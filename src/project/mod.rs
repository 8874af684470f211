//! Flattens decoded feeds into row records, one projection per feed kind.
//!
//! Rows are plain `Serialize` structs; `Option` fields serialize as JSON
//! `null`, which is how the sink represents a missing column value.

pub mod trip;
pub mod vehicle;

pub use trip::{EventType, TRIP_UPDATES_SOURCE, TripEventRow, project_trip_updates};
pub use vehicle::{VEHICLE_POSITIONS_SOURCE, VehicleRow, project_vehicle_positions};

/// Selects which projection a feed goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    TripUpdates,
    VehiclePositions,
}

impl FeedKind {
    /// The `source` tag stamped on every row of this kind.
    pub fn source(self) -> &'static str {
        match self {
            FeedKind::TripUpdates => TRIP_UPDATES_SOURCE,
            FeedKind::VehiclePositions => VEHICLE_POSITIONS_SOURCE,
        }
    }
}
