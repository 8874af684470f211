//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::error::DecodeError;
use crate::gtfs_rt::{FeedEntity, FeedMessage, TripUpdate, VehiclePosition};

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// Optional fields stay `None` when the producer did not set them, so callers
/// can tell "absent" from "present and zero".
///
/// # Errors
///
/// Returns [`DecodeError`] if the bytes are not valid protobuf for a `FeedMessage`.
#[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    Ok(FeedMessage::decode(bytes)?)
}

/// The payload an entity carries, when it carries one this crate projects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityPayload<'a> {
    TripUpdate(&'a TripUpdate),
    Vehicle(&'a VehiclePosition),
}

impl<'a> EntityPayload<'a> {
    /// Classifies an entity. Alerts, bare deletions and empty entities yield
    /// `None`; an entity carrying both payloads is treated as a trip update.
    pub fn of(entity: &'a FeedEntity) -> Option<Self> {
        match (&entity.trip_update, &entity.vehicle) {
            (Some(update), _) => Some(EntityPayload::TripUpdate(update)),
            (None, Some(vehicle)) => Some(EntityPayload::Vehicle(vehicle)),
            (None, None) => None,
        }
    }
}
