use serde::Serialize;
use tracing::debug;

use crate::gtfs_rt::FeedMessage;
use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use crate::parser::EntityPayload;
use crate::time::epoch_to_iso;

pub const TRIP_UPDATES_SOURCE: &str = "511_trip_updates_rg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Arrival,
    Departure,
}

/// One arrival or departure prediction at one stop of one trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripEventRow {
    pub ingested_at: String,
    pub feed_timestamp: Option<String>,
    pub source: &'static str,
    pub entity_id: String,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub stop_id: Option<String>,
    pub stop_sequence: Option<u32>,
    pub event_type: EventType,
    pub event_time: Option<String>,
    pub delay_sec: Option<i32>,
    pub schedule_relationship: String,
}

/// Emits one row per timed stop event: entity order, then stop time update
/// order, arrival before departure.
///
/// An event is emitted only when its `time` is present; a stop time update
/// with neither timed arrival nor timed departure contributes nothing.
#[tracing::instrument(skip_all, fields(entities = feed.entity.len()))]
pub fn project_trip_updates(feed: &FeedMessage, ingested_at: &str) -> Vec<TripEventRow> {
    let feed_timestamp = epoch_to_iso(feed.header.timestamp);
    let mut rows = Vec::new();

    for entity in &feed.entity {
        let Some(EntityPayload::TripUpdate(update)) = EntityPayload::of(entity) else {
            continue;
        };
        let trip = &update.trip;
        let schedule_relationship = (trip.schedule_relationship() as i32).to_string();

        for stu in &update.stop_time_update {
            for (event_type, event) in timed_events(stu) {
                rows.push(TripEventRow {
                    ingested_at: ingested_at.to_string(),
                    feed_timestamp: feed_timestamp.clone(),
                    source: TRIP_UPDATES_SOURCE,
                    entity_id: entity.id.clone(),
                    trip_id: trip.trip_id.clone(),
                    route_id: trip.route_id.clone(),
                    start_date: trip.start_date.clone(),
                    start_time: trip.start_time.clone(),
                    stop_id: stu.stop_id.clone(),
                    stop_sequence: stu.stop_sequence,
                    event_type,
                    event_time: epoch_to_iso(event.time),
                    delay_sec: event.delay,
                    schedule_relationship: schedule_relationship.clone(),
                });
            }
        }
    }

    debug!(rows = rows.len(), "Projected trip update rows");
    rows
}

fn timed_events(stu: &StopTimeUpdate) -> impl Iterator<Item = (EventType, &StopTimeEvent)> {
    [
        (EventType::Arrival, stu.arrival.as_ref()),
        (EventType::Departure, stu.departure.as_ref()),
    ]
    .into_iter()
    .filter_map(|(kind, event)| event.filter(|e| e.time.is_some()).map(|e| (kind, e)))
}
