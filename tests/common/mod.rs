#![allow(dead_code)]

use gtfs_rt_ingest::fetch::BasicClient;
use gtfs_rt_ingest::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use gtfs_rt_ingest::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, Position, TripDescriptor, TripUpdate, VehicleDescriptor,
    VehiclePosition,
};
use gtfs_rt_ingest::pipeline::{Ingestor, PipelineConfig};
use gtfs_rt_ingest::sink::TableId;
use gtfs_rt_ingest::sink::bigquery::BigQuerySink;
use httpmock::MockServer;
use prost::Message;

pub const TRIP_INSERT_PATH: &str = "/bigquery/v2/projects/proj/datasets/transit/tables/trip_events/insertAll";
pub const VEHICLE_INSERT_PATH: &str =
    "/bigquery/v2/projects/proj/datasets/transit/tables/vehicle_positions/insertAll";

pub type TestIngestor = Ingestor<BasicClient, BigQuerySink<BasicClient>>;

/// One trip entity with a single arrival-only stop time update.
pub fn trip_feed_bytes() -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        },
        entity: vec![FeedEntity {
            id: "E1".to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some("T1".to_string()),
                    route_id: Some("R1".to_string()),
                    ..Default::default()
                },
                stop_time_update: vec![StopTimeUpdate {
                    stop_id: Some("S1".to_string()),
                    stop_sequence: Some(4),
                    arrival: Some(StopTimeEvent {
                        time: Some(1_700_000_100),
                        delay: Some(30),
                        uncertainty: None,
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }],
    }
    .encode_to_vec()
}

/// Two vehicles, the second without a position.
pub fn vehicle_feed_bytes() -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        },
        entity: vec![
            FeedEntity {
                id: "V1".to_string(),
                vehicle: Some(VehiclePosition {
                    vehicle: Some(VehicleDescriptor {
                        id: Some("BUS-1".to_string()),
                        ..Default::default()
                    }),
                    position: Some(Position {
                        latitude: 37.5,
                        longitude: -122.25,
                        bearing: None,
                        odometer: None,
                        speed: None,
                    }),
                    timestamp: Some(1_700_000_050),
                    ..Default::default()
                }),
                ..Default::default()
            },
            FeedEntity {
                id: "V2".to_string(),
                vehicle: Some(VehiclePosition::default()),
                ..Default::default()
            },
        ],
    }
    .encode_to_vec()
}

pub fn ingestor(server: &MockServer, chunk_size: usize) -> TestIngestor {
    let config = PipelineConfig {
        trip_feed_url: server.url("/trips?agency=RG"),
        vehicle_feed_url: server.url("/vehicles?agency=RG"),
        trip_table: TableId::new("proj", "transit", "trip_events"),
        vehicle_table: TableId::new("proj", "transit", "vehicle_positions"),
        chunk_size,
    };
    let sink = BigQuerySink::with_endpoint(BasicClient::new().unwrap(), &server.base_url());
    Ingestor::new(BasicClient::new().unwrap(), sink, config)
}
