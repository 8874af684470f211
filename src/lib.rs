pub mod config;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod pipeline;
pub mod project;
pub mod server;
pub mod sink;
pub mod time;
pub mod writer;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
