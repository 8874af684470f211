//! Error taxonomy for one ingestion run.
//!
//! Every variant is fatal to the run that raised it; nothing here is retried.

use thiserror::Error;

/// The feed endpoint could not be read.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

impl FetchError {
    /// Wraps a transport error, dropping the request URL from it so query
    /// parameters (the provider API key) never reach logs or responses.
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            source: source.without_url(),
        }
    }
}

/// The payload did not conform to the GTFS-realtime schema.
#[derive(Debug, Error)]
#[error("malformed feed payload: {0}")]
pub struct DecodeError(#[from] pub prost::DecodeError);

/// A chunk was rejected by the sink, or the insert call itself failed.
///
/// Chunks before `start` were committed and stay committed.
#[derive(Debug, Error)]
#[error(
    "insert into {table} failed for rows {start}..{end} ({committed} rows already committed): {detail}"
)]
pub struct WriteError {
    pub table: String,
    pub start: usize,
    pub end: usize,
    pub committed: usize,
    pub detail: String,
}

/// Single failure surfaced by [`crate::pipeline::Ingestor::run`].
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("feed decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("row write failed: {0}")]
    Write(#[from] WriteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}
