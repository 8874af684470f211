//! Process configuration, read once at startup from the environment.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::fetch::DEFAULT_TIMEOUT;
use crate::pipeline::PipelineConfig;
use crate::sink::TableId;
use crate::sink::bigquery::DEFAULT_ENDPOINT;
use crate::writer::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_AGENCY: &str = "RG";
pub const DEFAULT_TRIP_FEED_URL: &str = "https://api.511.org/Transit/TripUpdates";
pub const DEFAULT_VEHICLE_FEED_URL: &str = "https://api.511.org/Transit/VehiclePositions";

#[derive(Clone)]
pub struct IngestConfig {
    pub project: String,
    pub dataset: String,
    pub trip_table: String,
    pub vehicle_table: String,
    /// Provider key, appended to feed requests as `api_key`.
    pub api_key: String,
    /// Feed URLs with the `agency` parameter already applied.
    pub trip_feed_url: String,
    pub vehicle_feed_url: String,
    pub fetch_timeout: Duration,
    pub chunk_size: usize,
    pub bigquery_endpoint: String,
    /// Static OAuth token sent as `Authorization: Bearer` on inserts
    /// (`BQ_ACCESS_TOKEN`). It is not refreshed, so it must outlive the
    /// process. When unset, inserts go out without credentials, which only
    /// an emulator or an authenticating proxy in front of `BQ_ENDPOINT` accepts.
    pub access_token: Option<String>,
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("project", &self.project)
            .field("dataset", &self.dataset)
            .field("trip_table", &self.trip_table)
            .field("vehicle_table", &self.vehicle_table)
            .field("api_key", &"<redacted>")
            .field("trip_feed_url", &self.trip_feed_url)
            .field("vehicle_feed_url", &self.vehicle_feed_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("chunk_size", &self.chunk_size)
            .field("bigquery_endpoint", &self.bigquery_endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let project = required("BQ_PROJECT")?;
        let dataset = required("BQ_DATASET")?;
        let trip_table = required("BQ_TABLE_TRIP")?;
        let vehicle_table = required("BQ_TABLE_VEH")?;
        let api_key = required("API_KEY")?;

        let agency = get("FEED_AGENCY").unwrap_or_else(|| DEFAULT_AGENCY.to_string());
        let trip_feed_url = with_agency(
            "TRIP_FEED_URL",
            get("TRIP_FEED_URL").as_deref().unwrap_or(DEFAULT_TRIP_FEED_URL),
            &agency,
        )?;
        let vehicle_feed_url = with_agency(
            "VEHICLE_FEED_URL",
            get("VEHICLE_FEED_URL")
                .as_deref()
                .unwrap_or(DEFAULT_VEHICLE_FEED_URL),
            &agency,
        )?;

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(positive("FETCH_TIMEOUT_SECS", &raw)? as u64),
            None => DEFAULT_TIMEOUT,
        };
        let chunk_size = match get("INSERT_CHUNK_SIZE") {
            Some(raw) => positive("INSERT_CHUNK_SIZE", &raw)?,
            None => DEFAULT_CHUNK_SIZE,
        };

        let config = Self {
            project,
            dataset,
            trip_table,
            vehicle_table,
            api_key,
            trip_feed_url,
            vehicle_feed_url,
            fetch_timeout,
            chunk_size,
            bigquery_endpoint: get("BQ_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            access_token: get("BQ_ACCESS_TOKEN"),
        };

        // project/dataset/table must compose into a valid identifier
        config.table("BQ_TABLE_TRIP", &config.trip_table)?;
        config.table("BQ_TABLE_VEH", &config.vehicle_table)?;

        Ok(config)
    }

    fn table(&self, name: &'static str, table: &str) -> Result<TableId, ConfigError> {
        let id = format!("{}.{}.{}", self.project, self.dataset, table);
        id.parse().map_err(|e: crate::sink::InvalidTableId| ConfigError::Invalid {
            name,
            value: id,
            reason: e.to_string(),
        })
    }

    pub fn trip_table_id(&self) -> TableId {
        TableId::new(&self.project, &self.dataset, &self.trip_table)
    }

    pub fn vehicle_table_id(&self) -> TableId {
        TableId::new(&self.project, &self.dataset, &self.vehicle_table)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            trip_feed_url: self.trip_feed_url.clone(),
            vehicle_feed_url: self.vehicle_feed_url.clone(),
            trip_table: self.trip_table_id(),
            vehicle_table: self.vehicle_table_id(),
            chunk_size: self.chunk_size,
        }
    }
}

fn with_agency(name: &'static str, base: &str, agency: &str) -> Result<String, ConfigError> {
    let mut url = reqwest::Url::parse(base).map_err(|e| ConfigError::Invalid {
        name,
        value: base.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("agency", agency);
    Ok(url.into())
}

fn positive(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason,
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(invalid("must be greater than zero".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(e.to_string())),
    }
}
