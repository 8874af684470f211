//! CLI entry point for the GTFS-RT ingestor.
//!
//! `serve` exposes the HTTP trigger, `run` performs a single pass, and
//! `project` dumps projected rows from a file or URL to local CSV.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gtfs_rt_ingest::{
    config::IngestConfig,
    fetch::{
        BasicClient, HttpClient,
        auth::{ApiKey, UrlParam},
        fetch_bytes,
    },
    parser::parse_feed,
    pipeline::Ingestor,
    project::{FeedKind, project_trip_updates, project_vehicle_positions},
    server,
    sink::{TableId, bigquery::BigQuerySink, csv::CsvSink},
    time::instant_to_iso,
    writer::{BulkWriter, DEFAULT_CHUNK_SIZE},
};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type LiveIngestor = Ingestor<UrlParam<BasicClient>, BigQuerySink<Box<dyn HttpClient>>>;

#[derive(Parser)]
#[command(name = "gtfs_rt_ingest")]
#[command(about = "Loads GTFS-RT trip updates and vehicle positions into BigQuery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve `GET /` and `POST /run`
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Run one fetch-transform-load pass and exit
    Run,
    /// Project a feed from a file or URL into a local CSV
    Project {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Which projection to apply
        #[arg(short, long, value_enum, default_value_t = Kind::Trip)]
        kind: Kind,

        /// Directory the CSV is appended to
        #[arg(short, long, default_value = "rows")]
        output_dir: String,

        /// Provider key appended as `api_key` when fetching a URL
        #[arg(long, env = "API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Trip,
    Vehicle,
}

impl From<Kind> for FeedKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Trip => FeedKind::TripUpdates,
            Kind::Vehicle => FeedKind::VehiclePositions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let ingestor = Arc::new(build_ingestor(&IngestConfig::from_env()?)?);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;

            info!(%addr, "Listening");
            axum::serve(listener, server::router(ingestor)).await?;
        }
        Commands::Run => {
            let ingestor = build_ingestor(&IngestConfig::from_env()?)?;
            let summary = ingestor.run().await?;
            info!(%summary, "Run finished");
        }
        Commands::Project {
            source,
            kind,
            output_dir,
            api_key,
        } => {
            project_to_csv(&source, kind.into(), &output_dir, api_key).await?;
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_ingest.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_ingest.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Wires the live feed client and BigQuery sink from configuration.
fn build_ingestor(config: &IngestConfig) -> Result<LiveIngestor> {
    info!(?config, "Configuration loaded");

    let feed_client = UrlParam::new(
        BasicClient::with_timeout(config.fetch_timeout)?,
        "api_key",
        config.api_key.as_str(),
    );

    let sink_http = BasicClient::with_timeout(config.fetch_timeout)?;
    let sink_client: Box<dyn HttpClient> = match &config.access_token {
        Some(token) => Box::new(ApiKey::bearer(sink_http, token)?),
        None => {
            warn!("BQ_ACCESS_TOKEN not set, insert requests are sent without credentials");
            Box::new(sink_http)
        }
    };
    let sink = BigQuerySink::with_endpoint(sink_client, &config.bigquery_endpoint);

    Ok(Ingestor::new(feed_client, sink, config.pipeline_config()))
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(api_key))]
async fn fetcher(source: &str, api_key: Option<String>) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new()?;
        let body = match api_key {
            Some(key) => fetch_bytes(&UrlParam::new(client, "api_key", key), source).await?,
            None => fetch_bytes(&client, source).await?,
        };
        body.to_vec()
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))?
    };
    Ok(bytes)
}

#[tracing::instrument(skip(api_key))]
async fn project_to_csv(
    source: &str,
    kind: FeedKind,
    output_dir: &str,
    api_key: Option<String>,
) -> Result<()> {
    let bytes = fetcher(source, api_key).await?;
    let feed = parse_feed(&bytes)?;
    let ingested_at = instant_to_iso(chrono::Utc::now());

    let writer = BulkWriter::new(CsvSink::new(output_dir));
    let table = TableId::new("local", "gtfs_rt", kind.source());

    let written = match kind {
        FeedKind::TripUpdates => {
            let rows = project_trip_updates(&feed, &ingested_at);
            writer.write(&table, &rows, DEFAULT_CHUNK_SIZE).await?
        }
        FeedKind::VehiclePositions => {
            let rows = project_vehicle_positions(&feed, &ingested_at);
            writer.write(&table, &rows, DEFAULT_CHUNK_SIZE).await?
        }
    };

    info!(
        written,
        path = %writer.sink().path_for(&table).display(),
        "Projected rows written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_takes_an_output_directory() {
        let cli = Cli::try_parse_from([
            "gtfs_rt_ingest",
            "project",
            "feed.pb",
            "--kind",
            "vehicle",
            "--output-dir",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Project {
                source,
                kind,
                output_dir,
                ..
            } => {
                assert_eq!(source, "feed.pb");
                assert!(matches!(kind, Kind::Vehicle));
                assert_eq!(output_dir, "out");
            }
            _ => panic!("expected the project subcommand"),
        }
    }

    #[test]
    fn project_defaults_to_trip_rows_in_rows_dir() {
        let cli = Cli::try_parse_from(["gtfs_rt_ingest", "project", "feed.pb"]).unwrap();
        let Commands::Project { kind, output_dir, .. } = cli.command else {
            panic!("expected the project subcommand");
        };
        assert!(matches!(kind, Kind::Trip));
        assert_eq!(output_dir, "rows");
    }
}
