//! HTTP control surface: liveness and on-demand runs.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use std::sync::Arc;
use tracing::{error, info};

use crate::fetch::HttpClient;
use crate::pipeline::Ingestor;
use crate::sink::RowSink;

/// `GET /` answers `ok`; `POST /run` performs one ingestion pass and answers
/// with the plaintext summary, or 500 with the error.
pub fn router<C, S>(ingestor: Arc<Ingestor<C, S>>) -> Router
where
    C: HttpClient + 'static,
    S: RowSink + 'static,
{
    Router::new()
        .route("/", get(health))
        .route("/run", post(trigger_run::<C, S>))
        .with_state(ingestor)
}

async fn health() -> &'static str {
    "ok"
}

async fn trigger_run<C, S>(State(ingestor): State<Arc<Ingestor<C, S>>>) -> (StatusCode, String)
where
    C: HttpClient + 'static,
    S: RowSink + 'static,
{
    match ingestor.run().await {
        Ok(summary) => {
            info!(%summary, "Run triggered over HTTP succeeded");
            (StatusCode::OK, format!("{summary}\n"))
        }
        Err(e) => {
            error!(error = %e, "Run triggered over HTTP failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
        }
    }
}
