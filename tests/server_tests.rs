mod common;

use common::*;
use gtfs_rt_ingest::server;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Serves the control surface on an ephemeral port and returns its base URL.
async fn spawn_app(feeds: &MockServer) -> String {
    let app = server::router(Arc::new(ingestor(feeds, 500)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_check_answers_ok() {
    let feeds = MockServer::start_async().await;
    let base = spawn_app(&feeds).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn run_returns_plaintext_summary() {
    let feeds = MockServer::start_async().await;
    feeds
        .mock_async(|when, then| {
            when.method(GET).path("/trips");
            then.status(200).body(trip_feed_bytes());
        })
        .await;
    feeds
        .mock_async(|when, then| {
            when.method(GET).path("/vehicles");
            then.status(200).body(vehicle_feed_bytes());
        })
        .await;
    feeds
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({}));
        })
        .await;
    let base = spawn_app(&feeds).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/run"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "Inserted trip_rows=1, vehicle_rows=2\n"
    );
}

#[tokio::test]
async fn failed_run_is_a_server_error() {
    let feeds = MockServer::start_async().await;
    feeds
        .mock_async(|when, then| {
            when.method(GET);
            then.status(404);
        })
        .await;
    let base = spawn_app(&feeds).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/run"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(body.contains("feed fetch failed"), "body was {body}");
}

#[tokio::test]
async fn run_requires_post() {
    let feeds = MockServer::start_async().await;
    let base = spawn_app(&feeds).await;

    let resp = reqwest::get(format!("{base}/run")).await.unwrap();

    assert_eq!(resp.status(), 405);
}
