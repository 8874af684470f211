//! BigQuery streaming-insert sink (`tabledata.insertAll`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{InsertError, RowSink, TableId};
use crate::fetch::HttpClient;

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com";

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    kind: &'static str,
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

/// Sends each chunk as one `insertAll` request through `C`.
///
/// Authentication is whatever `C` adds; wrap a client in
/// [`ApiKey::bearer`](crate::fetch::auth::ApiKey::bearer) for OAuth tokens.
pub struct BigQuerySink<C> {
    client: C,
    endpoint: String,
}

impl<C: HttpClient> BigQuerySink<C> {
    pub fn new(client: C) -> Self {
        Self::with_endpoint(client, DEFAULT_ENDPOINT)
    }

    /// Targets a different API root, e.g. a local emulator.
    pub fn with_endpoint(client: C, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn insert_url(&self, table: &TableId) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.endpoint, table.project, table.dataset, table.table
        )
    }
}

#[async_trait]
impl<C: HttpClient> RowSink for BigQuerySink<C> {
    #[tracing::instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn insert_all(&self, table: &TableId, rows: &[Value]) -> Result<Vec<InsertError>> {
        let payload = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            rows: rows.iter().map(|json| InsertRow { json }).collect(),
        };
        let body = serde_json::to_vec(&payload)?;

        let url = self.insert_url(table);
        let mut req = reqwest::Request::new(reqwest::Method::POST, url.parse()?);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());

        let response = self
            .client
            .execute(req)
            .await
            .map_err(|e| e.without_url())
            .context("insertAll request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("insertAll returned status {}: {}", status, body));
        }

        let parsed: InsertAllResponse = response
            .json()
            .await
            .context("failed to parse insertAll response")?;

        debug!(insert_errors = parsed.insert_errors.len(), "insertAll completed");
        Ok(parsed.insert_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use httpmock::prelude::*;
    use serde_json::json;

    const PATH: &str = "/bigquery/v2/projects/p/datasets/d/tables/t/insertAll";

    fn sink(server: &MockServer) -> BigQuerySink<BasicClient> {
        BigQuerySink::with_endpoint(BasicClient::new().unwrap(), &format!("{}/", server.base_url()))
    }

    #[tokio::test]
    async fn posts_rows_wrapped_in_json_envelopes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "kind": "bigquery#tableDataInsertAllRequest",
                        "rows": [
                            {"json": {"entity_id": "E1", "delay_sec": 30}},
                            {"json": {"entity_id": "E2", "delay_sec": null}}
                        ]
                    }));
                then.status(200)
                    .json_body(json!({"kind": "bigquery#tableDataInsertAllResponse"}));
            })
            .await;

        let rows = vec![
            json!({"entity_id": "E1", "delay_sec": 30}),
            json!({"entity_id": "E2", "delay_sec": null}),
        ];
        let errors = sink(&server)
            .insert_all(&TableId::new("p", "d", "t"), &rows)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn returns_row_level_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "kind": "bigquery#tableDataInsertAllResponse",
                    "insertErrors": [
                        {"index": 1, "errors": [{"reason": "invalid", "message": "bad value"}]}
                    ]
                }));
            })
            .await;

        let rows = vec![json!({"a": 1}), json!({"a": "x"})];
        let errors = sink(&server)
            .insert_all(&TableId::new("p", "d", "t"), &rows)
            .await
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].errors[0].message.as_deref(), Some("bad value"));
    }

    #[tokio::test]
    async fn payload_too_large_is_a_call_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(413).body("Request Entity Too Large");
            })
            .await;

        let err = sink(&server)
            .insert_all(&TableId::new("p", "d", "t"), &[json!({"a": 1})])
            .await
            .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("413"));
        assert!(msg.contains("Request Entity Too Large"));
    }
}
