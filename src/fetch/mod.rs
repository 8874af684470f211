mod basic;
mod client;
pub mod auth;

pub use basic::{BasicClient, DEFAULT_TIMEOUT};
pub use client::HttpClient;

use bytes::Bytes;
use tracing::debug;

use crate::error::FetchError;

/// Issues a GET for `url` and returns the body of a 2xx response.
///
/// Any transport failure, timeout, or non-success status is a [`FetchError`].
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| FetchError::transport(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FetchError::transport(url, e))?;
    debug!(bytes = bytes.len(), "Feed bytes received");
    Ok(bytes)
}
