use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// The key is added per request, so configured feed URLs (and everything that
/// logs them) stay free of it.
pub struct UrlParam<C> {
    inner: C,
    param_name: String,
    key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{BasicClient, fetch_bytes};
    use httpmock::prelude::*;

    #[tokio::test]
    async fn key_is_appended_after_existing_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/Transit/TripUpdates")
                    .query_param("agency", "RG")
                    .query_param("api_key", "k-123");
                then.status(200).body("");
            })
            .await;

        let client = UrlParam::new(BasicClient::new().unwrap(), "api_key", "k-123");
        let url = format!("{}?agency=RG", server.url("/Transit/TripUpdates"));
        fetch_bytes(&client, &url).await.unwrap();

        mock.assert_async().await;
    }
}
