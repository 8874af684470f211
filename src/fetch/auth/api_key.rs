use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a credential as an HTTP header.
///
/// Header name and value are validated when the wrapper is built, so a bad
/// credential fails at startup instead of on the first request.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name {header_name:?}"))?;
        let mut value = HeaderValue::from_str(key).context("credential is not a valid header value")?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Uses `Authorization: Bearer <token>`, as OAuth access tokens for the
    /// sink API expect.
    pub fn bearer(inner: C, token: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{BasicClient, fetch_bytes};
    use httpmock::prelude::*;

    #[test]
    fn rejects_header_value_with_newline() {
        let client = BasicClient::new().unwrap();
        assert!(ApiKey::bearer(client, "tok\nen").is_err());
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/secure")
                    .header("Authorization", "Bearer s3cret");
                then.status(200).body("ok");
            })
            .await;

        let client = ApiKey::bearer(BasicClient::new().unwrap(), "s3cret").unwrap();
        fetch_bytes(&client, &server.url("/secure")).await.unwrap();

        mock.assert_async().await;
    }
}
