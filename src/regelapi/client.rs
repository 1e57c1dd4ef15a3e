//! HTTP transport for the regel-api.
//!
//! Every call carries a bearer token from the configured [`TokenProvider`];
//! relative URIs from the regel-api are resolved against the base URL.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, redirect};
use serde::Serialize;

use crate::error::KalkulatorError;
use crate::token::TokenProvider;

/// Shared transport for every regel-api call.
///
/// Holds one connection pool and one token provider; cloning shares both.
pub struct RegelApiClient<T> {
    client: Client,
    /// dp-proxy base, with or without a trailing slash.
    base_url: String,
    tokens: Arc<T>,
}

impl<T> Clone for RegelApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

/// Builds the HTTP client used for regel-api calls.
///
/// Redirects are not followed: the status endpoint signals completion with a
/// `303 See Other` whose Location we need to read ourselves.
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(request_timeout)
        .redirect(redirect::Policy::none())
        .build()
}

impl<T: TokenProvider> RegelApiClient<T> {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<T>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Absolute URIs are kept; relative ones are joined onto the base URL.
    pub fn resolve(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return uri.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let rest = uri.trim_start_matches('/');
        if rest.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{rest}")
        }
    }

    pub async fn get(&self, uri: &str) -> Result<Response, KalkulatorError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(self.resolve(uri))
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await?;
        Ok(response)
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        uri: &str,
        body: &B,
    ) -> Result<Response, KalkulatorError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(self.resolve(uri))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }
}

/// Turns a non-2xx response into [`KalkulatorError::DownstreamStatus`].
pub async fn error_for_status(response: Response) -> KalkulatorError {
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    KalkulatorError::DownstreamStatus {
        url,
        status,
        message,
    }
}

/// Reads the Location header of a response, if it is present and readable.
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticTokenProvider;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> RegelApiClient<StaticTokenProvider> {
        RegelApiClient::new(
            Client::new(),
            base_url,
            Arc::new(StaticTokenProvider::new("testToken")),
        )
    }

    #[test]
    fn resolve_joins_relative_uris_without_doubling_slashes() {
        let with_slash = client("http://dp-proxy/proxy/v1/");
        assert_eq!(
            with_slash.resolve("/behov/status/123"),
            "http://dp-proxy/proxy/v1/behov/status/123"
        );
        let without_slash = client("http://dp-proxy/proxy/v1");
        assert_eq!(
            without_slash.resolve("behov"),
            "http://dp-proxy/proxy/v1/behov"
        );
    }

    #[test]
    fn resolve_keeps_absolute_uris() {
        let c = client("http://dp-proxy");
        assert_eq!(
            c.resolve("https://regel-api/subsumsjon/1"),
            "https://regel-api/subsumsjon/1"
        );
    }

    #[tokio::test]
    async fn get_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/behov/status/1"))
            .and(header("Authorization", "Bearer testToken"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server.uri()).get("/behov/status/1").await.unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn non_success_is_described() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let response = client(&server.uri()).get("/behov").await.unwrap();
        match error_for_status(response).await {
            KalkulatorError::DownstreamStatus {
                status, message, ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("expected DownstreamStatus, got {other:?}"),
        }
    }
}
