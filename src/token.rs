//! Access tokens for outbound calls.
//!
//! A [`TokenProvider`] is constructed once at startup and shared behind an
//! `Arc` by every downstream client. Refreshing is the provider's job.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::KalkulatorError;

/// Tokens are refreshed this long before the issuer says they expire.
const EXPIRY_LEEWAY: Duration = Duration::from_secs(30);

/// Supplies bearer tokens for outbound requests.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> impl Future<Output = Result<String, KalkulatorError>> + Send;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, KalkulatorError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// OAuth2 client-credentials grant with an in-memory token cache.
pub struct ClientCredentialsClient {
    client: Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

impl ClientCredentialsClient {
    pub fn new(
        client: Client,
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        scope: String,
    ) -> Self {
        Self {
            client,
            token_endpoint,
            client_id,
            client_secret,
            scope,
            cached: RwLock::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, KalkulatorError> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| KalkulatorError::Token(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(KalkulatorError::Token(format!(
                "token endpoint returned {}: {message}",
                status.as_u16()
            )));
        }

        let body = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| KalkulatorError::Token(e.to_string()))?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_LEEWAY);
        debug!(scope = %self.scope, expires_in = body.expires_in, "fetched access token");

        Ok(CachedToken {
            token: body.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

impl TokenProvider for ClientCredentialsClient {
    async fn access_token(&self) -> Result<String, KalkulatorError> {
        {
            let cached = self.cached.read().await;
            if let Some(cached) = cached.as_ref()
                && Instant::now() < cached.refresh_at
            {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.token.clone());
        }
        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}

/// The provider chosen by configuration at startup.
pub enum ConfiguredTokenProvider {
    Static(StaticTokenProvider),
    ClientCredentials(ClientCredentialsClient),
}

impl TokenProvider for ConfiguredTokenProvider {
    async fn access_token(&self) -> Result<String, KalkulatorError> {
        match self {
            ConfiguredTokenProvider::Static(p) => p.access_token().await,
            ConfiguredTokenProvider::ClientCredentials(p) => p.access_token().await,
        }
    }
}
