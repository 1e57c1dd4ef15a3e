//! Result fetcher: reads the subsumsjon a finished behov points at.

use tracing::debug;

use super::client::{RegelApiClient, error_for_status, location};
use super::types::Subsumsjon;
use crate::error::KalkulatorError;
use crate::token::TokenProvider;

/// Reads the subsumsjon of a completed behov.
pub struct SubsumsjonFetcher<T> {
    client: RegelApiClient<T>,
}

impl<T: TokenProvider> SubsumsjonFetcher<T> {
    pub fn new(client: RegelApiClient<T>) -> Self {
        Self { client }
    }

    /// One GET against `result_uri`; neither failure mode is retried.
    ///
    /// The shared client does not follow redirects, so a single 3xx with a
    /// Location is followed here. A second redirect is an error.
    pub async fn fetch(&self, result_uri: &str) -> Result<Subsumsjon, KalkulatorError> {
        let mut response = self.client.get(result_uri).await?;
        if response.status().is_redirection() {
            let target = location(&response).ok_or_else(|| KalkulatorError::MissingLocation {
                url: response.url().to_string(),
            })?;
            debug!(from = %response.url(), to = %target, "following subsumsjon redirect");
            response = self.client.get(&target).await?;
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let url = response.url().to_string();
        let body = response.bytes().await?;
        let subsumsjon: Subsumsjon =
            serde_json::from_slice(&body).map_err(|e| KalkulatorError::Parse {
                url: url.clone(),
                message: e.to_string(),
            })?;

        debug!(url = %url, ider = ?subsumsjon.subsumsjons_ider(), "fetched subsumsjon");
        Ok(subsumsjon)
    }
}
