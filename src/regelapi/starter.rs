//! Job starter: submits a behov and returns its status handle.

use chrono::Local;
use tracing::{debug, info};

use super::client::{RegelApiClient, error_for_status, location};
use super::types::BehovRequest;
use crate::error::KalkulatorError;
use crate::token::TokenProvider;

const BEHOV_PATH: &str = "/behov";

/// Submits behov to the regel-api and hands back their status location.
pub struct BehovStarter<T> {
    client: RegelApiClient<T>,
}

impl<T: TokenProvider> BehovStarter<T> {
    pub fn new(client: RegelApiClient<T>) -> Self {
        Self { client }
    }

    /// Starts a behov for `aktor_id` under `kontekst`, dated today.
    pub async fn start(&self, aktor_id: &str, kontekst: &str) -> Result<String, KalkulatorError> {
        let request = BehovRequest::new(aktor_id, kontekst, Local::now().date_naive());
        self.start_behov(&request).await
    }

    /// Posts `request` once. The job handle is the Location of the created
    /// resource; the body is not read.
    pub async fn start_behov(&self, request: &BehovRequest) -> Result<String, KalkulatorError> {
        if request.aktor_id.trim().is_empty() {
            return Err(KalkulatorError::InvalidRequest(
                "aktorId must not be empty".to_string(),
            ));
        }

        debug!(kontekst = %request.regelkontekst.kontekst_type, "starting behov");
        let response = self.client.post_json(BEHOV_PATH, request).await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let handle = location(&response).ok_or_else(|| KalkulatorError::MissingLocation {
            url: response.url().to_string(),
        })?;
        info!(handle = %handle, "behov started");
        Ok(handle)
    }
}
