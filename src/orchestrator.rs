//! Drives one calculation from start to subsumsjon.

use tracing::{Instrument, Span, info, info_span};
use uuid::Uuid;

use crate::error::KalkulatorError;
use crate::regelapi::{
    BehovRequest, BehovStarter, BehovStatusPoller, PollConfig, RegelApiClient, Subsumsjon,
    SubsumsjonFetcher,
};
use crate::token::TokenProvider;

/// Runs one calculation end to end: start the behov, wait for it, fetch the
/// subsumsjon.
///
/// Holds no per-call state, so a single instance serves any number of
/// concurrent calls. Each call performs exactly one start, a bounded run of
/// status requests and at most one fetch.
pub struct DagpengeKalkulator<T> {
    starter: BehovStarter<T>,
    // Carries the wait budget for every call.
    poller: BehovStatusPoller<T>,
    fetcher: SubsumsjonFetcher<T>,
}

impl<T: TokenProvider> DagpengeKalkulator<T> {
    pub fn new(
        starter: BehovStarter<T>,
        poller: BehovStatusPoller<T>,
        fetcher: SubsumsjonFetcher<T>,
    ) -> Self {
        Self {
            starter,
            poller,
            fetcher,
        }
    }

    /// Wires all three collaborators onto one shared regel-api client.
    pub fn from_client(client: RegelApiClient<T>, poll_config: PollConfig) -> Self {
        Self::new(
            BehovStarter::new(client.clone()),
            BehovStatusPoller::new(client.clone(), poll_config),
            SubsumsjonFetcher::new(client),
        )
    }

    pub fn poller(&self) -> &BehovStatusPoller<T> {
        &self.poller
    }

    /// Calculates for `aktor_id` under `kontekst`, dated today, with no
    /// case-specific facts.
    pub async fn compute(&self, aktor_id: &str, kontekst: &str) -> Result<Subsumsjon, KalkulatorError> {
        async {
            let handle = self.starter.start(aktor_id, kontekst).await?;
            self.complete(&handle).await
        }
        .instrument(call_span(kontekst))
        .await
    }

    /// Like [`Self::compute`], for a request that already carries its facts.
    pub async fn compute_request(&self, request: &BehovRequest) -> Result<Subsumsjon, KalkulatorError> {
        async {
            let handle = self.starter.start_behov(request).await?;
            self.complete(&handle).await
        }
        .instrument(call_span(&request.regelkontekst.kontekst_type))
        .await
    }

    /// Waits for the started behov and fetches its subsumsjon.
    async fn complete(&self, handle: &str) -> Result<Subsumsjon, KalkulatorError> {
        let completed = self.poller.poll(handle).await?;
        let subsumsjon = self.fetcher.fetch(&completed.result_uri).await?;
        info!(
            handle = %completed.handle,
            result_uri = %completed.result_uri,
            "calculation complete"
        );
        Ok(subsumsjon)
    }
}

fn call_span(kontekst: &str) -> Span {
    info_span!("kalkuler", call_id = %Uuid::new_v4(), kontekst)
}
