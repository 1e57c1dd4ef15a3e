//! Boundary between an authenticated caller and the calculation.
//!
//! Callers arrive with an already verified subject (the national identity
//! number) and a free-text regelkontekst. Errors leave this layer as a
//! [`Problem`] document with the status code for their kind.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ErrorKind, KalkulatorError};
use crate::oppslag::AktorIdOppslag;
use crate::orchestrator::DagpengeKalkulator;
use crate::regelapi::{BehovRequest, Subsumsjon};
use crate::token::TokenProvider;

/// Case-specific facts a caller may add to a calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fakta {
    pub antall_barn: Option<u32>,
    pub manuelt_grunnlag: Option<u32>,
    pub har_avtjent_verneplikt: Option<bool>,
}

impl Fakta {
    pub fn apply(&self, request: &mut BehovRequest) {
        request.antall_barn = self.antall_barn;
        request.manuelt_grunnlag = self.manuelt_grunnlag;
        request.har_avtjent_verneplikt = self.har_avtjent_verneplikt;
    }
}

/// Regelkontekst used for every recalculation.
pub const REBEREGNING_KONTEKST: &str = "corona";

pub struct KalkulatorApi<O, T> {
    oppslag: O,
    kalkulator: DagpengeKalkulator<T>,
    // Shared secret for recalculation; none configured means nobody may call it.
    forskudd_api_key: Option<String>,
}

impl<O: AktorIdOppslag, T: TokenProvider> KalkulatorApi<O, T> {
    pub fn new(oppslag: O, kalkulator: DagpengeKalkulator<T>) -> Self {
        Self {
            oppslag,
            kalkulator,
            forskudd_api_key: None,
        }
    }

    pub fn with_forskudd_api_key(mut self, key: Option<String>) -> Self {
        self.forskudd_api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn kalkulator(&self) -> &DagpengeKalkulator<T> {
        &self.kalkulator
    }

    /// Resolves the caller's aktør id once, then runs the calculation.
    pub async fn beregn(
        &self,
        subject: Option<&str>,
        kontekst: Option<&str>,
    ) -> Result<Subsumsjon, KalkulatorError> {
        let (aktor_id, kontekst) = self.resolve(subject, kontekst).await?;
        self.kalkulator.compute(&aktor_id, kontekst).await
    }

    /// Like [`Self::beregn`], with case-specific facts added to the behov.
    pub async fn beregn_med_fakta(
        &self,
        subject: Option<&str>,
        kontekst: Option<&str>,
        fakta: &Fakta,
    ) -> Result<Subsumsjon, KalkulatorError> {
        let (aktor_id, kontekst) = self.resolve(subject, kontekst).await?;
        let mut request = BehovRequest::new(&aktor_id, kontekst, Local::now().date_naive());
        fakta.apply(&mut request);
        self.kalkulator.compute_request(&request).await
    }

    /// Recalculation on behalf of a trusted service, authenticated by API key
    /// rather than by subject. Always runs under [`REBEREGNING_KONTEKST`].
    pub async fn reberegn(
        &self,
        api_key: Option<&str>,
        fnr: Option<&str>,
    ) -> Result<Subsumsjon, KalkulatorError> {
        let authenticated = matches!(
            (api_key, self.forskudd_api_key.as_deref()),
            (Some(given), Some(expected)) if given == expected
        );
        if !authenticated {
            warn!("reberegning rejected: api key missing or wrong");
            return Err(KalkulatorError::AuthenticationMissing(
                "not authenticated".to_string(),
            ));
        }
        let fnr = fnr
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| KalkulatorError::InvalidRequest("fnr must be set".to_string()))?;

        let aktor_id = self.oppslag.resolve(fnr).await?;
        info!("reberegning started");
        self.kalkulator.compute(&aktor_id, REBEREGNING_KONTEKST).await
    }

    async fn resolve<'a>(
        &self,
        subject: Option<&str>,
        kontekst: Option<&'a str>,
    ) -> Result<(String, &'a str), KalkulatorError> {
        let fnr = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                KalkulatorError::AuthenticationMissing("no subject on the request".to_string())
            })?;
        let kontekst = kontekst
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| KalkulatorError::InvalidRequest("regelkontekst must be set".to_string()))?;

        let aktor_id = self.oppslag.resolve(fnr).await?;
        Ok((aktor_id, kontekst))
    }
}

/// Problem details returned to the caller when a calculation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&KalkulatorError> for Problem {
    fn from(err: &KalkulatorError) -> Self {
        let kind = err.kind();
        let (problem_type, title) = match kind {
            ErrorKind::DownstreamClient => ("urn:dp:error:regelapi", "Feil fra regel-api"),
            ErrorKind::IncompleteResult => (
                "urn:dp:error:regelapi:timeout",
                "Feil fra API, fikk ikke beregnet inntekt",
            ),
            ErrorKind::Parse => ("urn:dp:error:regelapi:format", "Uventet svar fra regel-api"),
            ErrorKind::AuthenticationMissing => ("urn:dp:error:auth", "Ikke innlogget"),
            ErrorKind::InvalidRequest => ("urn:dp:error:parameter", "Parameteret er ikke gyldig"),
        };
        Problem {
            problem_type: problem_type.to_string(),
            title: title.to_string(),
            status: err.http_status(),
            detail: Some(err.to_string()),
        }
    }
}
