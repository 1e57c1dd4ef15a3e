//! Resolves a national identity number to an aktør id through PDL.

use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::KalkulatorError;
use crate::regelapi::client::error_for_status;
use crate::token::TokenProvider;

const HENT_AKTORID_QUERY: &str =
    "query($ident: ID!) { hentIdenter(ident: $ident, grupper: [AKTORID]) { identer { ident } } }";

/// Looks up the aktør id belonging to a national identity number.
pub trait AktorIdOppslag: Send + Sync {
    fn resolve(&self, fnr: &str) -> impl Future<Output = Result<String, KalkulatorError>> + Send;
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    hent_identer: Option<Identer>,
}

#[derive(Debug, Deserialize)]
struct Identer {
    #[serde(default)]
    identer: Vec<Ident>,
}

#[derive(Debug, Deserialize)]
struct Ident {
    ident: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// GraphQL client for the PDL api.
pub struct PdlKlient<T> {
    client: Client,
    graphql_url: String,
    tokens: Arc<T>,
}

impl<T: TokenProvider> PdlKlient<T> {
    pub fn new(client: Client, base_url: &str, tokens: Arc<T>) -> Self {
        Self {
            client,
            graphql_url: format!("{}/graphql", base_url.trim_end_matches('/')),
            tokens,
        }
    }
}

impl<T: TokenProvider> AktorIdOppslag for PdlKlient<T> {
    async fn resolve(&self, fnr: &str) -> Result<String, KalkulatorError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(token)
            .header("Tema", "DAG")
            .json(&json!({
                "query": HENT_AKTORID_QUERY,
                "variables": { "ident": fnr }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response.bytes().await?;
        let parsed: GraphqlResponse =
            serde_json::from_slice(&body).map_err(|e| KalkulatorError::Parse {
                url: self.graphql_url.clone(),
                message: e.to_string(),
            })?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(KalkulatorError::Oppslag(messages.join("; ")));
        }

        let aktor_id = parsed
            .data
            .and_then(|d| d.hent_identer)
            .and_then(|i| i.identer.into_iter().next())
            .map(|i| i.ident)
            .ok_or_else(|| KalkulatorError::Oppslag("PDL returned no aktør id".to_string()))?;

        debug!("resolved aktør id");
        Ok(aktor_id)
    }
}
