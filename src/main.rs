mod api;
mod cli;
mod config;
mod error;
mod logging;
mod oppslag;
mod orchestrator;
mod regelapi;
mod token;
mod ui;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use reqwest::Client;
use tracing::{error, info, warn};

use api::{Fakta, KalkulatorApi, Problem, REBEREGNING_KONTEKST};
use cli::{BeregnArgs, Cli, Command, ReberegnArgs};
use config::{Credentials, KalkulatorConfig};
use error::{ErrorKind, KalkulatorError};
use oppslag::PdlKlient;
use orchestrator::DagpengeKalkulator;
use regelapi::{BehovRequest, RegelApiClient, StatusProbe, Subsumsjon, build_http_client};
use token::{ClientCredentialsClient, ConfiguredTokenProvider, StaticTokenProvider};

type Api = KalkulatorApi<PdlKlient<ConfiguredTokenProvider>, ConfiguredTokenProvider>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match KalkulatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.profile, cli.verbose);

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "startup failed");
            ExitCode::FAILURE
        }
    }
}

fn token_provider(config: &KalkulatorConfig, http: &Client, scope: &str) -> ConfiguredTokenProvider {
    match config.credentials() {
        Credentials::ClientCredentials => ConfiguredTokenProvider::ClientCredentials(
            ClientCredentialsClient::new(
                http.clone(),
                config.azure.token_endpoint.clone(),
                config.azure.client_id.clone(),
                config.azure.client_secret.clone(),
                scope.to_string(),
            ),
        ),
        Credentials::Static(token) => ConfiguredTokenProvider::Static(StaticTokenProvider::new(token)),
    }
}

/// Builds every collaborator once; they are shared read-only afterwards.
fn build_api(config: &KalkulatorConfig) -> Result<Api> {
    let http = build_http_client(config.request_timeout()).context("failed to build HTTP client")?;

    let regel_tokens = Arc::new(token_provider(config, &http, &config.dp_proxy_scope));
    let pdl_tokens = Arc::new(token_provider(config, &http, &config.pdl_api_scope));

    let regel_api = RegelApiClient::new(http.clone(), config.dp_proxy_url.clone(), regel_tokens);
    let kalkulator = DagpengeKalkulator::from_client(regel_api, config.poll_config()?);
    let oppslag = PdlKlient::new(http, &config.pdl_api_url, pdl_tokens);

    info!(
        profile = ?config.profile,
        regel_api = %config.dp_proxy_url,
        max_wait_ms = config.max_wait_ms,
        "kalkulator ready"
    );
    Ok(KalkulatorApi::new(oppslag, kalkulator).with_forskudd_api_key(config.forskudd_api_key.clone()))
}

async fn run(command: Command, config: &KalkulatorConfig) -> Result<ExitCode> {
    let api = build_api(config)?;
    match command {
        Command::Beregn(args) => beregn(&api, &args).await,
        Command::Reberegn(args) => reberegn(&api, &args).await,
        Command::Status { handle } => status(&api, &handle).await,
    }
}

async fn beregn(api: &Api, args: &BeregnArgs) -> Result<ExitCode> {
    let fakta = Fakta {
        antall_barn: args.antall_barn,
        manuelt_grunnlag: args.manuelt_grunnlag,
        har_avtjent_verneplikt: args.verneplikt.then_some(true),
    };

    let progress = (!args.json).then(|| ui::BeregningProgress::start(&args.kontekst));
    let result: Result<Subsumsjon, KalkulatorError> = match &args.subject.aktor_id {
        Some(aktor_id) => {
            let mut request = BehovRequest::new(aktor_id, &args.kontekst, Local::now().date_naive());
            fakta.apply(&mut request);
            api.kalkulator().compute_request(&request).await
        }
        None if args.has_facts() => {
            api.beregn_med_fakta(args.subject.fnr.as_deref(), Some(args.kontekst.as_str()), &fakta)
                .await
        }
        None => api.beregn(args.subject.fnr.as_deref(), Some(args.kontekst.as_str())).await,
    };

    report(result, progress.as_ref())
}

async fn reberegn(api: &Api, args: &ReberegnArgs) -> Result<ExitCode> {
    let progress = (!args.json).then(|| ui::BeregningProgress::start(REBEREGNING_KONTEKST));
    let result = api.reberegn(Some(args.api_key.as_str()), Some(args.fnr.as_str())).await;
    report(result, progress.as_ref())
}

/// Prints the outcome of a calculation, as a summary when `progress` is shown
/// and as JSON otherwise.
fn report(
    result: Result<Subsumsjon, KalkulatorError>,
    progress: Option<&ui::BeregningProgress>,
) -> Result<ExitCode> {
    match result {
        Ok(subsumsjon) => {
            match progress {
                Some(progress) => progress.finish_ok(&subsumsjon),
                None => println!("{}", serde_json::to_string_pretty(&subsumsjon)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let problem = problem(&err);
            match progress {
                Some(progress) => progress.finish_err(&problem),
                None => println!("{}", serde_json::to_string_pretty(&problem)?),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn problem(err: &KalkulatorError) -> Problem {
    match err.kind() {
        kind @ (ErrorKind::DownstreamClient | ErrorKind::IncompleteResult) => {
            error!(kind = %kind, error = %err, "could not get subsumsjon")
        }
        kind => warn!(kind = %kind, error = %err, "request rejected"),
    }
    Problem::from(err)
}

async fn status(api: &Api, handle: &str) -> Result<ExitCode> {
    match api.kalkulator().poller().status(handle).await {
        Ok(StatusProbe::Pending) => println!("PENDING"),
        Ok(StatusProbe::Done { result_uri }) => println!("DONE {result_uri}"),
        Ok(StatusProbe::Failed) => println!("FAILED"),
        Ok(StatusProbe::Unreadable(reason)) => println!("UNKNOWN ({reason})"),
        Err(err) => {
            let problem = problem(&err);
            println!("{}", serde_json::to_string_pretty(&problem)?);
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}
