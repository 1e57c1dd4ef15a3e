//! regel-api access: starting behov, polling their status and fetching the
//! resulting subsumsjon.

pub mod client;
pub mod fetcher;
pub mod poller;
pub mod starter;
pub mod types;

pub use client::{RegelApiClient, build_http_client};
pub use fetcher::SubsumsjonFetcher;
pub use poller::{BehovStatusPoller, PollConfig, StatusProbe};
pub use starter::BehovStarter;
pub use types::{BehovRequest, Subsumsjon};
