//! Waits for a behov to finish.
//!
//! The status endpoint answers in one of two ways once a behov is done: a
//! `303 See Other` pointing at the subsumsjon, or a 2xx body with
//! `"status": "DONE"` (optionally with a `location` link). Without a link the
//! handle itself serves the result. Bodies that cannot be read yet are retried
//! until the wait budget runs out.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use super::client::{RegelApiClient, error_for_status, location};
use super::types::{BehovStatus, StatusEnvelope};
use crate::error::KalkulatorError;
use crate::token::TokenProvider;

/// Wait budget and spacing between status requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Total time a behov may stay unfinished.
    pub max_wait: Duration,
    /// Pause between two status requests.
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl PollConfig {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Result<Self, KalkulatorError> {
        if max_wait.is_zero() || poll_interval.is_zero() {
            return Err(KalkulatorError::InvalidRequest(
                "max wait and poll interval must both be positive".to_string(),
            ));
        }
        Ok(Self {
            max_wait,
            poll_interval,
        })
    }
}

/// What a single status request observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusProbe {
    Pending,
    Done { result_uri: String },
    Failed,
    /// The envelope had no recognisable status; the regel-api may be mid-write.
    Unreadable(String),
}

/// A behov that reached DONE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedBehov {
    pub handle: String,
    /// Where the subsumsjon can be read.
    pub result_uri: String,
}

pub struct BehovStatusPoller<T> {
    client: RegelApiClient<T>,
    config: PollConfig,
}

impl<T: TokenProvider> BehovStatusPoller<T> {
    pub fn new(client: RegelApiClient<T>, config: PollConfig) -> Self {
        Self { client, config }
    }

    /// [`Self::await_completion`] with the configured budget.
    pub async fn poll(&self, handle: &str) -> Result<CompletedBehov, KalkulatorError> {
        self.await_completion(handle, self.config.max_wait, self.config.poll_interval)
            .await
    }

    /// Polls `handle` until DONE or FAILED, giving up once `max_wait` has
    /// elapsed. A status request still in flight at the deadline is dropped,
    /// and the last sleep is clamped to what is left of the budget.
    pub async fn await_completion(
        &self,
        handle: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Result<CompletedBehov, KalkulatorError> {
        let started = Instant::now();
        let deadline = started + max_wait;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let observed = match timeout_at(deadline, self.status(handle)).await {
                Ok(observed) => observed?,
                Err(_) => return Err(gave_up(handle, attempt, started)),
            };
            match observed {
                StatusProbe::Done { result_uri } => {
                    debug!(handle, attempt, result_uri = %result_uri, "behov done");
                    return Ok(CompletedBehov {
                        handle: handle.to_string(),
                        result_uri,
                    });
                }
                StatusProbe::Failed => {
                    warn!(handle, attempt, "behov failed");
                    return Err(KalkulatorError::BehovFailed {
                        handle: handle.to_string(),
                    });
                }
                StatusProbe::Pending => debug!(handle, attempt, "behov pending"),
                StatusProbe::Unreadable(reason) => {
                    debug!(handle, attempt, reason = %reason, "unreadable status, retrying")
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(gave_up(handle, attempt, started));
            }
            sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// One status request against `handle`.
    pub async fn status(&self, handle: &str) -> Result<StatusProbe, KalkulatorError> {
        let response = self.client.get(handle).await?;
        let status = response.status();

        if status.is_redirection() {
            return match location(&response) {
                Some(result_uri) => Ok(StatusProbe::Done { result_uri }),
                None => Err(KalkulatorError::MissingLocation {
                    url: response.url().to_string(),
                }),
            };
        }
        if !status.is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response.bytes().await?;
        let envelope = match serde_json::from_slice::<StatusEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(StatusProbe::Unreadable(e.to_string())),
        };

        Ok(match envelope.status {
            Some(BehovStatus::Pending) => StatusProbe::Pending,
            Some(BehovStatus::Failed) => StatusProbe::Failed,
            Some(BehovStatus::Done) => StatusProbe::Done {
                result_uri: envelope.location.unwrap_or_else(|| handle.to_string()),
            },
            Some(BehovStatus::Unknown) => StatusProbe::Unreadable("unknown status".to_string()),
            None => StatusProbe::Unreadable("missing status".to_string()),
        })
    }
}

fn gave_up(handle: &str, attempt: u32, started: Instant) -> KalkulatorError {
    let waited_ms = started.elapsed().as_millis() as u64;
    warn!(handle, attempt, waited_ms, "gave up waiting for behov");
    KalkulatorError::IncompleteResult {
        handle: handle.to_string(),
        waited_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::token::StaticTokenProvider;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HANDLE: &str = "/behov/status/123";

    fn poller(server: &MockServer) -> BehovStatusPoller<StaticTokenProvider> {
        let client = RegelApiClient::new(
            crate::regelapi::build_http_client(Duration::from_secs(5)).unwrap(),
            server.uri(),
            Arc::new(StaticTokenProvider::new("testToken")),
        );
        let config = PollConfig::new(Duration::from_millis(300), Duration::from_millis(20)).unwrap();
        BehovStatusPoller::new(client, config)
    }

    fn status_body(status: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": status }))
    }

    #[test]
    fn poll_config_rejects_zero_durations() {
        assert!(PollConfig::new(Duration::ZERO, Duration::from_millis(10)).is_err());
        assert!(PollConfig::new(Duration::from_secs(1), Duration::ZERO).is_err());
        let default = PollConfig::default();
        assert_eq!(default.max_wait, Duration::from_secs(20));
        assert_eq!(default.poll_interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn pending_then_done_resolves_to_handle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .and(header("Authorization", "Bearer testToken"))
            .respond_with(status_body("PENDING"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("DONE"))
            .expect(1)
            .mount(&server)
            .await;

        let done = poller(&server).poll(HANDLE).await.unwrap();
        assert_eq!(done.handle, HANDLE);
        assert_eq!(done.result_uri, HANDLE);
    }

    #[tokio::test]
    async fn see_other_redirect_points_at_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(ResponseTemplate::new(303).insert_header("Location", "/subsumsjon/112233"))
            .mount(&server)
            .await;

        let done = poller(&server).poll(HANDLE).await.unwrap();
        assert_eq!(done.result_uri, "/subsumsjon/112233");
    }

    #[tokio::test]
    async fn done_body_with_location_uses_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "DONE",
                "location": "/subsumsjon/9"
            })))
            .mount(&server)
            .await;

        let done = poller(&server).poll(HANDLE).await.unwrap();
        assert_eq!(done.result_uri, "/subsumsjon/9");
    }

    #[tokio::test]
    async fn failed_status_stops_polling_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("FAILED"))
            .expect(1)
            .mount(&server)
            .await;

        let err = poller(&server).poll(HANDLE).await.unwrap_err();
        assert!(matches!(err, KalkulatorError::BehovFailed { .. }));
        assert_eq!(err.kind(), ErrorKind::DownstreamClient);
    }

    #[tokio::test]
    async fn pending_until_budget_elapses_is_incomplete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("PENDING"))
            .mount(&server)
            .await;

        let max_wait = Duration::from_millis(200);
        let interval = Duration::from_millis(50);
        let poller = poller(&server);
        let started = std::time::Instant::now();
        let err = poller
            .await_completion(HANDLE, max_wait, interval)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(err.kind(), ErrorKind::IncompleteResult);
        assert!(elapsed >= max_wait, "gave up after {elapsed:?}");
        assert!(elapsed <= max_wait + interval, "{elapsed:?}");
    }

    #[tokio::test]
    async fn slow_status_endpoint_is_cut_off_at_the_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("PENDING").set_delay(Duration::from_millis(1500)))
            .mount(&server)
            .await;

        let max_wait = Duration::from_millis(200);
        let interval = Duration::from_millis(50);
        let poller = poller(&server);
        let started = std::time::Instant::now();
        let err = poller
            .await_completion(HANDLE, max_wait, interval)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, KalkulatorError::IncompleteResult { .. }));
        assert!(elapsed >= max_wait, "gave up after {elapsed:?}");
        assert!(elapsed <= max_wait + interval, "{elapsed:?}");
    }

    #[tokio::test]
    async fn malformed_status_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"stat"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("DONE"))
            .mount(&server)
            .await;

        let done = poller(&server).poll(HANDLE).await.unwrap();
        assert_eq!(done.result_uri, HANDLE);
    }

    #[tokio::test]
    async fn server_error_is_a_downstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let err = poller(&server).poll(HANDLE).await.unwrap_err();
        assert!(matches!(err, KalkulatorError::DownstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn single_probe_reports_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(HANDLE))
            .respond_with(status_body("PENDING"))
            .mount(&server)
            .await;

        assert_eq!(poller(&server).status(HANDLE).await.unwrap(), StatusProbe::Pending);
    }
}
