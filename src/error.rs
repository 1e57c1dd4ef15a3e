//! Errors raised while calculating, and how they map onto HTTP statuses.

use thiserror::Error;

/// Every failure the calculation flow can surface to the boundary layer.
///
/// Variants carry enough detail for logging; [`KalkulatorError::kind`]
/// collapses them into the coarse categories the boundary maps to HTTP
/// statuses.
#[derive(Debug, Error)]
pub enum KalkulatorError {
    #[error("{url} returned status {status}: {message}")]
    DownstreamStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered without a usable Location header")]
    MissingLocation { url: String },

    #[error("behov {handle} failed in regel-api")]
    BehovFailed { handle: String },

    #[error("could not fetch access token: {0}")]
    Token(String),

    #[error("actor id lookup failed: {0}")]
    Oppslag(String),

    #[error("behov {handle} was not done after {waited_ms}ms")]
    IncompleteResult { handle: String, waited_ms: u64 },

    #[error("unexpected response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Not authenticated: {0}")]
    AuthenticationMissing(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse classification of a [`KalkulatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-2xx, transport failure or an explicit FAILED behov.
    DownstreamClient,
    /// The behov never reached DONE within the wait budget.
    IncompleteResult,
    /// A downstream payload did not have the expected shape.
    Parse,
    /// No caller identity was available.
    AuthenticationMissing,
    /// The caller supplied unusable input.
    InvalidRequest,
}

impl KalkulatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KalkulatorError::DownstreamStatus { .. }
            | KalkulatorError::Http(_)
            | KalkulatorError::MissingLocation { .. }
            | KalkulatorError::BehovFailed { .. }
            | KalkulatorError::Token(_)
            | KalkulatorError::Oppslag(_) => ErrorKind::DownstreamClient,
            KalkulatorError::IncompleteResult { .. } => ErrorKind::IncompleteResult,
            KalkulatorError::Parse { .. } => ErrorKind::Parse,
            KalkulatorError::AuthenticationMissing(_) => ErrorKind::AuthenticationMissing,
            KalkulatorError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// HTTP status the boundary layer answers with for this error.
    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::DownstreamClient | ErrorKind::Parse => 502,
            ErrorKind::IncompleteResult => 504,
            ErrorKind::AuthenticationMissing => 401,
            ErrorKind::InvalidRequest => 400,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DownstreamClient => write!(f, "DownstreamClient"),
            ErrorKind::IncompleteResult => write!(f, "IncompleteResult"),
            ErrorKind::Parse => write!(f, "Parse"),
            ErrorKind::AuthenticationMissing => write!(f, "AuthenticationMissing"),
            ErrorKind::InvalidRequest => write!(f, "InvalidRequest"),
        }
    }
}
