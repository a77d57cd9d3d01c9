use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no results found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] citescope_core::CitescopeError),

    #[error("seed {identifier} could not be fetched: {reason}")]
    SeedFailed { identifier: String, reason: String },
}

impl ScienceError {
    /// Classify a reqwest failure, separating timeouts from other transport errors.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;
