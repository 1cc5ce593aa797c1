//! Error types for fetching, caching and refreshing.
//!
//! None of these reach the request path: `Engine::classify` always answers.

/// A single fetch attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Response body could not be read")]
    InvalidBody,
    #[error("Blocking fetch worker failed: {0}")]
    WorkerPanicked(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            Self::InvalidBody
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// No usable rule data could be produced.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("No cached filter list and fetch failed: {source}")]
    Unavailable {
        #[source]
        source: FetchError,
    },
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A refresh cycle did not install a new rule set.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("A refresh is already in progress")]
    AlreadyRunning,
    #[error("Refresh worker has stopped")]
    WorkerStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
