use common_redis::CustomRedisError;
use http::StatusCode;
use thiserror::Error;

/// Failures of a single source invocation. Every variant is fatal for the call.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("expected an array of elements at data path {data_path:?}, found {found}")]
    MalformedResponseShape {
        data_path: String,
        found: &'static str,
    },
    #[error("upstream request failed: {0}")]
    TransportFailure(#[from] TransportError),
    #[error("cached value for {key:?} could not be parsed")]
    CacheCorruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache unavailable: {0}")]
    CacheUnavailable(#[source] CustomRedisError),
}

impl FetchError {
    /// Stable label used for metric tags
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MalformedResponseShape { .. } => "malformed_response_shape",
            FetchError::TransportFailure(_) => "transport_failure",
            FetchError::CacheCorruption { .. } => "cache_corruption",
            FetchError::CacheUnavailable(_) => "cache_unavailable",
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid request headers: {0}")]
    InvalidHeaders(#[source] http::Error),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("upstream responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a source named {0:?} already exists")]
    DuplicateName(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
