use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// Re-exported so consumers can construct CustomRedisError in tests
pub use redis::ErrorKind as RedisErrorKind;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl From<std::string::FromUtf8Error> for CustomRedisError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        CustomRedisError::ParseError(err.to_string())
    }
}

impl CustomRedisError {
    /// Create a Redis error from an ErrorKind (primarily for testing)
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    /// Short, stable label for logs and metric tags
    pub fn kind(&self) -> &'static str {
        match self {
            CustomRedisError::NotFound => "not_found",
            CustomRedisError::InvalidConfiguration(_) => "invalid_configuration",
            CustomRedisError::ParseError(_) => "parse_error",
            CustomRedisError::Timeout => "timeout",
            CustomRedisError::Redis(_) => "redis",
        }
    }
}

/// String key-value cache. Values are stored as UTF-8.
///
/// `get` reports a missing key as `CustomRedisError::NotFound` rather than an
/// empty value, so callers can tell a miss apart from an infrastructure failure.
#[async_trait]
pub trait Client {
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;
    async fn set(&self, k: String, v: String) -> Result<(), CustomRedisError>;
}

mod client;
mod mock;

pub use client::RedisClient;
pub use mock::{MockRedisCall, MockRedisClient, MockRedisValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(CustomRedisError::NotFound.kind(), "not_found");
        assert_eq!(CustomRedisError::Timeout.kind(), "timeout");
        assert_eq!(
            CustomRedisError::ParseError("bad".to_string()).kind(),
            "parse_error"
        );
        assert_eq!(
            CustomRedisError::from_redis_kind(RedisErrorKind::IoError, "connection refused")
                .kind(),
            "redis"
        );
    }

    #[test]
    fn test_utf8_error_becomes_parse_error() {
        let err = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let converted: CustomRedisError = err.into();
        assert!(matches!(converted, CustomRedisError::ParseError(_)));
    }

    #[test]
    fn test_timeout_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let redis_err = redis::RedisError::from(io);
        let converted: CustomRedisError = redis_err.into();
        assert!(matches!(converted, CustomRedisError::Timeout));
    }
}
