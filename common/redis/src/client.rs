use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::{Client, CustomRedisError};

pub struct RedisClient {
    connection: MultiplexedConnection,
    ttl: Option<Duration>,
}

impl RedisClient {
    /// Create a new RedisClient with default settings
    ///
    /// Defaults:
    /// - TTL: None (values live until overwritten or evicted by redis)
    /// - Timeouts: None (blocks indefinitely)
    pub async fn new(addr: String) -> Result<RedisClient, CustomRedisError> {
        Self::with_config(addr, None, None, None).await
    }

    /// Create a new RedisClient with full configuration control
    ///
    /// # Arguments
    /// * `addr` - Redis connection string
    /// * `ttl` - Optional expiry applied to every `set`. Freshness of cached values is owned
    ///   here, not by the callers writing them.
    /// * `response_timeout` - Optional timeout for Redis command responses. `None` means no timeout.
    /// * `connection_timeout` - Optional timeout for establishing connections. `None` means no timeout.
    ///
    /// # Errors
    /// Returns `CustomRedisError::InvalidConfiguration` if `Some(Duration::ZERO)` is passed for
    /// any of the durations - use `None` instead.
    pub async fn with_config(
        addr: String,
        ttl: Option<Duration>,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)?;

        for (name, value) in [
            ("TTL", ttl),
            ("response timeout", response_timeout),
            ("connection timeout", connection_timeout),
        ] {
            if value.is_some_and(|d| d.is_zero()) {
                return Err(CustomRedisError::InvalidConfiguration(format!(
                    "Redis {name} cannot be Duration::ZERO - use None instead"
                )));
            }
        }

        let mut config = redis::AsyncConnectionConfig::new();

        if let Some(timeout) = response_timeout {
            config = config.set_response_timeout(timeout);
        }

        if let Some(timeout) = connection_timeout {
            config = config.set_connection_timeout(timeout);
        }

        let connection = client
            .get_multiplexed_async_connection_with_config(&config)
            .await?;

        Ok(RedisClient { connection, ttl })
    }
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        let mut conn = self.connection.clone();
        let raw_bytes: Option<Vec<u8>> = conn.get(k).await?;

        match raw_bytes {
            Some(bytes) if !bytes.is_empty() => Ok(String::from_utf8(bytes)?),
            _ => Err(CustomRedisError::NotFound),
        }
    }

    async fn set(&self, k: String, v: String) -> Result<(), CustomRedisError> {
        let mut conn = self.connection.clone();
        match self.ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(k, v, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(k, v).await?,
        }
        Ok(())
    }
}
