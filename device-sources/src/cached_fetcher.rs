//! Cache-aside fetching of normalized records.
//!
//! One invocation walks `CHECK_CACHE -> (hit) DONE` or
//! `CHECK_CACHE -> FETCH -> NORMALIZE -> POPULATE_CACHE -> DONE`. Any failure ends the
//! invocation and is returned to the caller; nothing is retried here.
//!
//! Two concurrent misses for the same source both fetch and both write; the last write wins.

use std::fmt;
use std::sync::Arc;

use common_redis::{Client as RedisClient, CustomRedisError};
use serde_json::Value;
use tracing::instrument;

use crate::error::FetchError;
use crate::metrics_consts::{
    CACHE_LOOKUPS_COUNTER, CACHE_WRITE_ERRORS_COUNTER, FETCH_ERRORS_COUNTER,
    RECORDS_NORMALIZED_COUNTER, UPSTREAM_REQUESTS_COUNTER,
};
use crate::normalizer::normalize;
use crate::record::CanonicalRecord;
use crate::source::{RequestMethod, SourceDescriptor};
use crate::transport::Transport;

/// Where the records of an invocation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Served from the cache, upstream untouched
    Cache,
    /// Fetched and normalized; `cache_populated` is false if the cache write failed
    Upstream { cache_populated: bool },
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchSource::Cache => write!(f, "cache"),
            FetchSource::Upstream {
                cache_populated: true,
            } => write!(f, "upstream"),
            FetchSource::Upstream {
                cache_populated: false,
            } => write!(f, "upstream_uncached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub records: Vec<CanonicalRecord>,
    pub source: FetchSource,
}

impl FetchResult {
    pub fn was_cached(&self) -> bool {
        matches!(self.source, FetchSource::Cache)
    }
}

pub struct CachedFetcher {
    cache: Arc<dyn RedisClient + Send + Sync>,
    transport: Arc<dyn Transport>,
}

impl CachedFetcher {
    pub fn new(cache: Arc<dyn RedisClient + Send + Sync>, transport: Arc<dyn Transport>) -> Self {
        Self { cache, transport }
    }

    /// Normalized records for `source`, from the cache when present.
    pub async fn invoke(
        &self,
        source: &SourceDescriptor,
    ) -> Result<Vec<CanonicalRecord>, FetchError> {
        self.invoke_detailed(source).await.map(|result| result.records)
    }

    /// Like [`CachedFetcher::invoke`], also reporting whether the cache answered.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn invoke_detailed(
        &self,
        source: &SourceDescriptor,
    ) -> Result<FetchResult, FetchError> {
        let result = self.run(source).await;
        if let Err(e) = &result {
            tracing::error!("failed to fetch records for source {}: {}", source.name, e);
            metrics::counter!(FETCH_ERRORS_COUNTER, "kind" => e.kind()).increment(1);
        }
        result
    }

    async fn run(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
        let key = source.cache_key();

        if let Some(records) = self.check_cache(key).await? {
            tracing::debug!("cache hit for source {}", source.name);
            metrics::counter!(CACHE_LOOKUPS_COUNTER, "outcome" => "hit").increment(1);
            return Ok(FetchResult {
                records,
                source: FetchSource::Cache,
            });
        }
        metrics::counter!(CACHE_LOOKUPS_COUNTER, "outcome" => "miss").increment(1);

        let body = self.request(source).await?;
        let records = normalize(&body, &source.data_path, &source.mapping)?;
        metrics::counter!(RECORDS_NORMALIZED_COUNTER).increment(records.len() as u64);

        let cache_populated = self.populate_cache(key, &records).await;

        Ok(FetchResult {
            records,
            source: FetchSource::Upstream { cache_populated },
        })
    }

    /// Raw upstream body, bypassing cache and normalization.
    #[instrument(skip_all, fields(source = %source.name))]
    pub async fn fetch_raw(&self, source: &SourceDescriptor) -> Result<Value, FetchError> {
        self.request(source).await.map_err(|e| {
            tracing::error!("failed to fetch raw body for source {}: {}", source.name, e);
            metrics::counter!(FETCH_ERRORS_COUNTER, "kind" => e.kind()).increment(1);
            e
        })
    }

    async fn check_cache(&self, key: &str) -> Result<Option<Vec<CanonicalRecord>>, FetchError> {
        match self.cache.get(key.to_string()).await {
            Ok(serialized) => serde_json::from_str(&serialized)
                .map(Some)
                .map_err(|e| FetchError::CacheCorruption {
                    key: key.to_string(),
                    source: e,
                }),
            Err(CustomRedisError::NotFound) => Ok(None),
            Err(e) => Err(FetchError::CacheUnavailable(e)),
        }
    }

    async fn request(&self, source: &SourceDescriptor) -> Result<Value, FetchError> {
        metrics::counter!(UPSTREAM_REQUESTS_COUNTER, "method" => source.request_method.to_string())
            .increment(1);

        let body = match source.request_method {
            RequestMethod::Get => {
                self.transport
                    .get(&source.url, &source.custom_headers)
                    .await?
            }
            RequestMethod::Post => {
                self.transport
                    .post(&source.url, &source.custom_headers, &source.request_body)
                    .await?
            }
        };
        Ok(body)
    }

    /// Best effort: a failed write is logged and reported, never returned as an error.
    async fn populate_cache(&self, key: &str, records: &[CanonicalRecord]) -> bool {
        let serialized = match serde_json::to_string(records) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::warn!("failed to serialize records for cache key {}: {}", key, e);
                metrics::counter!(CACHE_WRITE_ERRORS_COUNTER, "reason" => "serialize")
                    .increment(1);
                return false;
            }
        };

        match self.cache.set(key.to_string(), serialized).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to update cache for key {}: {:?}", key, e);
                metrics::counter!(CACHE_WRITE_ERRORS_COUNTER, "reason" => e.kind()).increment(1);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CanonicalField, MappingSpec, PathSpec};
    use crate::transport::MockTransport;
    use common_redis::MockRedisClient;
    use http::StatusCode;
    use serde_json::json;

    fn sensor_source() -> SourceDescriptor {
        let mapping = MappingSpec::default()
            .with(CanonicalField::Id, PathSpec::path("external_id"))
            .with(CanonicalField::Longitude, PathSpec::path("coords.lng"))
            .with(CanonicalField::Categories, PathSpec::constant(json!(["sensor"])));
        SourceDescriptor::new("sensors", "http://upstream.test/devices").with_mapping(mapping)
    }

    fn upstream_body() -> Value {
        json!([
            {"external_id": "A1", "coords": {"lng": 12.5}},
            {"external_id": "B2", "coords": {"lng": -1.0}},
        ])
    }

    fn setup(cache: MockRedisClient, transport: MockTransport) -> CachedFetcher {
        CachedFetcher::new(Arc::new(cache), Arc::new(transport))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let cached = vec![CanonicalRecord {
            id: Some(json!("cached")),
            ..Default::default()
        }];
        let cache = MockRedisClient::new()
            .with_value("sensors", serde_json::to_string(&cached).unwrap());
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache.clone(), transport.clone());

        let result = fetcher.invoke_detailed(&sensor_source()).await.unwrap();

        assert_eq!(result.records, cached);
        assert!(result.was_cached());
        assert_eq!(transport.call_count(), 0);
        assert!(cache.calls_for("set").is_empty());
    }

    #[tokio::test]
    async fn test_miss_fetches_once_and_populates() {
        let cache = MockRedisClient::new();
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache.clone(), transport.clone());
        let source = sensor_source();

        let first = fetcher.invoke_detailed(&source).await.unwrap();
        assert_eq!(
            first.source,
            FetchSource::Upstream {
                cache_populated: true
            }
        );
        assert_eq!(first.records.len(), 2);
        assert_eq!(transport.call_count(), 1);

        let stored: Vec<CanonicalRecord> =
            serde_json::from_str(&cache.stored("sensors").unwrap()).unwrap();
        assert_eq!(stored, first.records);

        let second = fetcher.invoke_detailed(&source).await.unwrap();
        assert!(second.was_cached());
        assert_eq!(second.records, first.records);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_cache_value_is_a_miss() {
        let cache = MockRedisClient::new().with_value("sensors", "");
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache.clone(), transport.clone());

        let result = fetcher.invoke_detailed(&sensor_source()).await.unwrap();

        assert_eq!(
            result.source,
            FetchSource::Upstream {
                cache_populated: true
            }
        );
        assert_eq!(result.records.len(), 2);
        assert_eq!(transport.call_count(), 1);

        let stored: Vec<CanonicalRecord> =
            serde_json::from_str(&cache.stored("sensors").unwrap()).unwrap();
        assert_eq!(stored, result.records);
    }

    #[tokio::test]
    async fn test_corrupt_cache_fails_without_refetch() {
        let cache = MockRedisClient::new().with_value("sensors", "{not json");
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache, transport.clone());

        match fetcher.invoke(&sensor_source()).await {
            Err(FetchError::CacheCorruption { key, .. }) => assert_eq!(key, "sensors"),
            other => panic!("Expected CacheCorruption, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_read_failure_is_fatal() {
        let mut cache = MockRedisClient::new();
        cache.get_ret("sensors", Err(CustomRedisError::Timeout));
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache, transport.clone());

        match fetcher.invoke(&sensor_source()).await {
            Err(FetchError::CacheUnavailable(CustomRedisError::Timeout)) => (),
            other => panic!("Expected CacheUnavailable, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_records() {
        let mut cache = MockRedisClient::new();
        cache.set_ret(
            "sensors",
            Err(CustomRedisError::from_redis_kind(
                common_redis::RedisErrorKind::IoError,
                "connection reset",
            )),
        );
        let fetcher = setup(cache.clone(), MockTransport::responding(upstream_body()));

        let result = fetcher.invoke_detailed(&sensor_source()).await.unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.source,
            FetchSource::Upstream {
                cache_populated: false
            }
        );
        assert_eq!(result.source.to_string(), "upstream_uncached");
        assert_eq!(cache.stored("sensors"), None);
    }

    #[tokio::test]
    async fn test_transport_failure_writes_nothing() {
        let cache = MockRedisClient::new();
        let transport = MockTransport::failing(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let fetcher = setup(cache.clone(), transport.clone());

        let err = fetcher.invoke(&sensor_source()).await.unwrap_err();

        assert!(matches!(err, FetchError::TransportFailure(_)));
        assert_eq!(transport.call_count(), 1);
        assert!(cache.calls_for("set").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_shape_writes_nothing() {
        let cache = MockRedisClient::new();
        let transport = MockTransport::responding(json!({"data": {"count": 3}}));
        let fetcher = setup(cache.clone(), transport);
        let source = sensor_source().with_data_path("data.count");

        match fetcher.invoke(&source).await {
            Err(FetchError::MalformedResponseShape { found, .. }) => assert_eq!(found, "number"),
            other => panic!("Expected MalformedResponseShape, got {other:?}"),
        }
        assert!(cache.calls_for("set").is_empty());
    }

    #[tokio::test]
    async fn test_post_source_uses_body_and_headers() {
        let transport = MockTransport::responding(json!({"result": upstream_body()}));
        let fetcher = setup(MockRedisClient::new(), transport.clone());
        let source = sensor_source()
            .with_post_body("{\"all\":true}")
            .with_header("x-api-key", "k")
            .with_data_path("result");

        let records = fetcher.invoke(&source).await.unwrap();

        assert_eq!(records.len(), 2);
        let calls = transport.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, http::Method::POST);
        assert_eq!(calls[0].url, "http://upstream.test/devices");
        assert_eq!(calls[0].body.as_deref(), Some("{\"all\":true}"));
        assert_eq!(calls[0].headers["x-api-key"], "k");
    }

    #[tokio::test]
    async fn test_fetch_raw_bypasses_cache() {
        let cache = MockRedisClient::new().with_value("sensors", "[]");
        let transport = MockTransport::responding(upstream_body());
        let fetcher = setup(cache.clone(), transport.clone());

        let raw = fetcher.fetch_raw(&sensor_source()).await.unwrap();

        assert_eq!(raw, upstream_body());
        assert_eq!(transport.call_count(), 1);
        assert!(cache.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_cache_key_is_source_name() {
        let cache = MockRedisClient::new();
        let fetcher = setup(cache.clone(), MockTransport::responding(json!([])));

        fetcher
            .invoke(&SourceDescriptor::new("parking-lots", "http://upstream.test/"))
            .await
            .unwrap();

        let keys: Vec<String> = cache.get_calls().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["parking-lots", "parking-lots"]);
        assert_eq!(cache.stored("parking-lots").as_deref(), Some("[]"));
    }
}
