use std::sync::Arc;

use anyhow::Context;
use envconfig::Envconfig;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common_redis::RedisClient;
use device_sources::config::Config;
use device_sources::refresh::refresh_all;
use device_sources::store::PgSourceStore;
use device_sources::transport::HttpTransport;
use device_sources::CachedFetcher;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init_from_env().context("Invalid configuration")?;

    let log_layer = {
        let base_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true);

        if *config.debug {
            base_layer
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_ansi(true)
                .with_filter(env_filter())
                .boxed()
        } else {
            base_layer.json().with_filter(env_filter()).boxed()
        }
    };
    tracing_subscriber::registry().with(log_layer).init();

    let store = PgSourceStore::connect(&config.database_url, config.max_pg_connections)
        .await
        .context("failed to connect to postgres")?;
    store.migrate().await.context("failed to run migrations")?;

    let cache = RedisClient::with_config(
        config.redis_url.clone(),
        config.cache_ttl(),
        config.redis_response_timeout(),
        config.redis_connection_timeout(),
    )
    .await
    .context("failed to create redis client")?;

    let transport = HttpTransport::with_timeout(config.request_timeout())
        .context("failed to build http client")?;

    let fetcher = CachedFetcher::new(Arc::new(cache), Arc::new(transport));

    let outcomes = refresh_all(&store, &fetcher)
        .await
        .context("failed to load sources")?;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(total = outcomes.len(), failed, "refresh finished");

    if failed > 0 {
        anyhow::bail!("{failed} of {} sources failed to refresh", outcomes.len());
    }

    Ok(())
}
