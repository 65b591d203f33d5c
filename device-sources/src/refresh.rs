use tracing::instrument;

use crate::cached_fetcher::{CachedFetcher, FetchSource};
use crate::error::{FetchError, StoreError};
use crate::store::SourceStore;

#[derive(Debug)]
pub struct RefreshOutcome {
    pub source: String,
    pub result: Result<(usize, FetchSource), FetchError>,
}

impl RefreshOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Invoke every stored source once, in store order.
///
/// A failing source is reported in its outcome; the remaining sources still run.
/// Only failing to list the sources aborts the refresh.
#[instrument(skip_all)]
pub async fn refresh_all(
    store: &dyn SourceStore,
    fetcher: &CachedFetcher,
) -> Result<Vec<RefreshOutcome>, StoreError> {
    let sources = store.find_all().await?;
    tracing::info!("refreshing {} sources", sources.len());

    let mut outcomes = Vec::with_capacity(sources.len());
    for source in &sources {
        let result = fetcher
            .invoke_detailed(source)
            .await
            .map(|fetched| (fetched.records.len(), fetched.source));

        // failures are already logged by the fetcher
        if let Ok((count, from)) = &result {
            tracing::info!(
                source = %source.name,
                records = count,
                from = %from,
                "source refreshed"
            );
        }

        outcomes.push(RefreshOutcome {
            source: source.name.clone(),
            result,
        });
    }

    Ok(outcomes)
}
