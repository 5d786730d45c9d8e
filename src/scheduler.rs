use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::outcomes::{CategoryCache, CategoryFetchError, CategoryFetcher};

/// Retry schedule for one refresh: 1s -> 2s -> 4s, then give up until the next tick
pub fn default_refresh_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(30))
        .with_factor(2.0)
        .with_max_times(3)
}

#[instrument(skip(fetcher, cache), fields(interval_minutes = %interval_minutes))]
pub async fn start_category_refresh_scheduler(
    fetcher: CategoryFetcher,
    cache: CategoryCache,
    interval_minutes: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_minutes.max(1) * 60));

    info!(
        "Category refresh scheduler started with {} minute interval",
        interval_minutes
    );

    loop {
        interval.tick().await;
        debug!("Scheduler tick - refreshing campaign categories");

        match refresh_categories(&fetcher, &cache, default_refresh_backoff()).await {
            Ok(version) => info!("Campaign categories refreshed (version {})", version),
            Err(e) => error!(
                "Failed to refresh campaign categories, keeping version {}: {}",
                cache.snapshot().version,
                e
            ),
        }
    }
}

/// Fetch categories and swap them into the cache, retrying per `backoff`
///
/// On failure the cache keeps serving its previous snapshot.
pub async fn refresh_categories(
    fetcher: &CategoryFetcher,
    cache: &CategoryCache,
    backoff: impl BackoffBuilder,
) -> Result<u64, CategoryFetchError> {
    let mut delays = backoff.build();

    loop {
        match fetcher.fetch_categories().await {
            Ok(categories) => return Ok(cache.replace(categories)),
            Err(e) => match delays.next() {
                Some(delay) => {
                    warn!("Category fetch failed ({}), retrying in {:?}", e, delay);
                    time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}
