use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::outcomes::categories::{CampaignCategoryConfig, CategoryMap};
use crate::outcomes::classifier::{classify, classify_for_campaign, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum CategoryFetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Category endpoint returned status {0}")]
    Status(u16),
    #[error("Failed to decode category payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Immutable view of the category configuration at one point in time
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySnapshot {
    pub version: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub campaigns: CategoryMap,
}

impl CategorySnapshot {
    /// Classify `label` against this snapshot, scoped to `campaign_id` when given
    pub fn classify(&self, label: &str, campaign_id: Option<&str>) -> Outcome {
        match campaign_id {
            Some(id) => classify_for_campaign(label, id, &self.campaigns),
            None => classify(label, &self.campaigns),
        }
    }
}

/// Shared holder for the latest category configuration
///
/// Readers get an `Arc` to the current snapshot and classify against it without holding the lock;
/// refreshes swap in a new snapshot with the next version number.
#[derive(Debug, Clone, Default)]
pub struct CategoryCache {
    current: Arc<RwLock<Arc<CategorySnapshot>>>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(campaigns: CategoryMap) -> Self {
        let cache = Self::new();
        cache.replace(campaigns);
        cache
    }

    pub fn snapshot(&self) -> Arc<CategorySnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install a new configuration; returns the new version
    pub fn replace(&self, campaigns: CategoryMap) -> u64 {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let version = guard.version + 1;
        *guard = Arc::new(CategorySnapshot {
            version,
            fetched_at: Some(Utc::now()),
            campaigns,
        });
        version
    }

    /// Classify against the current snapshot, optionally scoped to one campaign
    pub fn classify(&self, label: &str, campaign_id: Option<&str>) -> Outcome {
        self.snapshot().classify(label, campaign_id)
    }
}

pub const DEFAULT_CATEGORY_TIMEOUT_SECS: u64 = 30;

/// Payload shapes the category endpoint may return
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryPayload {
    Aggregate(Vec<CampaignCategoryConfig>),
    Single(CampaignCategoryConfig),
}

/// Fetches campaign category configuration from the configuration endpoint
#[derive(Clone)]
pub struct CategoryFetcher {
    client: reqwest::Client,
    url: String,
}

impl CategoryFetcher {
    pub fn new(url: String) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_CATEGORY_TIMEOUT_SECS))
    }

    /// A stalled endpoint fails after `timeout` instead of blocking the refresh loop
    pub fn with_timeout(url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            url,
        }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_categories(&self) -> Result<CategoryMap, CategoryFetchError> {
        debug!("Sending HTTP request to category endpoint");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            return Err(CategoryFetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let map = parse_categories(&body)?;
        info!("Fetched categories for {} campaigns", map.len());
        Ok(map)
    }
}

/// Decode either a single campaign object or an array of them
pub fn parse_categories(body: &str) -> Result<CategoryMap, serde_json::Error> {
    let map: CategoryMap = match serde_json::from_str::<CategoryPayload>(body)? {
        CategoryPayload::Aggregate(configs) => configs.into_iter().collect(),
        CategoryPayload::Single(config) => std::iter::once(config).collect(),
    };
    Ok(map)
}
