// Call outcome classification
//
// Outcome labels are campaign specific free text. Each campaign configures which labels count as
// success, declined or open; the configuration is fetched from an external endpoint and cached.

pub mod categories;
pub mod category_cache;
pub mod classifier;

pub use categories::{CampaignCategories, CampaignCategoryConfig, CategoryMap};
pub use category_cache::{CategoryCache, CategoryFetchError, CategoryFetcher, CategorySnapshot};
pub use classifier::{classify, classify_for_campaign, normalize_label, Outcome};
