use serde::{Deserialize, Serialize};

/// Outcome labels of one campaign, grouped by meaning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCategories {
    #[serde(default)]
    pub open: Vec<String>,
    #[serde(default, alias = "positive")]
    pub success: Vec<String>,
    #[serde(default, alias = "negative")]
    pub declined: Vec<String>,
}

/// Category configuration of a single campaign as served by the configuration endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCategoryConfig {
    pub campaign_id: String,
    pub categories: CampaignCategories,
}

/// Campaign categories keyed by campaign id, in the order they were supplied
///
/// Order matters: classification against several campaigns takes the first campaign that knows
/// a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap {
    campaigns: Vec<CampaignCategoryConfig>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a campaign; a replaced campaign keeps its position
    pub fn insert(&mut self, campaign_id: impl Into<String>, categories: CampaignCategories) {
        let campaign_id = campaign_id.into();
        match self.campaigns.iter_mut().find(|c| c.campaign_id == campaign_id) {
            Some(existing) => existing.categories = categories,
            None => self.campaigns.push(CampaignCategoryConfig {
                campaign_id,
                categories,
            }),
        }
    }

    pub fn get(&self, campaign_id: &str) -> Option<&CampaignCategories> {
        self.campaigns
            .iter()
            .find(|c| c.campaign_id == campaign_id)
            .map(|c| &c.categories)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CampaignCategories)> {
        self.campaigns
            .iter()
            .map(|c| (c.campaign_id.as_str(), &c.categories))
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Map restricted to one campaign
    pub fn scoped(&self, campaign_id: &str) -> CategoryMap {
        self.campaigns
            .iter()
            .filter(|c| c.campaign_id == campaign_id)
            .cloned()
            .collect()
    }
}

impl FromIterator<CampaignCategoryConfig> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = CampaignCategoryConfig>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for config in iter {
            map.insert(config.campaign_id, config.categories);
        }
        map
    }
}

impl<S: Into<String>> FromIterator<(S, CampaignCategories)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (S, CampaignCategories)>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for (campaign_id, categories) in iter {
            map.insert(campaign_id, categories);
        }
        map
    }
}
