/// Outcome Classifier
///
/// Maps a free-text call outcome label to success / declined / open using a campaign category
/// configuration. Labels on both sides are normalized (trimmed, lowercased, spaces replaced by
/// underscores) so `"  Kein Interesse "` matches a configured `"kein_interesse"`.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outcomes::categories::{CampaignCategories, CategoryMap};

/// Semantic bucket of an outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Positive,
    Negative,
    /// Unresolved: not configured, configured as open, or no configuration at all
    Offen,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Positive => "positive",
            Outcome::Negative => "negative",
            Outcome::Offen => "offen",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a label: trimmed, lowercased, every space replaced by `_`
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Classify a label against every campaign in `categories`, first matching campaign wins
///
/// Two campaigns may use one label with different meanings; pass a map scoped to the relevant
/// campaign (see [`classify_for_campaign`]) when that matters.
pub fn classify(label: &str, categories: &CategoryMap) -> Outcome {
    let needle = normalize_label(label);
    categories
        .iter()
        .find_map(|(_, campaign)| match_campaign(&needle, campaign))
        .unwrap_or(Outcome::Offen)
}

/// Classify a label using only the categories of `campaign_id`; unknown campaigns yield `Offen`
pub fn classify_for_campaign(label: &str, campaign_id: &str, categories: &CategoryMap) -> Outcome {
    let needle = normalize_label(label);
    categories
        .get(campaign_id)
        .and_then(|campaign| match_campaign(&needle, campaign))
        .unwrap_or(Outcome::Offen)
}

fn match_campaign(needle: &str, campaign: &CampaignCategories) -> Option<Outcome> {
    let contains = |labels: &[String]| labels.iter().any(|l| normalize_label(l) == needle);

    if contains(&campaign.success) {
        Some(Outcome::Positive)
    } else if contains(&campaign.declined) {
        Some(Outcome::Negative)
    } else if contains(&campaign.open) {
        Some(Outcome::Offen)
    } else {
        None
    }
}
