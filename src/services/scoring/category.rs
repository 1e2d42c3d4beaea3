use serde::{Deserialize, Serialize};

/// Closed catalog of scoring categories
///
/// Acts as the join key between scorer instances, weight table entries, and
/// the per-post score breakdown. `TimeDecay` is the decay-rate knob in the
/// weight table, not a scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreCategory {
    Chaos,
    Diversity,
    FavouritedAccounts,
    FollowedTags,
    InteractedAccounts,
    MostRepliedAccounts,
    RetootedAccounts,
    NumFavourites,
    NumReplies,
    NumRetoots,
    RetootsInFeed,
    ImageAttachments,
    VideoAttachments,
    TrendingTags,
    TrendingToots,
    TimeDecay,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 16] = [
        Self::Chaos,
        Self::Diversity,
        Self::FavouritedAccounts,
        Self::FollowedTags,
        Self::InteractedAccounts,
        Self::MostRepliedAccounts,
        Self::RetootedAccounts,
        Self::NumFavourites,
        Self::NumReplies,
        Self::NumRetoots,
        Self::RetootsInFeed,
        Self::ImageAttachments,
        Self::VideoAttachments,
        Self::TrendingTags,
        Self::TrendingToots,
        Self::TimeDecay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chaos => "chaos",
            Self::Diversity => "diversity",
            Self::FavouritedAccounts => "favouritedAccounts",
            Self::FollowedTags => "followedTags",
            Self::InteractedAccounts => "interactedAccounts",
            Self::MostRepliedAccounts => "mostRepliedAccounts",
            Self::RetootedAccounts => "retootedAccounts",
            Self::NumFavourites => "numFavourites",
            Self::NumReplies => "numReplies",
            Self::NumRetoots => "numRetoots",
            Self::RetootsInFeed => "retootsInFeed",
            Self::ImageAttachments => "imageAttachments",
            Self::VideoAttachments => "videoAttachments",
            Self::TrendingTags => "trendingTags",
            Self::TrendingToots => "trendingToots",
            Self::TimeDecay => "timeDecay",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Chaos => "Random jitter so the feed never goes fully stale",
            Self::Diversity => "Tally of how often this author has already been scored this pass",
            Self::FavouritedAccounts => "Favour posts from accounts you favourite most",
            Self::FollowedTags => "Favour posts tagged with hashtags you follow",
            Self::InteractedAccounts => "Favour accounts appearing in your recent notifications",
            Self::MostRepliedAccounts => "Favour accounts you reply to most",
            Self::RetootedAccounts => "Favour accounts you boost most",
            Self::NumFavourites => "Favour posts with many favourites",
            Self::NumReplies => "Favour posts with many replies",
            Self::NumRetoots => "Favour posts boosted many times",
            Self::RetootsInFeed => "Favour posts boosted by multiple accounts in your feed",
            Self::ImageAttachments => "Favour posts with image attachments",
            Self::VideoAttachments => "Favour posts with video attachments",
            Self::TrendingTags => "Favour posts carrying tags trending across servers",
            Self::TrendingToots => "Favour posts trending across servers",
            Self::TimeDecay => "How quickly scores of older posts decay",
        }
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            Self::Chaos => 1.0,
            Self::Diversity => -1.0,
            Self::FavouritedAccounts => 1.0,
            Self::FollowedTags => 2.0,
            Self::InteractedAccounts => 1.5,
            Self::MostRepliedAccounts => 1.0,
            Self::RetootedAccounts => 1.5,
            Self::NumFavourites => 0.1,
            Self::NumReplies => 0.2,
            Self::NumRetoots => 0.1,
            Self::RetootsInFeed => 1.0,
            Self::ImageAttachments => 0.3,
            Self::VideoAttachments => 0.5,
            Self::TrendingTags => 0.5,
            Self::TrendingToots => 1.0,
            Self::TimeDecay => 0.05,
        }
    }

    /// Lower validation bound for this category's weight, if any
    pub fn min_value(&self) -> Option<f64> {
        match self {
            // Negative diversity weights are the point; no lower bound
            Self::Diversity => None,
            Self::TimeDecay => Some(0.001),
            _ => Some(0.0),
        }
    }

    /// Whether a scorer instance exists for this category
    pub fn is_scorer(&self) -> bool {
        !matches!(self, Self::TimeDecay)
    }
}

impl std::fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-facing metadata for one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub description: &'static str,
    pub default_weight: f64,
    pub min_value: Option<f64>,
}

impl CategoryInfo {
    pub fn for_category(category: ScoreCategory) -> Self {
        Self {
            description: category.description(),
            default_weight: category.default_weight(),
            min_value: category.min_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_consistent() {
        for category in ScoreCategory::ALL {
            assert!(!category.as_str().is_empty());
            assert!(!category.description().is_empty());
            if let Some(min) = category.min_value() {
                assert!(
                    category.default_weight() >= min,
                    "default weight for {} below its own bound",
                    category
                );
            }
        }
    }

    #[test]
    fn test_time_decay_is_not_a_scorer() {
        assert!(!ScoreCategory::TimeDecay.is_scorer());
        assert!(ScoreCategory::Chaos.is_scorer());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&ScoreCategory::FavouritedAccounts).unwrap();
        assert_eq!(json, "\"favouritedAccounts\"");
        let back: ScoreCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ScoreCategory::FavouritedAccounts);
    }
}
