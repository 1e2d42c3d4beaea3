/// Feature Data Module
///
/// Defines the closed catalog of feature cache keys, the payloads the
/// external fetch collaborator returns for them, and the fetcher contract.
/// The cache itself lives in [`cache`].
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::Post;
use crate::services::trending::TrendingSignal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub mod cache;

pub use cache::{CacheEntry, CacheStats, FeatureCache};

/// Feature data keyed by account handle, tag name, or post uri
pub type FeatureMap = HashMap<String, f64>;

/// Closed catalog of feature cache keys
///
/// Account-derived keys refresh daily; trending keys refresh hourly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    /// Accounts the user favourites most, acct -> favourite count
    FavouritedAccounts,
    /// Tags the user follows, tag -> 1
    FollowedTags,
    /// Accounts appearing in the user's recent notifications, acct -> count
    InteractedAccounts,
    /// Accounts the user replies to most, acct -> reply count
    MostRepliedAccounts,
    /// Accounts the user boosts most, acct -> boost count
    RetootedAccounts,
    /// Trending tags gathered across servers
    TrendingTags,
    /// Trending posts gathered across servers
    TrendingToots,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 7] = [
        FeatureKey::FavouritedAccounts,
        FeatureKey::FollowedTags,
        FeatureKey::InteractedAccounts,
        FeatureKey::MostRepliedAccounts,
        FeatureKey::RetootedAccounts,
        FeatureKey::TrendingTags,
        FeatureKey::TrendingToots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FavouritedAccounts => "favouritedAccounts",
            Self::FollowedTags => "followedTags",
            Self::InteractedAccounts => "interactedAccounts",
            Self::MostRepliedAccounts => "mostRepliedAccounts",
            Self::RetootedAccounts => "retootedAccounts",
            Self::TrendingTags => "trendingTags",
            Self::TrendingToots => "trendingToots",
        }
    }

    /// Staleness window for this key
    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        match self {
            Self::TrendingTags | Self::TrendingToots => {
                Duration::from_secs(config.trending_feature_ttl_secs)
            }
            _ => Duration::from_secs(config.account_feature_ttl_secs),
        }
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload returned by the fetch collaborator for a feature key
#[derive(Debug, Clone)]
pub enum FeatureData {
    Map(FeatureMap),
    Trending(Vec<TrendingSignal>),
    Posts(Vec<Post>),
}

impl FeatureData {
    pub fn empty() -> Self {
        Self::Map(FeatureMap::new())
    }
}

/// Network fetch collaborator
///
/// Implementations perform the actual API calls; transport failures surface
/// as `AppError::Fetch` and are recovered by the caller (empty feature data,
/// never a failed ranking run).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    async fn fetch(&self, key: FeatureKey) -> Result<FeatureData>;
}

/// Drive a paginated fetch until at least `min_records` records accumulate
/// or pages run out.
///
/// A mid-stream error returns whatever was accumulated so far rather than
/// discarding partial results.
pub async fn fetch_paginated<T, F, Fut>(min_records: usize, mut next_page: F) -> Vec<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut records: Vec<T> = Vec::new();
    let mut page = 0usize;

    loop {
        match next_page(page).await {
            Ok(batch) => {
                if batch.is_empty() {
                    break;
                }
                records.extend(batch);
                if records.len() >= min_records {
                    break;
                }
                page += 1;
            }
            Err(e) => {
                warn!(
                    page,
                    accumulated = records.len(),
                    error = %e,
                    "Paginated fetch failed mid-stream, keeping partial results"
                );
                break;
            }
        }
    }

    records
}
