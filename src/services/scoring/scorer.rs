/// Scorer Contract
///
/// One scorer type with two execution modes instead of a subclass hierarchy:
///
/// - **Feature mode**: prerequisite data is independent of the candidate
///   feed, fetched once per cache key and reusable across ranking runs.
/// - **Feed mode**: prerequisite data is derived from the current candidate
///   set and recomputed for every run.
///
/// Concrete rules are data: a category, a mode, and a small pure function.
use super::category::ScoreCategory;
use crate::config::Config;
use crate::models::Post;
use crate::services::features::{
    FeatureCache, FeatureData, FeatureFetcher, FeatureKey, FeatureMap,
};
use crate::services::trending::{trending_score, TrendingAggregator};
use tracing::{debug, warn};

/// Per-post score over prepared feature data
pub type FeatureScoreFn = fn(&Post, &FeatureMap) -> f64;
/// Derive a working map from the finalized candidate set
pub type FeedDeriveFn = fn(&[Post]) -> FeatureMap;
/// Per-post score that may mutate the working map for running effects
pub type FeedScoreFn = fn(&Post, &mut FeatureMap) -> f64;

pub enum ScorerMode {
    Feature {
        /// Cache key for the prerequisite fetch; rules that only read the
        /// post itself (counter rules) carry no key and skip the fetch.
        key: Option<FeatureKey>,
        score: FeatureScoreFn,
    },
    Feed {
        derive: FeedDeriveFn,
        score: FeedScoreFn,
    },
}

pub struct Scorer {
    category: ScoreCategory,
    mode: ScorerMode,
    data: FeatureMap,
    ready: bool,
}

impl Scorer {
    pub fn feature(
        category: ScoreCategory,
        key: Option<FeatureKey>,
        score: FeatureScoreFn,
    ) -> Self {
        Self {
            category,
            mode: ScorerMode::Feature { key, score },
            data: FeatureMap::new(),
            ready: false,
        }
    }

    pub fn feed(category: ScoreCategory, derive: FeedDeriveFn, score: FeedScoreFn) -> Self {
        Self {
            category,
            mode: ScorerMode::Feed { derive, score },
            data: FeatureMap::new(),
            ready: false,
        }
    }

    pub fn category(&self) -> ScoreCategory {
        self.category
    }

    pub fn default_weight(&self) -> f64 {
        self.category.default_weight()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_feed(&self) -> bool {
        matches!(self.mode, ScorerMode::Feed { .. })
    }

    /// Prepare a feature-mode scorer by resolving its prerequisite data
    /// through the cache.
    ///
    /// A failed fetch is logged and leaves the map empty; the scorer still
    /// becomes ready so it contributes zero everywhere instead of blocking
    /// the pipeline. No-op for feed-mode scorers.
    pub async fn prepare_feature(
        &mut self,
        cache: &FeatureCache,
        fetcher: &dyn FeatureFetcher,
        config: &Config,
    ) {
        let ScorerMode::Feature { key, .. } = &self.mode else {
            return;
        };

        if let Some(key) = *key {
            let ttl = key.ttl(&config.cache);
            match cache.get_or_fetch(key, ttl, || fetcher.fetch(key)).await {
                Ok(data) => {
                    self.data = feature_map_from(data, config);
                    debug!(
                        category = %self.category,
                        key = %key,
                        entries = self.data.len(),
                        "Feature scorer prepared"
                    );
                }
                Err(e) => {
                    warn!(
                        category = %self.category,
                        key = %key,
                        error = %e,
                        "Feature fetch failed, scoring with empty data"
                    );
                    self.data = FeatureMap::new();
                }
            }
        }

        self.ready = true;
    }

    /// Prepare a feed-mode scorer from the finalized candidate set.
    ///
    /// Must run after the candidate set is closed; the working map is
    /// discarded and recomputed per run, never patched. No-op for
    /// feature-mode scorers.
    pub fn prepare_feed(&mut self, posts: &[Post]) {
        let ScorerMode::Feed { derive, .. } = &self.mode else {
            return;
        };

        self.data = derive(posts);
        self.ready = true;
    }

    /// Raw sub-score for one post.
    ///
    /// Invoking a not-yet-ready scorer is a caller ordering error: it logs
    /// a warning and returns 0 rather than aborting the pass. Feed-mode
    /// scorers may mutate their working map, so results can be
    /// order-dependent within a single pass.
    pub fn raw_score(&mut self, post: &Post) -> f64 {
        if !self.ready {
            warn!(
                category = %self.category,
                post_id = %post.id,
                "Scorer invoked before ready, returning 0"
            );
            return 0.0;
        }

        match &self.mode {
            ScorerMode::Feature { score, .. } => score(post, &self.data),
            ScorerMode::Feed { score, .. } => score(post, &mut self.data),
        }
    }
}

/// Collapse a fetched payload into the numeric map scorers consume.
///
/// Trending signals pass through cross-server dedup first, then each
/// subject maps to its curve score.
fn feature_map_from(data: FeatureData, config: &Config) -> FeatureMap {
    match data {
        FeatureData::Map(map) => map,
        FeatureData::Trending(signals) => {
            let aggregator = TrendingAggregator::new(config.scoring.trending_lookback_days);
            aggregator
                .dedup(signals)
                .into_iter()
                .map(|signal| {
                    let score = trending_score(signal.num_accounts as f64);
                    (signal.subject_key, score)
                })
                .collect()
        }
        FeatureData::Posts(posts) => posts
            .into_iter()
            .map(|post| {
                let rank = post.trending_rank.unwrap_or(0.0);
                (post.uri, rank)
            })
            .collect(),
    }
}
