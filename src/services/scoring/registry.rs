/// Scorer Registry
///
/// Holds the live scorer set for one ranking run. Concrete rules are data:
/// a category, an execution mode, and a small pure function. The registry
/// is rebuilt fresh for every run so no scorer state leaks across runs.
use super::category::ScoreCategory;
use super::scorer::Scorer;
use crate::config::Config;
use crate::models::Post;
use crate::services::features::{FeatureCache, FeatureFetcher, FeatureKey, FeatureMap};
use futures::future::join_all;
use tracing::debug;

pub struct ScorerRegistry {
    scorers: Vec<Scorer>,
}

impl ScorerRegistry {
    /// Build a fresh scorer set covering the full catalog
    pub fn build() -> Self {
        let scorers = vec![
            Scorer::feature(ScoreCategory::Chaos, None, score_chaos),
            Scorer::feed(ScoreCategory::Diversity, derive_empty, score_diversity),
            Scorer::feature(
                ScoreCategory::FavouritedAccounts,
                Some(FeatureKey::FavouritedAccounts),
                score_author_feature,
            ),
            Scorer::feature(
                ScoreCategory::FollowedTags,
                Some(FeatureKey::FollowedTags),
                score_tag_feature,
            ),
            Scorer::feature(
                ScoreCategory::InteractedAccounts,
                Some(FeatureKey::InteractedAccounts),
                score_author_feature,
            ),
            Scorer::feature(
                ScoreCategory::MostRepliedAccounts,
                Some(FeatureKey::MostRepliedAccounts),
                score_author_feature,
            ),
            Scorer::feature(
                ScoreCategory::RetootedAccounts,
                Some(FeatureKey::RetootedAccounts),
                score_author_feature,
            ),
            Scorer::feature(ScoreCategory::NumFavourites, None, score_num_favourites),
            Scorer::feature(ScoreCategory::NumReplies, None, score_num_replies),
            Scorer::feature(ScoreCategory::NumRetoots, None, score_num_retoots),
            Scorer::feed(
                ScoreCategory::RetootsInFeed,
                derive_retoots_in_feed,
                score_retoots_in_feed,
            ),
            Scorer::feature(ScoreCategory::ImageAttachments, None, score_image_attachments),
            Scorer::feature(ScoreCategory::VideoAttachments, None, score_video_attachments),
            Scorer::feature(
                ScoreCategory::TrendingTags,
                Some(FeatureKey::TrendingTags),
                score_tag_feature,
            ),
            Scorer::feature(
                ScoreCategory::TrendingToots,
                Some(FeatureKey::TrendingToots),
                score_trending_toots,
            ),
        ];

        debug!(count = scorers.len(), "Scorer registry built");
        Self { scorers }
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    pub fn all_ready(&self) -> bool {
        self.scorers.iter().all(Scorer::is_ready)
    }

    /// Prepare every feature-mode scorer concurrently.
    ///
    /// Preparations are mutually independent; the cache coalesces scorers
    /// that share a key.
    pub async fn prepare_feature_scorers(
        &mut self,
        cache: &FeatureCache,
        fetcher: &dyn FeatureFetcher,
        config: &Config,
    ) {
        join_all(
            self.scorers
                .iter_mut()
                .filter(|scorer| !scorer.is_feed())
                .map(|scorer| scorer.prepare_feature(cache, fetcher, config)),
        )
        .await;
    }

    /// Prepare every feed-mode scorer from the finalized candidate set
    pub fn prepare_feed_scorers(&mut self, posts: &[Post]) {
        for scorer in self.scorers.iter_mut().filter(|scorer| scorer.is_feed()) {
            scorer.prepare_feed(posts);
        }
    }

    pub fn scorers_mut(&mut self) -> &mut [Scorer] {
        &mut self.scorers
    }
}

// --- concrete scoring rules ---

fn derive_empty(_posts: &[Post]) -> FeatureMap {
    FeatureMap::new()
}

fn score_chaos(_post: &Post, _map: &FeatureMap) -> f64 {
    rand::random::<f64>()
}

/// Post-increment tally of how often this author has been scored this pass.
/// Order-dependent within a single traversal; the registry rebuild resets it.
fn score_diversity(post: &Post, map: &mut FeatureMap) -> f64 {
    let count = map.entry(post.account.acct.clone()).or_insert(0.0);
    *count += 1.0;
    *count
}

/// Look the post's author (boost target's author for boosts) up in the map
fn score_author_feature(post: &Post, map: &FeatureMap) -> f64 {
    map.get(&post.original().account.acct).copied().unwrap_or(0.0)
}

/// Sum the map values of every tag on the post
fn score_tag_feature(post: &Post, map: &FeatureMap) -> f64 {
    post.original()
        .tags
        .iter()
        .filter_map(|tag| map.get(&tag.to_lowercase()))
        .sum()
}

fn score_num_favourites(post: &Post, _map: &FeatureMap) -> f64 {
    post.original().favourites_count as f64
}

fn score_num_replies(post: &Post, _map: &FeatureMap) -> f64 {
    post.original().replies_count as f64
}

fn score_num_retoots(post: &Post, _map: &FeatureMap) -> f64 {
    post.original().reblogs_count as f64
}

fn score_image_attachments(post: &Post, _map: &FeatureMap) -> f64 {
    use crate::models::MediaKind;
    post.original()
        .attachments
        .iter()
        .filter(|a| a.kind == MediaKind::Image)
        .count() as f64
}

fn score_video_attachments(post: &Post, _map: &FeatureMap) -> f64 {
    use crate::models::MediaKind;
    post.original()
        .attachments
        .iter()
        .filter(|a| matches!(a.kind, MediaKind::Video | MediaKind::Gifv))
        .count() as f64
}

fn score_trending_toots(post: &Post, map: &FeatureMap) -> f64 {
    map.get(&post.original().uri).copied().unwrap_or(0.0)
}

/// Count how many posts in the feed boost each target uri
fn derive_retoots_in_feed(posts: &[Post]) -> FeatureMap {
    let mut counts = FeatureMap::new();
    for post in posts {
        if let Some(original) = &post.reblog {
            *counts.entry(original.uri.clone()).or_insert(0.0) += 1.0;
        }
    }
    counts
}

/// A boost target seen from two or more feed accounts scores its count
fn score_retoots_in_feed(post: &Post, map: &mut FeatureMap) -> f64 {
    let count = map.get(&post.original().uri).copied().unwrap_or(0.0);
    if count >= 2.0 {
        count
    } else {
        0.0
    }
}
