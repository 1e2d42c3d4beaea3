/// Scoring Pipeline
///
/// Orchestrates one ranking run: prepares every scorer, traverses the
/// candidate set once in a fixed order, combines raw sub-scores with the
/// weight table, and folds in the time-decay and trending multipliers.
///
/// Feature preparations run concurrently; the scoring traversal itself
/// never suspends, which keeps order-dependent feed scorers deterministic.
/// The pipeline does not sort — ordering is the caller's responsibility.
use super::registry::ScorerRegistry;
use super::weights::WeightTable;
use crate::config::Config;
use crate::error::Result;
use crate::models::{CategoryScore, Post, ScoreBreakdown, ScoredPost};
use crate::services::features::{FeatureCache, FeatureFetcher};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Old posts are never scored exactly zero
const MIN_TIME_DECAY: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PreparingFeatureScorers,
    PreparingFeedScorers,
    Scoring,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PreparingFeatureScorers => "preparing_feature_scorers",
            Self::PreparingFeedScorers => "preparing_feed_scorers",
            Self::Scoring => "scoring",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct ScoringPipeline {
    registry: ScorerRegistry,
    state: PipelineState,
}

impl Default for ScoringPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringPipeline {
    pub fn new() -> Self {
        Self {
            registry: ScorerRegistry::build(),
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run one full ranking pass over `posts`.
    ///
    /// The candidate set is treated as final: feed scorers derive their
    /// working data from exactly this slice, after every feature scorer
    /// has finished preparing.
    pub async fn run(
        &mut self,
        posts: Vec<Post>,
        weights: &WeightTable,
        cache: &FeatureCache,
        fetcher: &dyn FeatureFetcher,
        config: &Config,
    ) -> Result<Vec<ScoredPost>> {
        if self.state != PipelineState::Idle {
            // A reused pipeline gets a fresh registry so no scorer state
            // leaks out of the previous run
            debug!(state = %self.state, "Rebuilding scorer registry for new run");
            self.registry = ScorerRegistry::build();
        }

        info!(candidates = posts.len(), "Scoring run starting");

        self.set_state(PipelineState::PreparingFeatureScorers);
        self.registry
            .prepare_feature_scorers(cache, fetcher, config)
            .await;

        self.set_state(PipelineState::PreparingFeedScorers);
        self.registry.prepare_feed_scorers(&posts);

        self.set_state(PipelineState::Scoring);
        let now = Utc::now();
        let decay_rate = weights.decay_rate();

        let scored: Vec<ScoredPost> = posts
            .into_iter()
            .map(|mut post| {
                let breakdown = self.score_post(&post, weights, decay_rate, now, config);
                let score = breakdown.score;
                post.score_info = Some(breakdown);
                ScoredPost { post, score }
            })
            .collect();

        self.set_state(PipelineState::Done);
        info!(scored = scored.len(), "Scoring run complete");

        Ok(scored)
    }

    /// Score one post across every registered scorer.
    ///
    /// Each post's scoring is isolated: a non-finite sub-score is logged
    /// and defaulted to 0 so it cannot corrupt other posts' breakdowns.
    fn score_post(
        &mut self,
        post: &Post,
        weights: &WeightTable,
        decay_rate: f64,
        now: DateTime<Utc>,
        config: &Config,
    ) -> ScoreBreakdown {
        let mut categories = HashMap::new();
        let mut raw_score = 0.0;
        let mut weighted_score = 0.0;

        for scorer in self.registry.scorers_mut() {
            let category = scorer.category();
            let mut raw = scorer.raw_score(post);
            if !raw.is_finite() {
                warn!(
                    category = %category,
                    post_id = %post.id,
                    "Non-finite sub-score, defaulting to 0"
                );
                raw = 0.0;
            }

            let weighted = raw * weights.get(category);
            raw_score += raw;
            weighted_score += weighted;
            categories.insert(category, CategoryScore { raw, weighted });
        }

        let time_decay_multiplier = time_decay_multiplier(post.age_hours(now), decay_rate);
        let trending_multiplier = trending_multiplier(post, config);
        let score = weighted_score * time_decay_multiplier * trending_multiplier;

        ScoreBreakdown {
            categories,
            raw_score,
            weighted_score,
            time_decay_multiplier,
            trending_multiplier,
            score,
        }
    }

    fn set_state(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state transition");
        self.state = next;
    }
}

/// Exponential decay in post age, floored at a small positive minimum
pub fn time_decay_multiplier(age_hours: f64, decay_rate: f64) -> f64 {
    (-age_hours * decay_rate).exp().max(MIN_TIME_DECAY)
}

/// 1.0 unless the post carries a trending annotation, then scaled by its
/// deduped trending rank
fn trending_multiplier(post: &Post, config: &Config) -> f64 {
    post.trending_rank
        .map(|rank| 1.0 + rank.max(0.0) * config.scoring.trending_boost)
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::features::{FeatureCache, FeatureData, MockFeatureFetcher};
    use crate::services::scoring::ScoreCategory;
    use crate::models::Account;
    use chrono::Duration;

    fn post_with_favourites(id: &str, favourites: u32, created_at: DateTime<Utc>) -> Post {
        Post {
            id: id.to_string(),
            uri: format!("https://example.social/{}", id),
            account: Account {
                id: "a1".to_string(),
                acct: "alice@example.social".to_string(),
                display_name: "Alice".to_string(),
            },
            reblog: None,
            tags: vec![],
            attachments: vec![],
            created_at,
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: favourites,
            trending_rank: None,
            score_info: None,
        }
    }

    /// Weight table with every scorer category zeroed out
    fn zeroed_weights() -> WeightTable {
        let mut weights = WeightTable::new();
        for category in ScoreCategory::ALL {
            if category.is_scorer() {
                weights.set(category, 0.0).unwrap();
            }
        }
        weights
    }

    fn empty_fetcher() -> MockFeatureFetcher {
        let mut fetcher = MockFeatureFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FeatureData::empty()));
        fetcher
    }

    #[tokio::test]
    async fn test_single_category_end_to_end() {
        let cache = FeatureCache::new();
        let config = Config::default();
        let fetcher = empty_fetcher();

        let mut weights = zeroed_weights();
        weights.set(ScoreCategory::NumFavourites, 2.0).unwrap();

        let now = Utc::now();
        let posts = vec![
            post_with_favourites("p1", 1, now),
            post_with_favourites("p2", 0, now),
            post_with_favourites("p3", 3, now),
        ];

        let mut pipeline = ScoringPipeline::new();
        let scored = pipeline
            .run(posts, &weights, &cache, &fetcher, &config)
            .await
            .unwrap();

        assert_eq!(pipeline.state(), PipelineState::Done);

        // Fresh posts, no trending: multipliers are exactly 1
        let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![2.0, 0.0, 6.0]);

        for s in &scored {
            let info = s.post.score_info.as_ref().unwrap();
            assert_eq!(info.time_decay_multiplier, 1.0);
            assert_eq!(info.trending_multiplier, 1.0);
            assert_eq!(info.score, s.score);
        }
    }

    #[tokio::test]
    async fn test_weighted_sum_identity() {
        let cache = FeatureCache::new();
        let config = Config::default();
        let fetcher = empty_fetcher();
        let weights = WeightTable::new();

        let posts = vec![post_with_favourites("p1", 11, Utc::now() - Duration::hours(3))];

        let mut pipeline = ScoringPipeline::new();
        let scored = pipeline
            .run(posts, &weights, &cache, &fetcher, &config)
            .await
            .unwrap();

        let info = scored[0].post.score_info.as_ref().unwrap();

        // Sum in catalog order, which matches the traversal order, so the
        // float sums are bit-identical
        let raw_sum: f64 = ScoreCategory::ALL
            .iter()
            .map(|&c| info.category(c).raw)
            .sum();
        let weighted_sum: f64 = ScoreCategory::ALL
            .iter()
            .map(|&c| info.category(c).weighted)
            .sum();
        assert_eq!(info.raw_score, raw_sum);
        assert_eq!(info.weighted_score, weighted_sum);

        for (category, entry) in &info.categories {
            assert_eq!(entry.weighted, entry.raw * weights.get(*category));
        }

        assert!(info.time_decay_multiplier > 0.0);
        assert!(info.trending_multiplier > 0.0);
        assert_eq!(
            info.score,
            info.weighted_score * info.time_decay_multiplier * info.trending_multiplier
        );
    }

    #[tokio::test]
    async fn test_trending_annotation_boosts() {
        let cache = FeatureCache::new();
        let config = Config::default();
        let fetcher = empty_fetcher();

        let mut weights = zeroed_weights();
        weights.set(ScoreCategory::NumFavourites, 1.0).unwrap();

        let now = Utc::now();
        let plain = post_with_favourites("plain", 5, now);
        let mut trending = post_with_favourites("hot", 5, now);
        trending.trending_rank = Some(4.0);

        let mut pipeline = ScoringPipeline::new();
        let scored = pipeline
            .run(vec![plain, trending], &weights, &cache, &fetcher, &config)
            .await
            .unwrap();

        assert_eq!(scored[0].score, 5.0);
        let expected = 5.0 * (1.0 + 4.0 * config.scoring.trending_boost);
        assert!((scored[1].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_time_decay_monotonic_with_floor() {
        let rate = 0.05;
        assert_eq!(time_decay_multiplier(0.0, rate), 1.0);

        let day = time_decay_multiplier(24.0, rate);
        let week = time_decay_multiplier(24.0 * 7.0, rate);
        assert!(day < 1.0);
        assert!(week < day);

        // Very old posts hit the floor, never zero
        let ancient = time_decay_multiplier(24.0 * 365.0, rate);
        assert_eq!(ancient, MIN_TIME_DECAY);
    }

    #[tokio::test]
    async fn test_rerun_rebuilds_registry() {
        let cache = FeatureCache::new();
        let config = Config::default();
        let fetcher = empty_fetcher();
        let weights = WeightTable::new();

        let mut pipeline = ScoringPipeline::new();
        let posts = vec![post_with_favourites("p1", 1, Utc::now())];
        pipeline
            .run(posts.clone(), &weights, &cache, &fetcher, &config)
            .await
            .unwrap();

        // Second run on the same pipeline starts from a fresh registry:
        // the diversity tally begins at 1 again
        let scored = pipeline
            .run(posts, &weights, &cache, &fetcher, &config)
            .await
            .unwrap();
        let info = scored[0].post.score_info.as_ref().unwrap();
        assert_eq!(info.category(ScoreCategory::Diversity).raw, 1.0);
    }
}
