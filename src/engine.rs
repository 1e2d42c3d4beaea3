/// Ranking Engine
///
/// Facade owning the feature cache, the fetch collaborator, and the poller
/// lifecycle. Each call to [`RankingEngine::prepare_and_score`] runs a
/// fresh pipeline (and therefore a fresh scorer registry); only the feature
/// cache is shared across runs.
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::jobs::FeaturePoller;
use crate::models::{Post, ScoredPost};
use crate::services::features::{CacheStats, FeatureCache, FeatureFetcher, FeatureKey};
use crate::services::scoring::{CategoryInfo, ScoreCategory, ScoringPipeline, WeightTable};
use crate::storage::{Storage, WEIGHTS_KEY};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, error, info};

struct PollerHandle {
    shutdown: watch::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct RankingEngine {
    config: Config,
    cache: Arc<FeatureCache>,
    fetcher: Arc<dyn FeatureFetcher>,
    storage: Option<Arc<dyn Storage>>,
    poller: Mutex<Option<PollerHandle>>,
}

impl RankingEngine {
    pub fn new(config: Config, fetcher: Arc<dyn FeatureFetcher>) -> Self {
        info!("Initializing RankingEngine");
        Self {
            config,
            cache: Arc::new(FeatureCache::new()),
            fetcher,
            storage: None,
            poller: Mutex::new(None),
        }
    }

    /// Attach a persistent store for weight-table persistence
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Prepare every scorer and score the candidate set.
    ///
    /// Fetch failures degrade to empty feature data; this only errors on
    /// internal misuse, never on collaborator trouble. The result is
    /// unsorted; order with [`ScoredPost::compare_score`].
    pub async fn prepare_and_score(
        &self,
        posts: Vec<Post>,
        weights: &WeightTable,
    ) -> Result<Vec<ScoredPost>> {
        let mut pipeline = ScoringPipeline::new();
        pipeline
            .run(posts, weights, &self.cache, self.fetcher.as_ref(), &self.config)
            .await
    }

    /// User-facing metadata for the full category catalog
    pub fn score_category_info() -> HashMap<ScoreCategory, CategoryInfo> {
        ScoreCategory::ALL
            .iter()
            .map(|&category| (category, CategoryInfo::for_category(category)))
            .collect()
    }

    /// Force the next fetch for `key` to bypass the cached value
    pub async fn invalidate_feature(&self, key: FeatureKey) {
        self.cache.invalidate(key).await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats(&self.config.cache).await
    }

    /// Start the background feature poller.
    ///
    /// Returns false if it is already running.
    pub async fn start_poller(&self) -> bool {
        let mut slot = self.poller.lock().await;
        if slot.is_some() {
            debug!("Poller already running");
            return false;
        }

        let poller = FeaturePoller::new(
            self.cache.clone(),
            self.fetcher.clone(),
            self.config.clone(),
        );
        let (shutdown, handle) = poller.spawn();
        *slot = Some(PollerHandle { shutdown, handle });
        true
    }

    /// Stop the background poller, letting any in-flight cycle complete.
    ///
    /// Returns false if no poller was running.
    pub async fn stop_poller(&self) -> bool {
        let mut slot = self.poller.lock().await;
        let Some(PollerHandle { shutdown, handle }) = slot.take() else {
            debug!("No poller running");
            return false;
        };

        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            error!(error = %e, "Poller task failed on shutdown");
        }
        true
    }

    /// Load the persisted weight table, repairing malformed entries.
    ///
    /// Without an attached store (or without a persisted table) this
    /// returns the catalog defaults.
    pub async fn load_weights(&self) -> Result<WeightTable> {
        let Some(storage) = &self.storage else {
            debug!("No storage attached, using default weights");
            return Ok(WeightTable::new());
        };

        match storage.load(WEIGHTS_KEY).await? {
            Some(value) => Ok(WeightTable::from_json(&value)),
            None => Ok(WeightTable::new()),
        }
    }

    /// Persist the weight table through the attached store
    pub async fn save_weights(&self, weights: &WeightTable) -> Result<()> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AppError::Storage("no storage attached".to_string()))?;

        storage.save(WEIGHTS_KEY, weights.to_json()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::features::{FeatureData, MockFeatureFetcher};
    use crate::storage::MockStorage;
    use serde_json::json;

    fn engine() -> RankingEngine {
        let mut fetcher = MockFeatureFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FeatureData::empty()));
        RankingEngine::new(Config::default(), Arc::new(fetcher))
    }

    #[test]
    fn test_category_info_covers_catalog() {
        let info = RankingEngine::score_category_info();
        assert_eq!(info.len(), ScoreCategory::ALL.len());

        let decay = &info[&ScoreCategory::TimeDecay];
        assert_eq!(decay.min_value, Some(0.001));
    }

    #[tokio::test]
    async fn test_poller_start_stop_flags() {
        let engine = engine();

        assert!(engine.start_poller().await);
        assert!(!engine.start_poller().await, "second start must report false");
        assert!(engine.stop_poller().await);
        assert!(!engine.stop_poller().await, "second stop must report false");
    }

    #[tokio::test]
    async fn test_load_weights_repairs_persisted_garbage() {
        let mut storage = MockStorage::new();
        storage.expect_load().returning(|_| {
            Ok(Some(json!({
                "followedTags": 4.0,
                "chaos": "broken",
                "imaginaryCategory": 2.0
            })))
        });

        let engine = engine().with_storage(Arc::new(storage));
        let weights = engine.load_weights().await.unwrap();

        assert_eq!(weights.get(ScoreCategory::FollowedTags), 4.0);
        assert_eq!(
            weights.get(ScoreCategory::Chaos),
            ScoreCategory::Chaos.default_weight()
        );
    }

    #[tokio::test]
    async fn test_load_weights_without_storage_uses_defaults() {
        let engine = engine();
        let weights = engine.load_weights().await.unwrap();
        assert_eq!(
            weights.get(ScoreCategory::NumReplies),
            ScoreCategory::NumReplies.default_weight()
        );
    }

    #[tokio::test]
    async fn test_save_weights_requires_storage() {
        let engine = engine();
        let result = engine.save_weights(&WeightTable::new()).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }
}
