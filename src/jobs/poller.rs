/// Background feature refresh job
///
/// Periodically walks the feature key catalog and refreshes whatever the
/// cache considers stale. Stopping mid-cycle lets the in-flight cycle
/// complete; no further cycles are scheduled after the shutdown signal.
use crate::config::Config;
use crate::services::features::{FeatureCache, FeatureFetcher, FeatureKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

pub struct FeaturePoller {
    cache: Arc<FeatureCache>,
    fetcher: Arc<dyn FeatureFetcher>,
    config: Config,
}

impl FeaturePoller {
    pub fn new(cache: Arc<FeatureCache>, fetcher: Arc<dyn FeatureFetcher>, config: Config) -> Self {
        Self {
            cache,
            fetcher,
            config,
        }
    }

    /// Spawn the background refresh task
    ///
    /// # Returns
    /// - `watch::Sender<()>` - Send signal to shutdown
    /// - `tokio::task::JoinHandle` - Task handle for awaiting completion
    pub fn spawn(self) -> (watch::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = self.config.poller.interval_secs,
                "FeaturePoller started"
            );

            let mut timer = interval(Duration::from_secs(self.config.poller.interval_secs));

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("FeaturePoller received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        self.run_refresh_cycle().await;
                    }
                }
            }

            info!("FeaturePoller stopped");
        });

        (shutdown_tx, handle)
    }

    /// Refresh every catalog key once; fresh entries are served from cache
    /// and cost nothing.
    async fn run_refresh_cycle(&self) {
        let mut refreshed = 0;
        let mut failed = 0;

        for key in FeatureKey::ALL {
            let ttl = key.ttl(&self.config.cache);
            match self
                .cache
                .get_or_fetch(key, ttl, || self.fetcher.fetch(key))
                .await
            {
                Ok(_) => refreshed += 1,
                Err(e) => {
                    error!(key = %key, error = %e, "Feature refresh failed");
                    failed += 1;
                }
            }
        }

        info!(refreshed, failed, "Feature refresh cycle complete");
    }
}
