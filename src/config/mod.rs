use serde::Deserialize;
use std::env;

/// Engine configuration
///
/// All values can be overridden via environment variables. Malformed values
/// fall back to defaults rather than aborting startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Number of most recent history days summed into trending counts
    pub trending_lookback_days: usize,
    /// Scale applied to a post's trending rank when computing its multiplier
    pub trending_boost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL for account-derived feature keys (favourites, interactions, ...)
    pub account_feature_ttl_secs: u64,
    /// TTL for trending feature keys (tags, toots)
    pub trending_feature_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Interval between background refresh cycles
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig {
                trending_lookback_days: 7,
                trending_boost: 0.1,
            },
            cache: CacheConfig {
                account_feature_ttl_secs: 24 * 60 * 60,
                trending_feature_ttl_secs: 60 * 60,
            },
            poller: PollerConfig {
                interval_secs: 1800,
            },
        }
    }
}

impl Config {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        Self {
            scoring: ScoringConfig {
                trending_lookback_days: env_or("TRENDING_LOOKBACK_DAYS", 7),
                trending_boost: env_or("TRENDING_BOOST", defaults.scoring.trending_boost),
            },
            cache: CacheConfig {
                account_feature_ttl_secs: env_or(
                    "ACCOUNT_FEATURE_TTL_SECS",
                    defaults.cache.account_feature_ttl_secs,
                ),
                trending_feature_ttl_secs: env_or(
                    "TRENDING_FEATURE_TTL_SECS",
                    defaults.cache.trending_feature_ttl_secs,
                ),
            },
            poller: PollerConfig {
                interval_secs: env_or("POLLER_INTERVAL_SECS", defaults.poller.interval_secs),
            },
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
