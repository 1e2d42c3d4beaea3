//! Multi-factor feed scoring engine for fediverse posts
//!
//! Combines a pluggable set of scoring rules into one weighted,
//! reproducible ranking for a candidate set of posts:
//!
//! - **Feature scorers** resolve prerequisite data (favourited accounts,
//!   followed tags, cross-server trending signals) through a single-flight,
//!   TTL-aware [`services::features::FeatureCache`].
//! - **Feed scorers** derive their data from the current candidate set and
//!   may keep running state during a pass (author diversity).
//! - The [`services::scoring::ScoringPipeline`] traverses the candidate set
//!   once, combines raw sub-scores with a user-adjustable
//!   [`services::scoring::WeightTable`], and folds in time-decay and
//!   trending multipliers.
//!
//! Network access and persistence stay behind the
//! [`services::features::FeatureFetcher`] and [`storage::Storage`]
//! collaborator traits; [`RankingEngine`] ties it all together.

pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use engine::RankingEngine;
pub use error::{AppError, Result};
pub use models::{Account, Attachment, MediaKind, Post, ScoreBreakdown, ScoredPost};
pub use services::features::{FeatureCache, FeatureData, FeatureFetcher, FeatureKey};
pub use services::scoring::{
    CategoryInfo, ScoreCategory, ScoringPipeline, Weight, WeightTable,
};
pub use services::trending::{TrendingAggregator, TrendingSignal};
