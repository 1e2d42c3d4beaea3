use crate::services::scoring::ScoreCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A fediverse account reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Webfinger-style handle, e.g. `user@example.social`
    pub acct: String,
    pub display_name: String,
}

/// Media attachment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gifv,
    Audio,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: MediaKind,
    pub url: String,
}

/// The unit being ranked
///
/// Created by the external fetch layer; the scoring pipeline only attaches
/// `score_info`. A boost wraps the original post in `reblog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub uri: String,
    pub account: Account,
    #[serde(default)]
    pub reblog: Option<Box<Post>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies_count: u32,
    #[serde(default)]
    pub reblogs_count: u32,
    #[serde(default)]
    pub favourites_count: u32,
    /// Curve score of the trending subject that surfaced this post, if any.
    /// Assigned by the fetch layer from the deduped trending list.
    #[serde(default)]
    pub trending_rank: Option<f64>,
    /// Written by the scoring pipeline, recomputed from scratch every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_info: Option<ScoreBreakdown>,
}

impl Post {
    /// The post whose content is being shown: the boost target if this is a
    /// boost, otherwise the post itself.
    pub fn original(&self) -> &Post {
        self.reblog.as_deref().unwrap_or(self)
    }

    /// Age in hours at `now`, never negative
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds().max(0) as f64;
        seconds / 3600.0
    }
}

/// Raw and weighted sub-score for one category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryScore {
    pub raw: f64,
    pub weighted: f64,
}

/// Full per-post score breakdown written by the pipeline
///
/// Invariants: `weighted = raw * weight(category)` per entry,
/// `weighted_score` is the sum of the weighted entries, and
/// `score = weighted_score * time_decay_multiplier * trending_multiplier`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub categories: HashMap<ScoreCategory, CategoryScore>,
    pub raw_score: f64,
    pub weighted_score: f64,
    pub time_decay_multiplier: f64,
    pub trending_multiplier: f64,
    pub score: f64,
}

impl ScoreBreakdown {
    pub fn category(&self, category: ScoreCategory) -> CategoryScore {
        self.categories.get(&category).copied().unwrap_or_default()
    }
}

/// A candidate post annotated with its final score
///
/// `post.score_info` is always populated. The pipeline does not sort;
/// callers order with [`ScoredPost::compare_score`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPost {
    pub post: Post,
    pub score: f64,
}

impl ScoredPost {
    /// Descending score comparator
    ///
    /// Note: NaN scores are treated as less than any valid score
    pub fn compare_score(a: &Self, b: &Self) -> Ordering {
        b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
    }
}
