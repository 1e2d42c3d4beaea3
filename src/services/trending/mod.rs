/// Trending Aggregation Module
///
/// Dedups and merges same-subject trending signals (tags, links, posts)
/// gathered from multiple remote servers. Two servers reporting the same
/// trend must not double-count it, so duplicate subjects merge by
/// elementwise maximum, never by summing.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Below this many participating accounts the scoring curve stays linear
const LINEAR_SCORE_THRESHOLD: f64 = std::f64::consts::E;

/// One day of usage history for a trending subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingHistoryDay {
    pub day: NaiveDate,
    pub uses: u32,
    pub accounts: u32,
}

/// A trending subject (tag name or link URL) as reported by one server
///
/// `num_toots` / `num_accounts` are derived sums over the most recent
/// lookback window; [`TrendingAggregator::dedup`] fills them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingSignal {
    /// Identifying string, case-folded during aggregation
    pub subject_key: String,
    pub history: Vec<TrendingHistoryDay>,
    #[serde(default)]
    pub num_toots: u32,
    #[serde(default)]
    pub num_accounts: u32,
}

impl TrendingSignal {
    pub fn new(subject_key: impl Into<String>, history: Vec<TrendingHistoryDay>) -> Self {
        Self {
            subject_key: subject_key.into(),
            history,
            num_toots: 0,
            num_accounts: 0,
        }
    }

    /// Sum uses/accounts over the `lookback_days` most recent history days
    fn window_counts(&self, lookback_days: usize) -> (u32, u32) {
        let mut days: Vec<&TrendingHistoryDay> = self.history.iter().collect();
        days.sort_by(|a, b| b.day.cmp(&a.day));

        days.iter()
            .take(lookback_days)
            .fold((0, 0), |(toots, accounts), day| {
                (toots + day.uses, accounts + day.accounts)
            })
    }
}

/// Merges trending signals from multiple servers into one deduped,
/// rank-ordered list
pub struct TrendingAggregator {
    lookback_days: usize,
}

impl TrendingAggregator {
    pub fn new(lookback_days: usize) -> Self {
        Self { lookback_days }
    }

    /// Normalize, window, dedup, and rank a batch of raw signals.
    ///
    /// Duplicate subjects merge by taking the elementwise maximum of
    /// `num_toots` and `num_accounts` across the group; the result is
    /// sorted descending by `num_accounts`.
    pub fn dedup(&self, signals: Vec<TrendingSignal>) -> Vec<TrendingSignal> {
        use std::collections::hash_map::Entry;

        let input_len = signals.len();
        let mut merged: HashMap<String, TrendingSignal> = HashMap::new();

        for mut signal in signals {
            signal.subject_key = normalize_subject(&signal.subject_key);
            let (num_toots, num_accounts) = signal.window_counts(self.lookback_days);
            signal.num_toots = num_toots;
            signal.num_accounts = num_accounts;

            match merged.entry(signal.subject_key.clone()) {
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    existing.num_toots = existing.num_toots.max(signal.num_toots);
                    // Keep the history of the better-attested report
                    if signal.num_accounts > existing.num_accounts {
                        existing.num_accounts = signal.num_accounts;
                        existing.history = signal.history;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(signal);
                }
            }
        }

        let mut result: Vec<TrendingSignal> = merged.into_values().collect();
        result.sort_by(|a, b| {
            b.num_accounts
                .cmp(&a.num_accounts)
                .then_with(|| a.subject_key.cmp(&b.subject_key))
        });

        debug!(
            input = input_len,
            deduped = result.len(),
            "Merged trending signals"
        );

        result
    }
}

/// Case-fold a subject's identifying string (tag name or URL)
pub fn normalize_subject(subject: &str) -> String {
    subject.trim().to_lowercase()
}

/// Scoring curve for a trending subject.
///
/// Linear in `num_accounts` below a small threshold; `1 + log2(num_accounts)`
/// at or above it. Breadth of adoption is rewarded with diminishing returns.
pub fn trending_score(num_accounts: f64) -> f64 {
    if num_accounts < LINEAR_SCORE_THRESHOLD {
        num_accounts.max(0.0)
    } else {
        1.0 + num_accounts.log2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(ordinal: u32, uses: u32, accounts: u32) -> TrendingHistoryDay {
        TrendingHistoryDay {
            day: NaiveDate::from_ymd_opt(2025, 6, ordinal).unwrap(),
            uses,
            accounts,
        }
    }

    #[test]
    fn test_dedup_takes_max_not_sum() {
        let aggregator = TrendingAggregator::new(7);

        let signals = vec![
            TrendingSignal::new("Rust", vec![day(1, 10, 5)]),
            TrendingSignal::new("rust", vec![day(1, 12, 9)]),
        ];

        let merged = aggregator.dedup(signals);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].subject_key, "rust");
        assert_eq!(merged[0].num_accounts, 9);
        assert_eq!(merged[0].num_toots, 12);
    }

    #[test]
    fn test_dedup_sorts_by_accounts_descending() {
        let aggregator = TrendingAggregator::new(7);

        let signals = vec![
            TrendingSignal::new("quiet", vec![day(1, 3, 2)]),
            TrendingSignal::new("loud", vec![day(1, 40, 30)]),
            TrendingSignal::new("middling", vec![day(1, 9, 8)]),
        ];

        let merged = aggregator.dedup(signals);
        let keys: Vec<&str> = merged.iter().map(|s| s.subject_key.as_str()).collect();
        assert_eq!(keys, vec!["loud", "middling", "quiet"]);
    }

    #[test]
    fn test_window_respects_lookback() {
        let aggregator = TrendingAggregator::new(2);

        // Three days of history, only the two most recent count
        let signals = vec![TrendingSignal::new(
            "tag",
            vec![day(1, 100, 100), day(2, 4, 3), day(3, 6, 5)],
        )];

        let merged = aggregator.dedup(signals);
        assert_eq!(merged[0].num_toots, 10);
        assert_eq!(merged[0].num_accounts, 8);
    }

    #[test]
    fn test_score_linear_below_threshold() {
        assert_eq!(trending_score(0.0), 0.0);
        assert_eq!(trending_score(2.0), 2.0);
        assert_eq!(trending_score(-3.0), 0.0);
    }

    #[test]
    fn test_score_logarithmic_above_threshold() {
        assert_eq!(trending_score(8.0), 4.0);
        assert_eq!(trending_score(1024.0), 11.0);
    }
}
