/// Weight Table
///
/// User-adjustable multiplier per scoring category. Unspecified categories
/// fall back to the catalog default; values below a category's bound are
/// rejected on set and discarded on load.
use super::category::ScoreCategory;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// One category's multiplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weight {
    pub category: ScoreCategory,
    pub value: f64,
}

impl Weight {
    pub fn new(category: ScoreCategory, value: f64) -> Result<Self> {
        validate(category, value)?;
        Ok(Self { category, value })
    }

    pub fn default_value(&self) -> f64 {
        self.category.default_weight()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.category.min_value()
    }
}

fn validate(category: ScoreCategory, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!(
            "weight for {} must be finite, got {}",
            category, value
        )));
    }
    if let Some(min) = category.min_value() {
        if value < min {
            return Err(AppError::Validation(format!(
                "weight for {} must be >= {}, got {}",
                category, min, value
            )));
        }
    }
    Ok(())
}

/// Per-category multipliers with catalog-default fallback
///
/// Persists across ranking runs via the storage collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightTable {
    values: HashMap<ScoreCategory, f64>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective multiplier for `category`
    pub fn get(&self, category: ScoreCategory) -> f64 {
        self.values
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_weight())
    }

    /// Set a category's multiplier, enforcing its validation bound
    pub fn set(&mut self, category: ScoreCategory, value: f64) -> Result<()> {
        validate(category, value)?;
        self.values.insert(category, value);
        Ok(())
    }

    /// Effective weights for the full catalog
    pub fn weights(&self) -> Vec<Weight> {
        ScoreCategory::ALL
            .iter()
            .map(|&category| Weight {
                category,
                value: self.get(category),
            })
            .collect()
    }

    /// The time-decay rate knob, clamped to its bound
    pub fn decay_rate(&self) -> f64 {
        let min = ScoreCategory::TimeDecay.min_value().unwrap_or(0.0);
        self.get(ScoreCategory::TimeDecay).max(min)
    }

    /// Rebuild a table from a persisted JSON object, discarding malformed
    /// entries instead of failing the load.
    pub fn from_json(value: &Value) -> Self {
        let mut table = Self::new();

        let Some(object) = value.as_object() else {
            warn!("Persisted weights are not an object, using defaults");
            return table;
        };

        for (key, raw) in object {
            let category: ScoreCategory =
                match serde_json::from_value(Value::String(key.clone())) {
                    Ok(category) => category,
                    Err(_) => {
                        warn!(key = %key, "Discarding unknown weight category");
                        continue;
                    }
                };

            let Some(weight) = raw.as_f64() else {
                warn!(key = %key, value = %raw, "Discarding non-numeric weight");
                continue;
            };

            if let Err(e) = table.set(category, weight) {
                warn!(key = %key, error = %e, "Discarding out-of-bounds weight");
            }
        }

        table
    }

    /// Effective values for the full catalog as a JSON object
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        for weight in self.weights() {
            object.insert(
                weight.category.as_str().to_string(),
                Value::from(weight.value),
            );
        }
        Value::Object(object)
    }
}
