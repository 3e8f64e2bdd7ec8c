use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{FanError, Result};
use crate::models::{FanRecord, FavoriteGame, Gender, AGE_MAX, AGE_MIN, FAN_SINCE_MAX, FAN_SINCE_MIN};

/// The active filter constraints for one interaction.
///
/// Ranges are inclusive at both ends. An empty category set places no
/// restriction on that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Inclusive `(min, max)` age bounds.
    pub age_range: (u8, u8),
    /// Allowed genders; empty = any.
    #[serde(default)]
    pub gender: BTreeSet<Gender>,
    /// Allowed countries (exact match); empty = any.
    #[serde(default)]
    pub country: BTreeSet<String>,
    /// Allowed favorite games; empty = any.
    #[serde(default)]
    pub favorite_game: BTreeSet<FavoriteGame>,
    /// Inclusive `(min, max)` fan-since bounds, in years.
    #[serde(alias = "fan_since")]
    pub fan_since_range: (u8, u8),
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            age_range: (AGE_MIN, AGE_MAX),
            gender: BTreeSet::new(),
            country: BTreeSet::new(),
            favorite_game: BTreeSet::new(),
            fan_since_range: (FAN_SINCE_MIN, FAN_SINCE_MAX),
        }
    }
}

impl FilterSpec {
    /// Restore every constraint to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `true` when the filter admits every valid record.
    pub fn is_unrestricted(&self) -> bool {
        self.age_range.0 <= AGE_MIN
            && self.age_range.1 >= AGE_MAX
            && self.fan_since_range.0 <= FAN_SINCE_MIN
            && self.fan_since_range.1 >= FAN_SINCE_MAX
            && self.gender.is_empty()
            && self.country.is_empty()
            && self.favorite_game.is_empty()
    }

    /// Whether `record` satisfies every constraint.
    pub fn matches(&self, record: &FanRecord) -> bool {
        let (age_min, age_max) = self.age_range;
        let (since_min, since_max) = self.fan_since_range;

        (age_min..=age_max).contains(&record.age)
            && (self.gender.is_empty() || self.gender.contains(&record.gender))
            && (self.country.is_empty() || self.country.contains(&record.country))
            && (self.favorite_game.is_empty() || self.favorite_game.contains(&record.favorite_game))
            && (since_min..=since_max).contains(&record.fan_since)
    }

    /// Reject inverted ranges.
    pub fn validate(&self) -> Result<()> {
        let (age_min, age_max) = self.age_range;
        if age_min > age_max {
            return Err(FanError::Config(format!(
                "age range {}-{} is inverted",
                age_min, age_max
            )));
        }
        let (since_min, since_max) = self.fan_since_range;
        if since_min > since_max {
            return Err(FanError::Config(format!(
                "fan-since range {}-{} is inverted",
                since_min, since_max
            )));
        }
        Ok(())
    }
}
