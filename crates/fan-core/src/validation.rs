//! Input-boundary validation.
//!
//! A [`Submission`] is what the form (or the `submit` command) hands over:
//! untrimmed strings and unchecked numbers. [`Submission::into_record`] is the
//! only way to turn one into a [`FanRecord`]; everything downstream trusts
//! the record's ranges.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FanError, Result};
use crate::models::{
    normalize_optional, Choice, EngagementActivity, FanRecord, FavoriteGame, Gender,
    PurchaseFrequency, AGE_MAX, AGE_MIN, FAN_SINCE_MAX, FAN_SINCE_MIN,
};
use crate::time_utils::now_local;

/// Raw, unvalidated survey input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub age: i64,
    pub gender: String,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    pub fan_since: i64,
    pub favorite_game: String,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub twitch: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
    #[serde(default)]
    pub engagement_type: Vec<String>,
    pub purchase_frequency: String,
}

impl Submission {
    /// Validate and stamp the submission with the current local time.
    pub fn into_record(self) -> Result<FanRecord> {
        self.into_record_at(now_local())
    }

    /// Validate the submission and build a record stamped with `timestamp`.
    ///
    /// Fails with [`FanError::Validation`] on the first missing required
    /// field or out-of-range number, and with [`FanError::UnknownLabel`] when
    /// a closed-choice field holds an unrecognised value.
    pub fn into_record_at(self, timestamp: NaiveDateTime) -> Result<FanRecord> {
        let name = required("name", self.name)?;
        let email = required("email", self.email)?;
        let country = required("country", self.country)?;

        let age = in_range("age", self.age, AGE_MIN, AGE_MAX)?;
        let fan_since = in_range("fan_since", self.fan_since, FAN_SINCE_MIN, FAN_SINCE_MAX)?;

        let gender = Gender::parse_label(&self.gender)?;
        let favorite_game = FavoriteGame::parse_label(&self.favorite_game)?;
        let purchase_frequency = PurchaseFrequency::parse_label(&self.purchase_frequency)?;

        let engagement_type = self
            .engagement_type
            .iter()
            .map(|s| EngagementActivity::parse_label(s))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(FanRecord {
            name,
            email,
            age,
            gender,
            country,
            city: normalize_optional(self.city),
            fan_since,
            favorite_game,
            instagram: normalize_optional(self.instagram),
            twitter: normalize_optional(self.twitter),
            twitch: normalize_optional(self.twitch),
            discord: normalize_optional(self.discord),
            engagement_type,
            purchase_frequency,
            timestamp,
        })
    }
}

fn required(field: &'static str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FanError::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

fn in_range(field: &'static str, value: i64, min: u8, max: u8) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| {
            FanError::validation(
                field,
                format!("must be between {} and {}, got {}", min, max, value),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn valid() -> Submission {
        Submission {
            name: "  Bruno Lima ".to_string(),
            email: "bruno@example.com".to_string(),
            age: 25,
            gender: "Male".to_string(),
            country: "Brazil".to_string(),
            city: Some("".to_string()),
            fan_since: 1,
            favorite_game: "Counter-Strike".to_string(),
            instagram: Some("bruno.cs".to_string()),
            twitter: Some("".to_string()),
            twitch: None,
            discord: Some("  ".to_string()),
            engagement_type: vec![
                "Watch matches online".to_string(),
                "Follow on social media".to_string(),
            ],
            purchase_frequency: "Occasionally".to_string(),
        }
    }

    #[test]
    fn test_valid_submission_builds_record() {
        let record = valid().into_record_at(stamp()).unwrap();
        assert_eq!(record.name, "Bruno Lima");
        assert_eq!(record.age, 25);
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.favorite_game, FavoriteGame::CounterStrike);
        assert_eq!(record.purchase_frequency, PurchaseFrequency::Occasionally);
        assert_eq!(record.engagement_type.len(), 2);
        assert_eq!(record.timestamp, stamp());
        assert!(record.city.is_none());
    }

    #[test]
    fn test_blank_handles_become_absent() {
        let record = valid().into_record_at(stamp()).unwrap();
        assert!(record.has_platform(Platform::Instagram));
        assert!(!record.has_platform(Platform::Twitter));
        assert!(!record.has_platform(Platform::Discord));
        assert_eq!(record.platform_count(), 1);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        for field in ["name", "email", "country"] {
            let mut sub = valid();
            match field {
                "name" => sub.name = "   ".to_string(),
                "email" => sub.email = String::new(),
                _ => sub.country = String::new(),
            }
            let err = sub.into_record_at(stamp()).unwrap_err();
            assert!(
                matches!(err, FanError::Validation { field: f, .. } if f == field),
                "expected validation error for {field}, got {err}"
            );
        }
    }

    #[test]
    fn test_age_bounds_inclusive() {
        for (age, ok) in [
            (9, false),
            (10, true),
            (100, true),
            (101, false),
            (-3, false),
            (266, false),
            (i64::MAX, false),
        ] {
            let mut sub = valid();
            sub.age = age;
            assert_eq!(sub.into_record_at(stamp()).is_ok(), ok, "age {age}");
        }
    }

    #[test]
    fn test_out_of_range_message_names_bounds() {
        let mut sub = valid();
        sub.age = 300;
        let err = sub.into_record_at(stamp()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid age: must be between 10 and 100, got 300");
    }

    #[test]
    fn test_fan_since_bounds_inclusive() {
        for (years, ok) in [(-1, false), (0, true), (10, true), (11, false)] {
            let mut sub = valid();
            sub.fan_since = years;
            assert_eq!(sub.into_record_at(stamp()).is_ok(), ok, "fan_since {years}");
        }
    }

    #[test]
    fn test_unknown_choice_rejected() {
        let mut sub = valid();
        sub.purchase_frequency = "Always".to_string();
        let err = sub.into_record_at(stamp()).unwrap_err();
        assert!(matches!(err, FanError::UnknownLabel { kind: "purchase frequency", .. }));

        let mut sub = valid();
        sub.engagement_type.push("Cosplay".to_string());
        assert!(sub.into_record_at(stamp()).is_err());
    }

    #[test]
    fn test_duplicate_engagements_collapse() {
        let mut sub = valid();
        sub.engagement_type = vec![
            "Attend live events".to_string(),
            "attend-live-events".to_string(),
        ];
        let record = sub.into_record_at(stamp()).unwrap();
        assert_eq!(record.engagement_type.len(), 1);
    }

    #[test]
    fn test_submission_deserializes_from_form_payload() {
        let json = r#"{
            "name": "Carla",
            "email": "carla@example.com",
            "age": 40,
            "gender": "Prefer not to say",
            "country": "Chile",
            "fan_since": 7,
            "favorite_game": "Apex Legends",
            "purchase_frequency": "Very frequently"
        }"#;
        let sub: Submission = serde_json::from_str(json).unwrap();
        let record = sub.into_record_at(stamp()).unwrap();
        assert_eq!(record.gender, Gender::PreferNotToSay);
        assert!(record.engagement_type.is_empty());
        assert_eq!(record.platform_count(), 0);
    }
}
