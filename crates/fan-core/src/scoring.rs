//! Engagement scoring and loyalty segmentation.
//!
//! Scores are recomputed from records on demand and never persisted, so a
//! change to the weight table needs no data migration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Choice, FanRecord, PurchaseFrequency};

// ── Weights ───────────────────────────────────────────────────────────────────

/// Points per year as a fan.
pub const FAN_SINCE_WEIGHT: u32 = 10;
/// Points per distinct engagement activity.
pub const ENGAGEMENT_WEIGHT: u32 = 5;
/// Points per platform with a handle.
pub const PLATFORM_WEIGHT: u32 = 5;

/// Points contributed by the merchandise purchase frequency.
pub fn purchase_weight(frequency: PurchaseFrequency) -> u32 {
    match frequency {
        PurchaseFrequency::Never => 0,
        PurchaseFrequency::Rarely => 5,
        PurchaseFrequency::Occasionally => 15,
        PurchaseFrequency::Frequently => 25,
        PurchaseFrequency::VeryFrequently => 40,
    }
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// Loyalty tier derived from an engagement score, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Casual,
    Regular,
    Dedicated,
    Superfan,
}

impl Segment {
    /// Map a score to its tier. Each bucket includes its lower bound.
    ///
    /// * `< 30` → Casual
    /// * `30..60` → Regular
    /// * `60..90` → Dedicated
    /// * `>= 90` → Superfan
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=29 => Segment::Casual,
            30..=59 => Segment::Regular,
            60..=89 => Segment::Dedicated,
            _ => Segment::Superfan,
        }
    }
}

impl Choice for Segment {
    const KIND: &'static str = "segment";
    const ALL: &'static [Self] = &[
        Segment::Casual,
        Segment::Regular,
        Segment::Dedicated,
        Segment::Superfan,
    ];

    fn label(self) -> &'static str {
        match self {
            Segment::Casual => "Casual",
            Segment::Regular => "Regular",
            Segment::Dedicated => "Dedicated",
            Segment::Superfan => "Superfan",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── EngagementScore ───────────────────────────────────────────────────────────

/// A fan's computed score together with its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementScore {
    pub score: u32,
    pub segment: Segment,
}

/// Score a single record: years, purchase weight, activities and platforms.
///
/// # Examples
///
/// A two-year fan buying occasionally, with two activities and two
/// platforms, scores `20 + 15 + 10 + 10 = 55`, a Regular.
pub fn score(record: &FanRecord) -> EngagementScore {
    let years = u32::from(record.fan_since) * FAN_SINCE_WEIGHT;
    let purchases = purchase_weight(record.purchase_frequency);
    let activities = record.engagement_type.len() as u32 * ENGAGEMENT_WEIGHT;
    let platforms = record.platform_count() as u32 * PLATFORM_WEIGHT;

    let score = years + purchases + activities + platforms;
    EngagementScore {
        score,
        segment: Segment::from_score(score),
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

/// A record paired with its score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredFan<'a> {
    pub record: &'a FanRecord,
    pub engagement: EngagementScore,
}

/// Score every record, highest first. Ties keep their input order.
pub fn rank(records: &[FanRecord]) -> Vec<ScoredFan<'_>> {
    let mut scored: Vec<ScoredFan<'_>> = records
        .iter()
        .map(|record| ScoredFan {
            record,
            engagement: score(record),
        })
        .collect();
    scored.sort_by(|a, b| b.engagement.score.cmp(&a.engagement.score));
    scored
}

/// The `n` highest-scoring fans.
pub fn top_fans(records: &[FanRecord], n: usize) -> Vec<ScoredFan<'_>> {
    let mut ranked = rank(records);
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::bare_record;
    use crate::models::EngagementActivity;

    // ── Segment boundaries ─────────────────────────────────────────────────

    #[test]
    fn test_segment_boundaries() {
        let cases = [
            (0, Segment::Casual),
            (29, Segment::Casual),
            (30, Segment::Regular),
            (59, Segment::Regular),
            (60, Segment::Dedicated),
            (89, Segment::Dedicated),
            (90, Segment::Superfan),
            (210, Segment::Superfan),
            (u32::MAX, Segment::Superfan),
        ];
        for (score, expected) in cases {
            assert_eq!(Segment::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_segment_labels() {
        let labels: Vec<&str> = Segment::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["Casual", "Regular", "Dedicated", "Superfan"]);
        assert_eq!(Segment::parse_label("superfan").unwrap(), Segment::Superfan);
    }

    #[test]
    fn test_segment_order() {
        assert!(Segment::Casual < Segment::Regular);
        assert!(Segment::Dedicated < Segment::Superfan);
    }

    // ── score ──────────────────────────────────────────────────────────────

    #[test]
    fn test_score_worked_example_regular() {
        let mut record = bare_record();
        record.fan_since = 2;
        record.purchase_frequency = PurchaseFrequency::Occasionally;
        record.engagement_type = [
            EngagementActivity::WatchMatchesOnline,
            EngagementActivity::FollowOnSocialMedia,
        ]
        .into_iter()
        .collect();
        record.instagram = Some("fan.ig".to_string());
        record.discord = Some("fan#1".to_string());

        let result = score(&record);
        assert_eq!(result.score, 55);
        assert_eq!(result.segment, Segment::Regular);
    }

    #[test]
    fn test_score_empty_record_is_casual_zero() {
        let result = score(&bare_record());
        assert_eq!(result.score, 0);
        assert_eq!(result.segment, Segment::Casual);
    }

    #[test]
    fn test_score_practical_maximum() {
        let mut record = bare_record();
        record.fan_since = 10;
        record.purchase_frequency = PurchaseFrequency::VeryFrequently;
        record.engagement_type = EngagementActivity::ALL.iter().copied().collect();
        record.instagram = Some("a".to_string());
        record.twitter = Some("b".to_string());
        record.twitch = Some("c".to_string());
        record.discord = Some("d".to_string());

        let result = score(&record);
        assert_eq!(result.score, 100 + 40 + 30 + 20);
        assert_eq!(result.segment, Segment::Superfan);
    }

    #[test]
    fn test_purchase_weights() {
        let weights: Vec<u32> = PurchaseFrequency::ALL
            .iter()
            .map(|p| purchase_weight(*p))
            .collect();
        assert_eq!(weights, vec![0, 5, 15, 25, 40]);
    }

    // ── rank / top_fans ────────────────────────────────────────────────────

    #[test]
    fn test_rank_orders_by_score_desc_stable() {
        let mut low = bare_record();
        low.name = "low".to_string();
        let mut high = bare_record();
        high.name = "high".to_string();
        high.fan_since = 9;
        let mut tie = bare_record();
        tie.name = "tie".to_string();

        let records = vec![low, high, tie];
        let ranked = rank(&records);
        let names: Vec<&str> = ranked.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "tie"]);
    }

    #[test]
    fn test_top_fans_truncates() {
        let records: Vec<FanRecord> = (0..15u8)
            .map(|i| {
                let mut r = bare_record();
                r.fan_since = i % 11;
                r
            })
            .collect();
        assert_eq!(top_fans(&records, 10).len(), 10);
        assert_eq!(top_fans(&records[..3], 10).len(), 3);
        assert!(top_fans(&[], 10).is_empty());
    }
}
