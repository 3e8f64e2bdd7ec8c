//! Summaries over a (filtered) record subset.
//!
//! Every function here is pure and returns an empty result for empty input.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fan_core::models::{Choice, FanRecord, Platform, AGE_MAX, AGE_MIN};
use fan_core::scoring;
use serde::Serialize;

/// Bin width used by the demographics report's age histogram.
pub const AGE_HISTOGRAM_WIDTH: u8 = 5;

// ── Result rows ───────────────────────────────────────────────────────────────

/// Number of records carrying one category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

impl CategoryCount {
    fn new(category: impl Into<String>, count: usize) -> Self {
        Self {
            category: category.into(),
            count,
        }
    }
}

/// Number of records with exactly `platforms` handles present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformBucket {
    pub platforms: usize,
    pub count: usize,
}

/// Submissions on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Records with a given number of years as a fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearsCount {
    pub years: u8,
    pub count: usize,
}

/// One age histogram bin, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBin {
    pub start: u8,
    pub end: u8,
    pub count: usize,
}

/// Contact details of a fan present on every platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformFan {
    pub name: String,
    pub email: String,
    pub country: String,
    pub instagram: String,
    pub twitter: String,
    pub twitch: String,
    pub discord: String,
}

/// An email address shared by more than one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEmail {
    pub email: String,
    pub count: usize,
}

// ── FanAggregator ─────────────────────────────────────────────────────────────

/// Stateless collection of aggregation routines.
pub struct FanAggregator;

impl FanAggregator {
    /// Records per gender, in declaration order. Absent genders are omitted.
    pub fn count_by_gender(records: &[FanRecord]) -> Vec<CategoryCount> {
        count_choices(records.iter().map(|r| r.gender), false)
    }

    /// Records per favorite game, in declaration order.
    pub fn count_by_favorite_game(records: &[FanRecord]) -> Vec<CategoryCount> {
        count_choices(records.iter().map(|r| r.favorite_game), false)
    }

    /// Records per purchase frequency, Never → Very frequently.
    ///
    /// All five levels are listed, zeros included, whenever the input is
    /// non-empty.
    pub fn count_by_purchase_frequency(records: &[FanRecord]) -> Vec<CategoryCount> {
        count_choices(records.iter().map(|r| r.purchase_frequency), true)
    }

    /// Records per country, most common first; ties by name.
    pub fn count_by_country(records: &[FanRecord]) -> Vec<CategoryCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in records {
            *counts.entry(r.country.as_str()).or_default() += 1;
        }
        let mut rows: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(country, count)| CategoryCount::new(country, count))
            .collect();
        // Stable sort keeps the BTreeMap's name order within equal counts.
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }

    /// The `n` most common countries.
    pub fn top_countries(records: &[FanRecord], n: usize) -> Vec<CategoryCount> {
        let mut rows = Self::count_by_country(records);
        rows.truncate(n);
        rows
    }

    /// How many records list a handle for each platform. All four platforms
    /// are listed whenever the input is non-empty.
    pub fn platform_presence(records: &[FanRecord]) -> Vec<CategoryCount> {
        if records.is_empty() {
            return Vec::new();
        }
        Platform::ALL
            .iter()
            .map(|&p| {
                let count = records.iter().filter(|r| r.has_platform(p)).count();
                CategoryCount::new(p.label(), count)
            })
            .collect()
    }

    /// Records grouped by how many platforms they are present on, ascending.
    /// Only observed counts appear.
    pub fn platform_co_occurrence(records: &[FanRecord]) -> Vec<PlatformBucket> {
        let mut buckets: BTreeMap<usize, usize> = BTreeMap::new();
        for r in records {
            *buckets.entry(r.platform_count()).or_default() += 1;
        }
        buckets
            .into_iter()
            .map(|(platforms, count)| PlatformBucket { platforms, count })
            .collect()
    }

    /// Submissions per calendar date, oldest first.
    pub fn submissions_per_day(records: &[FanRecord]) -> Vec<DailyCount> {
        let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for r in records {
            *days.entry(r.timestamp.date()).or_default() += 1;
        }
        days.into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect()
    }

    /// How many records selected each engagement activity.
    pub fn engagement_frequency(records: &[FanRecord]) -> Vec<CategoryCount> {
        count_choices(
            records.iter().flat_map(|r| r.engagement_type.iter().copied()),
            false,
        )
    }

    /// Records per years-as-fan value, ascending.
    pub fn fan_since_distribution(records: &[FanRecord]) -> Vec<YearsCount> {
        let mut years: BTreeMap<u8, usize> = BTreeMap::new();
        for r in records {
            *years.entry(r.fan_since).or_default() += 1;
        }
        years
            .into_iter()
            .map(|(years, count)| YearsCount { years, count })
            .collect()
    }

    /// Records per loyalty segment, Casual → Superfan, zeros included.
    pub fn segment_distribution(records: &[FanRecord]) -> Vec<CategoryCount> {
        count_choices(records.iter().map(|r| scoring::score(r).segment), true)
    }

    /// Equal-width age bins covering the whole accepted age range.
    ///
    /// Bins start at the minimum age; the last bin is clipped to the maximum.
    /// A width of zero is treated as one.
    pub fn age_histogram(records: &[FanRecord], width: u8) -> Vec<AgeBin> {
        if records.is_empty() {
            return Vec::new();
        }
        let width = width.max(1);
        let span = usize::from(AGE_MAX - AGE_MIN) + 1;
        let bins = span.div_ceil(usize::from(width));

        let mut counts = vec![0usize; bins];
        for r in records {
            let age = r.age.clamp(AGE_MIN, AGE_MAX);
            let idx = usize::from((age - AGE_MIN) / width);
            counts[idx.min(bins - 1)] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let start = usize::from(AGE_MIN) + i * usize::from(width);
                let end = (start + usize::from(width) - 1).min(usize::from(AGE_MAX));
                AgeBin {
                    start: start as u8,
                    end: end as u8,
                    count,
                }
            })
            .collect()
    }

    /// Contact rows for every fan with all four handles present.
    pub fn fans_on_all_platforms(records: &[FanRecord]) -> Vec<PlatformFan> {
        records
            .iter()
            .filter_map(|r| {
                Some(PlatformFan {
                    name: r.name.clone(),
                    email: r.email.clone(),
                    country: r.country.clone(),
                    instagram: r.handle(Platform::Instagram)?.to_string(),
                    twitter: r.handle(Platform::Twitter)?.to_string(),
                    twitch: r.handle(Platform::Twitch)?.to_string(),
                    discord: r.handle(Platform::Discord)?.to_string(),
                })
            })
            .collect()
    }

    /// Emails used by more than one record, most repeated first.
    ///
    /// Comparison ignores case and surrounding whitespace.
    pub fn duplicate_emails(records: &[FanRecord]) -> Vec<DuplicateEmail> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in records {
            *counts.entry(r.email.trim().to_lowercase()).or_default() += 1;
        }
        let mut dups: Vec<DuplicateEmail> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(email, count)| DuplicateEmail { email, count })
            .collect();
        dups.sort_by(|a, b| b.count.cmp(&a.count));
        dups
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Count closed-choice values in their fixed order.
///
/// With `keep_zero` every choice is listed; otherwise only observed ones.
/// Empty input always yields an empty result.
fn count_choices<C>(values: impl Iterator<Item = C>, keep_zero: bool) -> Vec<CategoryCount>
where
    C: Choice + Ord,
{
    let mut counts: BTreeMap<C, usize> = BTreeMap::new();
    let mut seen = false;
    for v in values {
        *counts.entry(v).or_default() += 1;
        seen = true;
    }
    if !seen {
        return Vec::new();
    }
    C::ALL
        .iter()
        .filter_map(|c| {
            let count = counts.get(c).copied().unwrap_or(0);
            (keep_zero || count > 0).then(|| CategoryCount::new(c.label(), count))
        })
        .collect()
}
