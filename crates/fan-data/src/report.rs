//! Report pages assembled from a filtered subset.
//!
//! Every page starts from [`filter::apply`] and carries a
//! [`ReportMetadata`] block so a consumer can tell how much of the store
//! the numbers cover.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use fan_core::error::{FanError, Result};
use fan_core::filter::FilterSpec;
use fan_core::models::FanRecord;
use fan_core::scoring::{self, ScoredFan, Segment};
use fan_core::time_utils::{format_timestamp, now_local};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{
    AgeBin, CategoryCount, DailyCount, DuplicateEmail, FanAggregator, PlatformBucket, PlatformFan,
    YearsCount, AGE_HISTOGRAM_WIDTH,
};
use crate::filter::{self, FilterOptions};

/// How many countries the demographics page lists.
pub const TOP_COUNTRIES: usize = 10;
/// How many fans the engagement page ranks.
pub const TOP_FANS: usize = 10;

// ── Public types ──────────────────────────────────────────────────────────────

/// Which report page to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPage {
    Demographics,
    Social,
    Engagement,
}

impl ReportPage {
    pub fn name(self) -> &'static str {
        match self {
            ReportPage::Demographics => "demographics",
            ReportPage::Social => "social",
            ReportPage::Engagement => "engagement",
        }
    }
}

impl fmt::Display for ReportPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportPage {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "demographics" => Ok(ReportPage::Demographics),
            "social" => Ok(ReportPage::Social),
            "engagement" => Ok(ReportPage::Engagement),
            other => Err(FanError::UnknownLabel {
                kind: "report page",
                value: other.to_string(),
            }),
        }
    }
}

/// Metadata produced alongside every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    /// Local time the report was generated, in the record timestamp format.
    pub generated_at: String,
    /// Records in the store.
    pub total_records: usize,
    /// Records left after filtering.
    pub matching_records: usize,
    /// The filter that was applied.
    pub filters: FilterSpec,
    /// Whether `filters` admits every record.
    pub unrestricted: bool,
    /// Values the filter controls can offer, taken from the whole store.
    pub filter_options: FilterOptions,
}

/// One fan's score, as listed by the `score` command and the top-fans table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanScoreRow {
    pub name: String,
    pub email: String,
    pub country: String,
    pub score: u32,
    pub segment: Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicsReport {
    pub metadata: ReportMetadata,
    pub age_histogram: Vec<AgeBin>,
    pub gender: Vec<CategoryCount>,
    pub top_countries: Vec<CategoryCount>,
    pub favorite_games: Vec<CategoryCount>,
    pub fan_since: Vec<YearsCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialReport {
    pub metadata: ReportMetadata,
    pub platform_presence: Vec<CategoryCount>,
    pub platform_co_occurrence: Vec<PlatformBucket>,
    pub fans_on_all_platforms: Vec<PlatformFan>,
    /// Emails submitted more than once within the subset.
    pub duplicate_emails: Vec<DuplicateEmail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementReport {
    pub metadata: ReportMetadata,
    pub engagement_types: Vec<CategoryCount>,
    pub purchase_frequency: Vec<CategoryCount>,
    pub submissions_per_day: Vec<DailyCount>,
    pub segments: Vec<CategoryCount>,
    pub top_fans: Vec<FanScoreRow>,
}

/// A built report page. Serializes with a `"page"` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "lowercase")]
pub enum Report {
    Demographics(DemographicsReport),
    Social(SocialReport),
    Engagement(EngagementReport),
}

impl Report {
    pub fn metadata(&self) -> &ReportMetadata {
        match self {
            Report::Demographics(r) => &r.metadata,
            Report::Social(r) => &r.metadata,
            Report::Engagement(r) => &r.metadata,
        }
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Build `page` over the records matching `spec`, stamped with the current
/// local time.
pub fn build_report(page: ReportPage, records: &[FanRecord], spec: &FilterSpec) -> Report {
    build_report_at(page, records, spec, now_local())
}

/// Build `page`, stamped with `generated_at`.
pub fn build_report_at(
    page: ReportPage,
    records: &[FanRecord],
    spec: &FilterSpec,
    generated_at: NaiveDateTime,
) -> Report {
    let subset = filter::apply(records, spec);
    debug!(
        page = page.name(),
        total = records.len(),
        matching = subset.len(),
        "building report"
    );

    let metadata = ReportMetadata {
        generated_at: format_timestamp(&generated_at),
        total_records: records.len(),
        matching_records: subset.len(),
        filters: spec.clone(),
        unrestricted: spec.is_unrestricted(),
        filter_options: filter::available_options(records),
    };

    match page {
        ReportPage::Demographics => Report::Demographics(DemographicsReport {
            metadata,
            age_histogram: FanAggregator::age_histogram(&subset, AGE_HISTOGRAM_WIDTH),
            gender: FanAggregator::count_by_gender(&subset),
            top_countries: FanAggregator::top_countries(&subset, TOP_COUNTRIES),
            favorite_games: FanAggregator::count_by_favorite_game(&subset),
            fan_since: FanAggregator::fan_since_distribution(&subset),
        }),
        ReportPage::Social => Report::Social(SocialReport {
            metadata,
            platform_presence: FanAggregator::platform_presence(&subset),
            platform_co_occurrence: FanAggregator::platform_co_occurrence(&subset),
            fans_on_all_platforms: FanAggregator::fans_on_all_platforms(&subset),
            duplicate_emails: FanAggregator::duplicate_emails(&subset),
        }),
        ReportPage::Engagement => Report::Engagement(EngagementReport {
            metadata,
            engagement_types: FanAggregator::engagement_frequency(&subset),
            purchase_frequency: FanAggregator::count_by_purchase_frequency(&subset),
            submissions_per_day: FanAggregator::submissions_per_day(&subset),
            segments: FanAggregator::segment_distribution(&subset),
            top_fans: scoring::top_fans(&subset, TOP_FANS)
                .iter()
                .map(FanScoreRow::from)
                .collect(),
        }),
    }
}

/// Every record's score, highest first.
pub fn score_rows(records: &[FanRecord]) -> Vec<FanScoreRow> {
    scoring::rank(records).iter().map(FanScoreRow::from).collect()
}

impl From<&ScoredFan<'_>> for FanScoreRow {
    fn from(s: &ScoredFan<'_>) -> Self {
        FanScoreRow {
            name: s.record.name.clone(),
            email: s.record.email.clone(),
            country: s.record.country.clone(),
            score: s.engagement.score,
            segment: s.engagement.segment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::record;
    use fan_core::time_utils::parse_timestamp;

    fn stamp() -> NaiveDateTime {
        parse_timestamp("2024-07-01 09:00:00").unwrap()
    }

    fn sample() -> Vec<FanRecord> {
        let mut chile = record("Bia", 9);
        chile.country = "Chile".to_string();
        chile.age = 40;
        vec![record("Ana", 1), chile, record("Cris", 4)]
    }

    #[test]
    fn test_page_from_str() {
        assert_eq!("Social".parse::<ReportPage>().unwrap(), ReportPage::Social);
        assert!("finance".parse::<ReportPage>().is_err());
    }

    #[test]
    fn test_metadata_counts_filtered_subset() {
        let mut spec = FilterSpec::default();
        spec.country.insert("Brazil".to_string());
        let report = build_report_at(ReportPage::Social, &sample(), &spec, stamp());
        let meta = report.metadata();
        assert_eq!(meta.total_records, 3);
        assert_eq!(meta.matching_records, 2);
        assert_eq!(meta.generated_at, "2024-07-01 09:00:00");
        assert!(!meta.unrestricted);
        // Options describe the whole store, not the filtered subset.
        assert_eq!(meta.filter_options.countries, vec!["Brazil", "Chile"]);
    }

    #[test]
    fn test_social_page_reports_duplicate_emails() {
        let mut again = record("Ana", 3);
        again.email = "ANA@example.com ".to_string();
        let mut records = sample();
        records.push(again);

        let report = build_report_at(ReportPage::Social, &records, &FilterSpec::default(), stamp());
        let Report::Social(page) = report else {
            panic!("expected social page");
        };
        assert!(page.metadata.unrestricted);
        assert_eq!(page.duplicate_emails.len(), 1);
        assert_eq!(page.duplicate_emails[0].email, "ana@example.com");
        assert_eq!(page.duplicate_emails[0].count, 2);
    }

    #[test]
    fn test_top_fans_capped_at_ten() {
        let records: Vec<FanRecord> = (0..12u8).map(|i| record("Fan", i % 11)).collect();
        let report =
            build_report_at(ReportPage::Engagement, &records, &FilterSpec::default(), stamp());
        let Report::Engagement(page) = report else {
            panic!("expected engagement page");
        };
        assert_eq!(page.top_fans.len(), TOP_FANS);
        assert_eq!(page.top_fans[0].score, 100);
        assert_eq!(page.top_fans, score_rows(&records)[..TOP_FANS].to_vec());
    }

    #[test]
    fn test_demographics_page() {
        let report = build_report_at(
            ReportPage::Demographics,
            &sample(),
            &FilterSpec::default(),
            stamp(),
        );
        let Report::Demographics(page) = report else {
            panic!("expected demographics page");
        };
        assert_eq!(page.top_countries[0].category, "Brazil");
        assert_eq!(page.top_countries[0].count, 2);
        assert_eq!(page.age_histogram.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(page.fan_since.len(), 3);
    }

    #[test]
    fn test_engagement_page_ranks_top_fans() {
        let report = build_report_at(
            ReportPage::Engagement,
            &sample(),
            &FilterSpec::default(),
            stamp(),
        );
        let Report::Engagement(page) = report else {
            panic!("expected engagement page");
        };
        let names: Vec<&str> = page.top_fans.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Bia", "Cris", "Ana"]);
        assert_eq!(page.top_fans[0].segment, Segment::Superfan);
        assert_eq!(page.purchase_frequency.len(), 5);
    }

    #[test]
    fn test_empty_subset_gives_empty_sections() {
        let mut spec = FilterSpec::default();
        spec.country.insert("Japan".to_string());
        let report = build_report_at(ReportPage::Engagement, &sample(), &spec, stamp());
        let Report::Engagement(page) = report else {
            panic!("expected engagement page");
        };
        assert_eq!(page.metadata.matching_records, 0);
        assert!(page.top_fans.is_empty());
        assert!(page.segments.is_empty());
        assert!(page.purchase_frequency.is_empty());
    }

    #[test]
    fn test_report_serializes_with_page_tag() {
        let report = build_report_at(ReportPage::Social, &sample(), &FilterSpec::default(), stamp());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["page"], "social");
        assert_eq!(value["metadata"]["filters"]["age_range"][1], 100);
        assert_eq!(value["platform_co_occurrence"][0]["platforms"], 0);
        assert_eq!(value["metadata"]["unrestricted"], true);
        assert_eq!(value["metadata"]["filter_options"]["genders"][0], "Male");
        assert!(value["duplicate_emails"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_score_rows_highest_first() {
        let rows = score_rows(&sample());
        assert_eq!(rows[0].score, 90);
        assert_eq!(rows[2].score, 10);
    }
}
