use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FanError, Result};

/// Youngest accepted fan age.
pub const AGE_MIN: u8 = 10;
/// Oldest accepted fan age.
pub const AGE_MAX: u8 = 100;
/// Lowest accepted "fan since" value, in years.
pub const FAN_SINCE_MIN: u8 = 0;
/// Highest accepted "fan since" value, in years.
pub const FAN_SINCE_MAX: u8 = 10;

// ── Choice ────────────────────────────────────────────────────────────────────

/// A closed-choice survey field with a fixed, ordered list of labels.
pub trait Choice: Sized + Copy + 'static {
    /// Field name used in error messages.
    const KIND: &'static str;
    /// Every value in its fixed category order.
    const ALL: &'static [Self];

    /// Human label, identical to the persisted spelling.
    fn label(self) -> &'static str;

    /// Resolve a label, ignoring case and treating spaces, underscores and
    /// hyphens alike (`"Prefer not to say"` == `"prefer-not-to-say"`).
    fn parse_label(s: &str) -> Result<Self> {
        let wanted = normalize_label(s);
        Self::ALL
            .iter()
            .copied()
            .find(|c| normalize_label(c.label()) == wanted)
            .ok_or_else(|| FanError::UnknownLabel {
                kind: Self::KIND,
                value: s.trim().to_string(),
            })
    }
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect()
}

// ── Gender ────────────────────────────────────────────────────────────────────

/// Self-reported gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Non-binary")]
    NonBinary,
    #[serde(rename = "Prefer not to say")]
    PreferNotToSay,
}

impl Choice for Gender {
    const KIND: &'static str = "gender";
    const ALL: &'static [Self] = &[
        Gender::Male,
        Gender::Female,
        Gender::NonBinary,
        Gender::PreferNotToSay,
    ];

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-binary",
            Gender::PreferNotToSay => "Prefer not to say",
        }
    }
}

// ── FavoriteGame ──────────────────────────────────────────────────────────────

/// The esport title a fan follows most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FavoriteGame {
    #[serde(rename = "Counter-Strike")]
    CounterStrike,
    #[serde(rename = "League of Legends")]
    LeagueOfLegends,
    Valorant,
    #[serde(rename = "Apex Legends")]
    ApexLegends,
    Other,
}

impl Choice for FavoriteGame {
    const KIND: &'static str = "favorite game";
    const ALL: &'static [Self] = &[
        FavoriteGame::CounterStrike,
        FavoriteGame::LeagueOfLegends,
        FavoriteGame::Valorant,
        FavoriteGame::ApexLegends,
        FavoriteGame::Other,
    ];

    fn label(self) -> &'static str {
        match self {
            FavoriteGame::CounterStrike => "Counter-Strike",
            FavoriteGame::LeagueOfLegends => "League of Legends",
            FavoriteGame::Valorant => "Valorant",
            FavoriteGame::ApexLegends => "Apex Legends",
            FavoriteGame::Other => "Other",
        }
    }
}

// ── EngagementActivity ────────────────────────────────────────────────────────

/// One way a fan engages with the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngagementActivity {
    #[serde(rename = "Watch matches online")]
    WatchMatchesOnline,
    #[serde(rename = "Attend live events")]
    AttendLiveEvents,
    #[serde(rename = "Purchase merchandise")]
    PurchaseMerchandise,
    #[serde(rename = "Follow on social media")]
    FollowOnSocialMedia,
    #[serde(rename = "Participate in fan communities")]
    ParticipateInFanCommunities,
    Other,
}

impl Choice for EngagementActivity {
    const KIND: &'static str = "engagement type";
    const ALL: &'static [Self] = &[
        EngagementActivity::WatchMatchesOnline,
        EngagementActivity::AttendLiveEvents,
        EngagementActivity::PurchaseMerchandise,
        EngagementActivity::FollowOnSocialMedia,
        EngagementActivity::ParticipateInFanCommunities,
        EngagementActivity::Other,
    ];

    fn label(self) -> &'static str {
        match self {
            EngagementActivity::WatchMatchesOnline => "Watch matches online",
            EngagementActivity::AttendLiveEvents => "Attend live events",
            EngagementActivity::PurchaseMerchandise => "Purchase merchandise",
            EngagementActivity::FollowOnSocialMedia => "Follow on social media",
            EngagementActivity::ParticipateInFanCommunities => "Participate in fan communities",
            EngagementActivity::Other => "Other",
        }
    }
}

// ── PurchaseFrequency ─────────────────────────────────────────────────────────

/// How often a fan buys merchandise. Variants are declared in ascending
/// order, so the derived `Ord` is the survey's ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PurchaseFrequency {
    Never,
    Rarely,
    Occasionally,
    Frequently,
    #[serde(rename = "Very frequently")]
    VeryFrequently,
}

impl Choice for PurchaseFrequency {
    const KIND: &'static str = "purchase frequency";
    const ALL: &'static [Self] = &[
        PurchaseFrequency::Never,
        PurchaseFrequency::Rarely,
        PurchaseFrequency::Occasionally,
        PurchaseFrequency::Frequently,
        PurchaseFrequency::VeryFrequently,
    ];

    fn label(self) -> &'static str {
        match self {
            PurchaseFrequency::Never => "Never",
            PurchaseFrequency::Rarely => "Rarely",
            PurchaseFrequency::Occasionally => "Occasionally",
            PurchaseFrequency::Frequently => "Frequently",
            PurchaseFrequency::VeryFrequently => "Very frequently",
        }
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// A social platform a fan may list a handle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    Instagram,
    Twitter,
    Twitch,
    Discord,
}

impl Choice for Platform {
    const KIND: &'static str = "platform";
    const ALL: &'static [Self] = &[
        Platform::Instagram,
        Platform::Twitter,
        Platform::Twitch,
        Platform::Discord,
    ];

    fn label(self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::Twitter => "Twitter",
            Platform::Twitch => "Twitch",
            Platform::Discord => "Discord",
        }
    }
}

// `Display` / `FromStr` go through `Choice` for every closed-choice field.

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gender {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_label(s)
    }
}

impl fmt::Display for FavoriteGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FavoriteGame {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_label(s)
    }
}

impl fmt::Display for EngagementActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EngagementActivity {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_label(s)
    }
}

impl fmt::Display for PurchaseFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PurchaseFrequency {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_label(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── FanRecord ─────────────────────────────────────────────────────────────────

/// One fan's survey submission, as persisted in the record file.
///
/// Records are only ever built through
/// [`Submission::into_record`](crate::validation::Submission::into_record)
/// or read back from disk; ranges are not re-checked downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanRecord {
    /// Full name, non-empty.
    pub name: String,
    /// Contact email, non-empty. Not unique.
    pub email: String,
    /// Age in years, within [`AGE_MIN`]..=[`AGE_MAX`].
    pub age: u8,
    pub gender: Gender,
    /// Free-text country, non-empty.
    pub country: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub city: Option<String>,
    /// Years as a fan, within [`FAN_SINCE_MIN`]..=[`FAN_SINCE_MAX`].
    pub fan_since: u8,
    pub favorite_game: FavoriteGame,
    #[serde(default, deserialize_with = "optional_text")]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub twitch: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub discord: Option<String>,
    /// Distinct engagement activities. May be empty.
    #[serde(default, deserialize_with = "nullable_set")]
    pub engagement_type: BTreeSet<EngagementActivity>,
    pub purchase_frequency: PurchaseFrequency,
    /// Naive local submission time, second precision.
    #[serde(with = "crate::time_utils::timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl FanRecord {
    /// The handle listed for `platform`, if any.
    pub fn handle(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Instagram => self.instagram.as_deref(),
            Platform::Twitter => self.twitter.as_deref(),
            Platform::Twitch => self.twitch.as_deref(),
            Platform::Discord => self.discord.as_deref(),
        }
    }

    /// Whether the fan is present on `platform`.
    pub fn has_platform(&self, platform: Platform) -> bool {
        self.handle(platform).is_some()
    }

    /// Number of platforms (0–4) the fan lists a handle for.
    pub fn platform_count(&self) -> usize {
        Platform::ALL
            .iter()
            .filter(|p| self.has_platform(**p))
            .count()
    }
}

/// Trim `value` and map blank strings to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Optional text fields: `null`, missing and blank strings all mean absent.
fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_optional(raw))
}

fn nullable_set<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeSet<EngagementActivity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeSet<EngagementActivity>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}
