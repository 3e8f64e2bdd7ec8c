use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::filter::FilterSpec;
use crate::models::{FavoriteGame, Gender};
use crate::validation::Submission;

/// Name of the per-user application directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".fan-analytics";
/// Default record file name inside the application directory.
pub const DATA_FILE_NAME: &str = "fan_data.json";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Fan survey collection and analytics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fan-analytics",
    about = "Fan survey collection and analytics",
    version
)]
pub struct Settings {
    /// Record file (defaults to ~/.fan-analytics/fan_data.json)
    #[arg(long, global = true, env = "FAN_ANALYTICS_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when absent)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record a new fan survey response
    Submit(SubmitArgs),

    /// Print a report over the filtered records as JSON
    Report {
        /// Report page
        #[arg(value_parser = ["demographics", "social", "engagement"])]
        page: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Export the filtered records as CSV or JSON
    Export(ExportArgs),

    /// Print the engagement score and segment of every matching fan
    Score {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

/// Survey fields for `submit`. Values are validated when converted into a
/// record, not by the argument parser.
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Age (10-100)
    #[arg(long, default_value_t = 25)]
    pub age: i64,

    /// Male, Female, Non-binary or "Prefer not to say"
    #[arg(long)]
    pub gender: String,

    /// Country
    #[arg(long)]
    pub country: String,

    /// City
    #[arg(long)]
    pub city: Option<String>,

    /// Years as a fan (0-10)
    #[arg(long, default_value_t = 1)]
    pub fan_since: i64,

    /// Counter-Strike, "League of Legends", Valorant, "Apex Legends" or Other
    #[arg(long)]
    pub favorite_game: String,

    /// Instagram username
    #[arg(long)]
    pub instagram: Option<String>,

    /// Twitter username
    #[arg(long)]
    pub twitter: Option<String>,

    /// Twitch username
    #[arg(long)]
    pub twitch: Option<String>,

    /// Discord username
    #[arg(long)]
    pub discord: Option<String>,

    /// Engagement activity (repeatable)
    #[arg(long = "engagement")]
    pub engagement_type: Vec<String>,

    /// Never, Rarely, Occasionally, Frequently or "Very frequently"
    #[arg(long, default_value = "Never")]
    pub purchase_frequency: String,
}

impl From<SubmitArgs> for Submission {
    fn from(args: SubmitArgs) -> Self {
        Submission {
            name: args.name,
            email: args.email,
            age: args.age,
            gender: args.gender,
            country: args.country,
            city: args.city,
            fan_since: args.fan_since,
            favorite_game: args.favorite_game,
            instagram: args.instagram,
            twitter: args.twitter,
            twitch: args.twitch,
            discord: args.discord,
            engagement_type: args.engagement_type,
            purchase_frequency: args.purchase_frequency,
        }
    }
}

/// Arguments for `export`.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output format
    #[arg(long, default_value = "csv", value_parser = ["csv", "json"])]
    pub format: String,

    /// Comma-separated columns to include, in order (default: all)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Destination file (stdout when absent)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ── FilterArgs ─────────────────────────────────────────────────────────────────

/// Filter flags shared by the read-only subcommands.
///
/// Flags left off the command line fall back to the last-used filters.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// Minimum age (inclusive)
    #[arg(long, value_parser = clap::value_parser!(u8).range(10..=100))]
    pub age_min: Option<u8>,

    /// Maximum age (inclusive)
    #[arg(long, value_parser = clap::value_parser!(u8).range(10..=100))]
    pub age_max: Option<u8>,

    /// Allowed gender (repeatable)
    #[arg(long = "gender")]
    pub genders: Vec<Gender>,

    /// Allowed country (repeatable)
    #[arg(long = "country")]
    pub countries: Vec<String>,

    /// Allowed favorite game (repeatable)
    #[arg(long = "game")]
    pub games: Vec<FavoriteGame>,

    /// Minimum years as a fan (inclusive)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub fan_since_min: Option<u8>,

    /// Maximum years as a fan (inclusive)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub fan_since_max: Option<u8>,

    /// Drop a remembered gender restriction
    #[arg(long, conflicts_with = "genders")]
    pub any_gender: bool,

    /// Drop a remembered country restriction
    #[arg(long, conflicts_with = "countries")]
    pub any_country: bool,

    /// Drop a remembered favorite-game restriction
    #[arg(long, conflicts_with = "games")]
    pub any_game: bool,

    /// Discard all last-used filters and start from the defaults
    /// (use --any-gender / --any-country / --any-game to clear just one)
    #[arg(long)]
    pub reset_filters: bool,
}

impl FilterArgs {
    /// Build the effective filter for this run and persist it to `state_path`.
    ///
    /// Explicit flags override the persisted filters; `--reset-filters`
    /// deletes the persisted file first. Fails on inverted ranges.
    pub fn resolve(&self, state_path: &Path) -> Result<FilterSpec> {
        let mut spec = if self.reset_filters {
            if let Err(e) = LastUsedFilters::clear_at(state_path) {
                warn!("could not clear {}: {}", state_path.display(), e);
            }
            FilterSpec::default()
        } else {
            LastUsedFilters::load_from(state_path).filters
        };

        self.apply_to(&mut spec);
        spec.validate()?;

        let last = LastUsedFilters {
            filters: spec.clone(),
        };
        if let Err(e) = last.save_to(state_path) {
            warn!("could not persist filters to {}: {}", state_path.display(), e);
        }

        Ok(spec)
    }

    /// Overwrite the constraints of `spec` that were given on the command line.
    ///
    /// Category flags replace the remembered set; the `any_*` flags empty it.
    pub fn apply_to(&self, spec: &mut FilterSpec) {
        if self.any_gender {
            spec.gender.clear();
        }
        if self.any_country {
            spec.country.clear();
        }
        if self.any_game {
            spec.favorite_game.clear();
        }
        if let Some(v) = self.age_min {
            spec.age_range.0 = v;
        }
        if let Some(v) = self.age_max {
            spec.age_range.1 = v;
        }
        if let Some(v) = self.fan_since_min {
            spec.fan_since_range.0 = v;
        }
        if let Some(v) = self.fan_since_max {
            spec.fan_since_range.1 = v;
        }
        if !self.genders.is_empty() {
            spec.gender = self.genders.iter().copied().collect();
        }
        if !self.countries.is_empty() {
            spec.country = self
                .countries
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if !self.games.is_empty() {
            spec.favorite_game = self.games.iter().copied().collect();
        }
    }
}

// ── LastUsedFilters ────────────────────────────────────────────────────────────

/// Filters persisted between runs in `~/.fan-analytics/last_filters.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedFilters {
    #[serde(default)]
    pub filters: FilterSpec,
}

impl LastUsedFilters {
    /// Return the default path to the persisted filter file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the filter file path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_filters.json")
    }

    /// Load persisted filters from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring unreadable filter state {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Atomically write filters to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the filter file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but from an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The record file to use: `--data-file` when given, otherwise the
    /// default file in the application directory.
    pub fn data_file_path(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| app_dir().join(DATA_FILE_NAME))
    }
}

/// `~/.fan-analytics`.
pub fn app_dir() -> PathBuf {
    home_dir().join(APP_DIR_NAME)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
