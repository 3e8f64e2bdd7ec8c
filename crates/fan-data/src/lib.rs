//! Data layer for Fan Analytics.
//!
//! Owns the persisted record store, the filter engine, the aggregators that
//! summarise a filtered subset, CSV / JSON exports, and assembly of the
//! three report pages.

pub mod aggregator;
pub mod export;
pub mod filter;
pub mod report;
pub mod store;

pub use fan_core as core;

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use fan_core::models::{FanRecord, FavoriteGame, Gender, PurchaseFrequency};
    use fan_core::time_utils::parse_timestamp;

    /// A minimal valid record named `name` with `fan_since` years.
    pub(crate) fn record(name: &str, fan_since: u8) -> FanRecord {
        record_at(name, fan_since, "2024-05-01 12:00:00")
    }

    /// Like [`record`], stamped at `timestamp`.
    pub(crate) fn record_at(name: &str, fan_since: u8, timestamp: &str) -> FanRecord {
        FanRecord {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            age: 24,
            gender: Gender::Female,
            country: "Brazil".to_string(),
            city: None,
            fan_since,
            favorite_game: FavoriteGame::CounterStrike,
            instagram: None,
            twitter: None,
            twitch: None,
            discord: None,
            engagement_type: BTreeSet::new(),
            purchase_frequency: PurchaseFrequency::Never,
            timestamp: parse_timestamp(timestamp).expect("fixture timestamp"),
        }
    }
}
