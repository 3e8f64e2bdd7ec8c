use fan_core::filter::FilterSpec;
use fan_core::models::{Choice, FanRecord, FavoriteGame, Gender};
use serde::Serialize;

/// The records matching `spec`, in their original order.
///
/// Pure: applying the same filter twice yields the same subset, and the
/// default filter returns every record.
pub fn apply(records: &[FanRecord], spec: &FilterSpec) -> Vec<FanRecord> {
    records
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect()
}

/// The values a filter control can offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub genders: Vec<Gender>,
    /// Distinct countries in first-seen order.
    pub countries: Vec<String>,
    pub favorite_games: Vec<FavoriteGame>,
}

/// Options for the filter controls: fixed enum order for genders and games,
/// and the distinct countries present in `records`.
pub fn available_options(records: &[FanRecord]) -> FilterOptions {
    let mut countries: Vec<String> = Vec::new();
    for r in records {
        if !countries.iter().any(|c| c == &r.country) {
            countries.push(r.country.clone());
        }
    }
    FilterOptions {
        genders: Gender::ALL.to_vec(),
        countries,
        favorite_games: FavoriteGame::ALL.to_vec(),
    }
}
