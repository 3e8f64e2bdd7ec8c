use chrono::{Local, NaiveDateTime, SubsecRound};
use tracing::warn;

use crate::error::{FanError, Result};

/// Fixed on-disk timestamp format. No timezone is recorded; all times are
/// naive local times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats accepted when reading, tried in order. Only the first is ever
/// written.
const ACCEPTED_FORMATS: &[&str] = &[
    TIMESTAMP_FORMAT,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Current local wall-clock time truncated to whole seconds, so that a
/// freshly stamped record survives a write/read cycle unchanged.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Render `ts` in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp string.
///
/// Sub-second digits are accepted but dropped, so the value held in memory
/// is exactly what [`format_timestamp`] writes back. Returns `None` for
/// empty strings or unrecognised formats.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in ACCEPTED_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(ts.trunc_subsecs(0));
        }
    }

    warn!("could not parse timestamp \"{}\"", s);
    None
}

/// Like [`parse_timestamp`], but an unparseable string is a
/// [`FanError::TimestampParse`].
pub fn parse_timestamp_strict(s: &str) -> Result<NaiveDateTime> {
    parse_timestamp(s).ok_or_else(|| FanError::TimestampParse(s.trim().to_string()))
}

/// `serde(with = ...)` adapter for [`NaiveDateTime`] fields stored in
/// [`TIMESTAMP_FORMAT`].
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp_strict(&raw).map_err(D::Error::custom)
    }
}
