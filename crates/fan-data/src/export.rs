//! CSV and JSON export of a record subset.
//!
//! Exports read records only; nothing here touches the store or filters.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use fan_core::error::{FanError, Result};
use fan_core::models::{Choice, FanRecord};
use fan_core::time_utils::format_timestamp;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Separator between activities in a CSV `engagement_type` cell.
pub const ENGAGEMENT_SEPARATOR: &str = "; ";

// ── Column ────────────────────────────────────────────────────────────────────

/// An exportable record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Email,
    Age,
    Gender,
    Country,
    City,
    FanSince,
    FavoriteGame,
    Instagram,
    Twitter,
    Twitch,
    Discord,
    EngagementType,
    PurchaseFrequency,
    Timestamp,
}

impl Column {
    /// Every column, in record field order.
    pub const ALL: [Column; 15] = [
        Column::Name,
        Column::Email,
        Column::Age,
        Column::Gender,
        Column::Country,
        Column::City,
        Column::FanSince,
        Column::FavoriteGame,
        Column::Instagram,
        Column::Twitter,
        Column::Twitch,
        Column::Discord,
        Column::EngagementType,
        Column::PurchaseFrequency,
        Column::Timestamp,
    ];

    /// Header / key name, identical to the persisted field name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Email => "email",
            Column::Age => "age",
            Column::Gender => "gender",
            Column::Country => "country",
            Column::City => "city",
            Column::FanSince => "fan_since",
            Column::FavoriteGame => "favorite_game",
            Column::Instagram => "instagram",
            Column::Twitter => "twitter",
            Column::Twitch => "twitch",
            Column::Discord => "discord",
            Column::EngagementType => "engagement_type",
            Column::PurchaseFrequency => "purchase_frequency",
            Column::Timestamp => "timestamp",
        }
    }

    /// The cell text written to CSV. Absent values are empty.
    fn text(self, r: &FanRecord) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Column::Name => r.name.clone(),
            Column::Email => r.email.clone(),
            Column::Age => r.age.to_string(),
            Column::Gender => r.gender.label().to_string(),
            Column::Country => r.country.clone(),
            Column::City => opt(&r.city),
            Column::FanSince => r.fan_since.to_string(),
            Column::FavoriteGame => r.favorite_game.label().to_string(),
            Column::Instagram => opt(&r.instagram),
            Column::Twitter => opt(&r.twitter),
            Column::Twitch => opt(&r.twitch),
            Column::Discord => opt(&r.discord),
            Column::EngagementType => r
                .engagement_type
                .iter()
                .map(|a| a.label())
                .collect::<Vec<_>>()
                .join(ENGAGEMENT_SEPARATOR),
            Column::PurchaseFrequency => r.purchase_frequency.label().to_string(),
            Column::Timestamp => format_timestamp(&r.timestamp),
        }
    }

    /// The JSON value written for this column. Absent values are `null`.
    fn value(self, r: &FanRecord) -> Value {
        let opt = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
        match self {
            Column::Age => Value::from(r.age),
            Column::FanSince => Value::from(r.fan_since),
            Column::City => opt(&r.city),
            Column::Instagram => opt(&r.instagram),
            Column::Twitter => opt(&r.twitter),
            Column::Twitch => opt(&r.twitch),
            Column::Discord => opt(&r.discord),
            Column::EngagementType => Value::Array(
                r.engagement_type
                    .iter()
                    .map(|a| Value::from(a.label()))
                    .collect(),
            ),
            other => Value::String(other.text(r)),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Column::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| FanError::UnknownLabel {
                kind: "column",
                value: s.trim().to_string(),
            })
    }
}

/// Resolve user-supplied column names.
///
/// An empty list selects every column. Repeats are dropped, keeping the
/// first occurrence's position.
pub fn parse_columns(names: &[String]) -> Result<Vec<Column>> {
    if names.is_empty() {
        return Ok(Column::ALL.to_vec());
    }
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column: Column = name.parse()?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(columns)
}

// ── ExportFormat ──────────────────────────────────────────────────────────────

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = FanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(FanError::UnknownLabel {
                kind: "export format",
                value: other.to_string(),
            }),
        }
    }
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Write `records` as CSV: a header row, then one row per record.
pub fn write_csv<W: Write>(out: W, records: &[FanRecord], columns: &[Column]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(columns.iter().map(|c| c.name()))
        .map_err(csv_error)?;
    for r in records {
        writer
            .write_record(columns.iter().map(|c| c.text(r)))
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `records` as a pretty JSON array of objects holding only `columns`,
/// keyed in column order.
pub fn write_json<W: Write>(mut out: W, records: &[FanRecord], columns: &[Column]) -> Result<()> {
    let rows: Vec<Value> = records
        .iter()
        .map(|r| {
            let object: Map<String, Value> = columns
                .iter()
                .map(|c| (c.name().to_string(), c.value(r)))
                .collect();
            Value::Object(object)
        })
        .collect();
    serde_json::to_writer_pretty(&mut out, &rows)?;
    writeln!(out)?;
    Ok(())
}

/// Render an export into memory.
pub fn render(records: &[FanRecord], columns: &[Column], format: ExportFormat) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        ExportFormat::Csv => write_csv(&mut buf, records, columns)?,
        ExportFormat::Json => write_json(&mut buf, records, columns)?,
    }
    Ok(buf)
}

/// Export `records` to `path`, returning how many rows were written.
///
/// An empty subset is [`FanError::NothingToExport`] and leaves `path`
/// untouched.
pub fn export_to_file(
    path: &Path,
    records: &[FanRecord],
    columns: &[Column],
    format: ExportFormat,
) -> Result<usize> {
    if records.is_empty() {
        return Err(FanError::NothingToExport);
    }

    let bytes = render(records, columns, format)?;
    std::fs::write(path, bytes).map_err(|source| FanError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        rows = records.len(),
        columns = columns.len(),
        "exported {} to {}",
        format.extension(),
        path.display()
    );
    Ok(records.len())
}

fn csv_error(e: csv::Error) -> FanError {
    debug!("csv writer failed: {}", e);
    FanError::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::record_at;
    use fan_core::models::EngagementActivity;
    use tempfile::TempDir;

    fn sample() -> FanRecord {
        let mut r = record_at("Ana", 3, "2024-05-01 12:34:56");
        r.city = Some("São Paulo, SP".to_string());
        r.instagram = Some("ana.ig".to_string());
        r.engagement_type = [
            EngagementActivity::WatchMatchesOnline,
            EngagementActivity::AttendLiveEvents,
        ]
        .into_iter()
        .collect();
        r
    }

    fn csv_text(records: &[FanRecord], columns: &[Column]) -> String {
        String::from_utf8(render(records, columns, ExportFormat::Csv).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_columns() {
        assert_eq!(parse_columns(&[]).unwrap().len(), 15);
        let names = vec!["email".to_string(), "Fan Since".to_string(), "email".to_string()];
        assert_eq!(
            parse_columns(&names).unwrap(),
            vec![Column::Email, Column::FanSince]
        );
        let err = parse_columns(&["shoe_size".to_string()]).unwrap_err();
        assert!(matches!(err, FanError::UnknownLabel { kind: "column", .. }));
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_csv_header_and_row() {
        let text = csv_text(&[sample()], &Column::ALL);
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "name,email,age,gender,country,city,fan_since,favorite_game,instagram,twitter,\
             twitch,discord,engagement_type,purchase_frequency,timestamp"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Ana,ana@example.com,24,Female,Brazil,\"São Paulo, SP\",3,Counter-Strike,ana.ig,,,,\
             Watch matches online; Attend live events,Never,2024-05-01 12:34:56"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_column_subset_in_chosen_order() {
        let text = csv_text(&[sample()], &[Column::Timestamp, Column::Name]);
        assert_eq!(text, "timestamp,name\n2024-05-01 12:34:56,Ana\n");
    }

    #[test]
    fn test_json_objects_hold_only_chosen_columns() {
        let columns = [Column::Twitter, Column::Age, Column::EngagementType];
        let bytes = render(&[sample()], &columns, ExportFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        let object = value[0].as_object().unwrap();

        let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["twitter", "age", "engagement_type"]);
        assert_eq!(object["twitter"], Value::Null);
        assert_eq!(object["age"], 24);
        assert_eq!(object["engagement_type"][1], "Attend live events");
    }

    #[test]
    fn test_json_timestamp_format() {
        let bytes = render(&[sample()], &[Column::Timestamp], ExportFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["timestamp"], "2024-05-01 12:34:56");
    }

    #[test]
    fn test_export_to_file_writes_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fans.csv");
        let rows = export_to_file(&path, &[sample(), sample()], &Column::ALL, ExportFormat::Csv)
            .unwrap();
        assert_eq!(rows, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_export_empty_subset_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fans.json");
        let err = export_to_file(&path, &[], &Column::ALL, ExportFormat::Json).unwrap_err();
        assert!(matches!(err, FanError::NothingToExport));
        assert!(!path.exists());
    }

    #[test]
    fn test_render_empty_subset_is_header_only() {
        assert_eq!(csv_text(&[], &[Column::Name, Column::Email]), "name,email\n");
        let bytes = render(&[], &[Column::Name], ExportFormat::Json).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim(), "[]");
    }
}
