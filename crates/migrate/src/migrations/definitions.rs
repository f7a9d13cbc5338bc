//! Migration Definitions - types shared by the ledger
//!
//! Migration names start with a compact timestamp followed by `-` and a
//! description, e.g. `20240219143050-add-users`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::backends::{CqlValue, Row};

/// Canonical form of the ledger timestamp
pub const RAN_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A migration name's timestamp token could not be understood
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized migration timestamp '{token}' in '{name}'")]
pub struct TimestampParseError {
    pub name: String,
    pub token: String,
}

/// Migration name in the form stored in the ledger.
///
/// Runners may hand names over with a leading path separator
/// (`/20240219143050-add-users`); the canonical name drops it so that
/// recording and deleting a migration always address the same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MigrationName(String);

impl MigrationName {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim_start_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `-`, slashes removed
    pub fn timestamp_token(&self) -> String {
        self.0.split('-').next().unwrap_or_default().replace('/', "")
    }

    /// Descriptive part after the timestamp
    pub fn suffix(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, suffix)| suffix)
    }

    /// Parse the timestamp token.
    ///
    /// Accepts `YYYYMMDDHHmmss`, `YYYYMMDDHHmm`, `YYYYMMDDHH`, `YYYYMMDD` and a
    /// bare `YYYY`; missing fields default to the start of the period.
    pub fn ran_on(&self) -> Result<NaiveDateTime, TimestampParseError> {
        let token = self.timestamp_token();
        parse_compact_timestamp(&token).ok_or_else(|| TimestampParseError {
            name: self.0.clone(),
            token,
        })
    }
}

impl std::fmt::Display for MigrationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MigrationName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

fn parse_compact_timestamp(token: &str) -> Option<NaiveDateTime> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| token.get(range).and_then(|s| s.parse::<u32>().ok());

    let (month, day, hour, minute, second) = match token.len() {
        14 => (field(4..6)?, field(6..8)?, field(8..10)?, field(10..12)?, field(12..14)?),
        12 => (field(4..6)?, field(6..8)?, field(8..10)?, field(10..12)?, 0),
        10 => (field(4..6)?, field(6..8)?, field(8..10)?, 0, 0),
        8 => (field(4..6)?, field(6..8)?, 0, 0, 0),
        4 => (1, 1, 0, 0, 0),
        _ => return None,
    };
    let year = token.get(0..4)?.parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// A ledger row with its derived sort key
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    pub name: String,
    pub ran_on: Option<DateTime<Utc>>,
    /// Milliseconds since the epoch; `None` when `ran_on` is missing
    pub sort_key: Option<i64>,
    /// The row as returned by the store
    pub row: Row,
}

impl AppliedMigration {
    pub(crate) fn from_row(name: String, row: Row) -> Self {
        let ran_on = row.get("ran_on").and_then(ran_on_value);
        Self {
            name,
            sort_key: ran_on.map(|ts| ts.timestamp_millis()),
            ran_on,
            row,
        }
    }
}

fn ran_on_value(value: &CqlValue) -> Option<DateTime<Utc>> {
    match value {
        CqlValue::Timestamp(ts) => Some(*ts),
        CqlValue::BigInt(millis) => Utc.timestamp_millis_opt(*millis).single(),
        CqlValue::Text(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, RAN_ON_FORMAT)
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_drops_leading_slash() {
        let name = MigrationName::new("/20240219143050-add-users");
        assert_eq!(name.as_str(), "20240219143050-add-users");
        assert_eq!(name, MigrationName::new("20240219143050-add-users"));
        assert_eq!(name.suffix(), Some("add-users"));
    }

    #[test]
    fn test_ran_on_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 19)
            .unwrap()
            .and_hms_opt(14, 30, 50)
            .unwrap();
        assert_eq!(MigrationName::new("20240219143050-add-users").ran_on().unwrap(), expected);

        let minutes = MigrationName::new("202402191430-x").ran_on().unwrap();
        assert_eq!(minutes.format(RAN_ON_FORMAT).to_string(), "2024-02-19 14:30:00");

        let hour = MigrationName::new("2024021914-x").ran_on().unwrap();
        assert_eq!(hour.format(RAN_ON_FORMAT).to_string(), "2024-02-19 14:00:00");

        let day = MigrationName::new("20240219-x").ran_on().unwrap();
        assert_eq!(day.format(RAN_ON_FORMAT).to_string(), "2024-02-19 00:00:00");

        let year = MigrationName::new("2024-x").ran_on().unwrap();
        assert_eq!(year.format(RAN_ON_FORMAT).to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_malformed_timestamp() {
        let err = MigrationName::new("add-users").ran_on().unwrap_err();
        assert_eq!(err.token, "add");

        assert!(MigrationName::new("20241345000000-bad-month").ran_on().is_err());
        assert!(MigrationName::new("2024021914305-short").ran_on().is_err());
        assert!(MigrationName::new("2024021925-bad-hour").ran_on().is_err());
        assert!(MigrationName::new("202402-month-only").ran_on().is_err());
    }

    #[test]
    fn test_applied_migration_from_text_row() {
        let row: Row = vec![
            ("name", CqlValue::from("20240219143050-add-users")),
            ("ran_on", CqlValue::from("2024-02-19 14:30:50")),
        ]
        .into_iter()
        .collect();
        let applied = AppliedMigration::from_row("20240219143050-add-users".to_string(), row);

        assert!(applied.ran_on.is_some());
        assert_eq!(applied.sort_key, applied.ran_on.map(|ts| ts.timestamp_millis()));
    }
}
