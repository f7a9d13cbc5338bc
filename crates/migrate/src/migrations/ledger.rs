//! Migration Ledger - statements for the migration history table
//!
//! The ledger table holds one row per applied migration:
//! `name varchar PRIMARY KEY, ran_on timestamp`.

use crate::backends::{CqlValue, RowSet};
use crate::error::{MigrateError, MigrateResult};
use crate::schema_builder::{self, ColumnSpec, TableConstraints};

use super::definitions::{AppliedMigration, MigrationName, RAN_ON_FORMAT};

/// Default ledger table name
pub const DEFAULT_MIGRATIONS_TABLE: &str = "migrations";

/// Rendered in place of a timestamp that could not be parsed; the store
/// rejects it like any other malformed date.
const INVALID_DATE: &str = "Invalid date";

/// Builds and interprets ledger statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationLedger {
    table: String,
}

impl MigrationLedger {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into() }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ledger schema
    pub fn columns() -> ColumnSpec {
        ColumnSpec::new().column("name", "varchar").column("ran_on", "timestamp")
    }

    /// CQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        schema_builder::create_table(
            &self.table,
            &Self::columns(),
            &TableConstraints::new().primary_key("name"),
        )
    }

    /// CQL to record a migration as applied
    pub fn record_sql(&self, name: &MigrationName) -> String {
        let ran_on = match name.ran_on() {
            Ok(ts) => ts.format(RAN_ON_FORMAT).to_string(),
            Err(e) => {
                tracing::warn!("{}", e);
                INVALID_DATE.to_string()
            }
        };
        format!(
            "INSERT INTO {} (name, ran_on) VALUES ({}, {})",
            self.table,
            quote_literal(name.as_str()),
            quote_literal(&ran_on)
        )
    }

    /// CQL to list applied migrations.
    ///
    /// The table is keyed by name only, so ordering happens client side in
    /// [`MigrationLedger::applied_from_rows`].
    pub fn list_sql(&self) -> String {
        format!("SELECT * FROM {}", self.table)
    }

    /// CQL to remove a migration record
    pub fn remove_sql(&self, name: &MigrationName) -> String {
        format!("DELETE FROM {} WHERE name = {}", self.table, quote_literal(name.as_str()))
    }

    /// Interpret the rows of [`MigrationLedger::list_sql`], most recent first.
    /// Rows without a readable `ran_on` come last.
    pub fn applied_from_rows(&self, rows: RowSet) -> MigrateResult<Vec<AppliedMigration>> {
        let mut applied = rows
            .rows
            .into_iter()
            .map(|row| -> MigrateResult<AppliedMigration> {
                let name = row
                    .get("name")
                    .and_then(CqlValue::as_text)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        MigrateError::Decode(format!("row of {} without a text 'name' column", self.table))
                    })?;
                Ok(AppliedMigration::from_row(name, row))
            })
            .collect::<MigrateResult<Vec<_>>>()?;

        applied.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
        Ok(applied)
    }
}

impl Default for MigrationLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MIGRATIONS_TABLE)
    }
}

/// CQL string literal with embedded quotes doubled
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Row;
    use chrono::{TimeZone, Utc};

    fn row(name: &str, ran_on: CqlValue) -> Row {
        vec![("name", CqlValue::from(name)), ("ran_on", ran_on)].into_iter().collect()
    }

    #[test]
    fn test_create_table_sql() {
        let ledger = MigrationLedger::default();
        assert_eq!(
            ledger.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS migrations ( name varchar, ran_on timestamp, PRIMARY KEY (name) )"
        );
        assert_eq!(ledger.create_table_sql(), ledger.create_table_sql());
    }

    #[test]
    fn test_record_sql() {
        let ledger = MigrationLedger::default();
        assert_eq!(
            ledger.record_sql(&MigrationName::new("/20240219143050-add-users")),
            "INSERT INTO migrations (name, ran_on) VALUES ('20240219143050-add-users', '2024-02-19 14:30:50')"
        );
    }

    #[test]
    fn test_record_sql_with_malformed_name() {
        let ledger = MigrationLedger::default();
        assert_eq!(
            ledger.record_sql(&MigrationName::new("add-users")),
            "INSERT INTO migrations (name, ran_on) VALUES ('add-users', 'Invalid date')"
        );
    }

    #[test]
    fn test_insert_and_delete_address_the_same_name() {
        let ledger = MigrationLedger::new("schema_history");
        let name = MigrationName::new("/20240219143050-it's");

        assert!(ledger.record_sql(&name).contains("'20240219143050-it''s'"));
        assert_eq!(
            ledger.remove_sql(&MigrationName::new("20240219143050-it's")),
            "DELETE FROM schema_history WHERE name = '20240219143050-it''s'"
        );
        assert_eq!(ledger.list_sql(), "SELECT * FROM schema_history");
    }

    #[test]
    fn test_applied_from_rows_orders_newest_first() {
        let ledger = MigrationLedger::default();
        let ts = |d: u32| CqlValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap());
        let rows = RowSet::new(
            vec!["name".to_string(), "ran_on".to_string()],
            vec![
                row("20240102000000-b", ts(2)),
                row("unknown", CqlValue::Null),
                row("20240103000000-c", ts(3)),
                row("20240101000000-a", ts(1)),
            ],
        );

        let names: Vec<String> = ledger
            .applied_from_rows(rows)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            vec!["20240103000000-c", "20240102000000-b", "20240101000000-a", "unknown"]
        );
    }

    #[test]
    fn test_applied_from_rows_requires_name() {
        let ledger = MigrationLedger::default();
        let rows = RowSet::new(
            vec!["ran_on".to_string()],
            vec![vec![("ran_on", CqlValue::Null)].into_iter().collect()],
        );
        assert!(matches!(ledger.applied_from_rows(rows), Err(MigrateError::Decode(_))));
    }
}
