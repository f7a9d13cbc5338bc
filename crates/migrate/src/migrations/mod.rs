//! Migration System
//!
//! Bookkeeping of applied migrations: the name model and the ledger
//! statements built on top of the schema builder.

pub mod definitions;
pub mod ledger;

pub use definitions::{AppliedMigration, MigrationName, TimestampParseError, RAN_ON_FORMAT};
pub use ledger::{MigrationLedger, DEFAULT_MIGRATIONS_TABLE};
