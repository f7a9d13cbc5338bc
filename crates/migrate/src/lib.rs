//! # cassandra-migrate: schema migrations for Apache Cassandra
//!
//! Translates schema-change operations (create/drop table, add/remove/
//! rename/change column) and migration bookkeeping into CQL, runs them
//! against a live session and tracks which migrations have been applied.
//!
//! ```ignore
//! use cassandra_migrate::{AdapterContext, CassandraDriver, ColumnSpec, DatabaseConfig, TableConstraints};
//!
//! let config = DatabaseConfig::new("app").with_host("10.0.0.1,10.0.0.2");
//! let db = CassandraDriver::connect(&config, AdapterContext::default(), &ScyllaClientFactory).await?;
//!
//! db.create_migrations_table().await?;
//! db.create_table(
//!     "users",
//!     &ColumnSpec::new().column("name", "varchar").column("age", "int"),
//!     Some(&TableConstraints::new().primary_key("name")),
//! )
//! .await?;
//! db.add_migration_record("20240219143050-add-users").await?;
//! db.close().await;
//! ```

pub mod backends;
pub mod completion;
pub mod context;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod migrations;
pub mod schema_builder;

// Re-export core traits and types
pub use backends::{ClientError, ClientErrorKind, ClientFactory, CqlSession, CqlValue, MemorySession, QueryOutcome, Row, RowSet};
#[cfg(feature = "scylla")]
pub use backends::{ScyllaClientFactory, ScyllaSession};
pub use cassandra_migrate_core::{ConfigError, ConnectionDescriptor, DatabaseConfig, HostSetting, PlainTextAuthProvider};
pub use completion::{notify, CompletionExt};
pub use context::AdapterContext;
pub use driver::CassandraDriver;
pub use error::{MigrateError, MigrateResult};
pub use gateway::ExecutionGateway;
pub use migrations::{AppliedMigration, MigrationLedger, MigrationName};
pub use schema_builder::{ColumnSpec, TableConstraints};
