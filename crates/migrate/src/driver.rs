//! Cassandra migration driver
//!
//! The adapter a migration runner talks to. Each operation builds one
//! statement, sends it through the [`ExecutionGateway`] and waits for it;
//! nothing is queued, batched or retried here.

use std::sync::Arc;

use cassandra_migrate_core::{ConnectionDescriptor, DatabaseConfig};

use crate::backends::{ClientFactory, CqlSession, QueryOutcome};
use crate::context::AdapterContext;
use crate::error::{MigrateError, MigrateResult};
use crate::gateway::ExecutionGateway;
use crate::migrations::{AppliedMigration, MigrationLedger, MigrationName};
use crate::schema_builder::{self, ColumnSpec, TableConstraints};

pub struct CassandraDriver {
    descriptor: ConnectionDescriptor,
    context: AdapterContext,
    ledger: MigrationLedger,
    gateway: ExecutionGateway,
}

impl CassandraDriver {
    /// Resolve `config` and build a client through `factory`.
    ///
    /// Configuration errors are returned before the factory is called.
    pub async fn connect(
        config: &DatabaseConfig,
        context: AdapterContext,
        factory: &dyn ClientFactory,
    ) -> MigrateResult<Self> {
        let descriptor = config.resolve()?;
        let client = factory
            .connect(&descriptor, &descriptor.auth_provider())
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to {:?}: {}", descriptor.hosts(), e);
                MigrateError::Connection(e)
            })?;
        Ok(Self::assemble(descriptor, context, client))
    }

    /// Resolve `config` and reuse a client handle the caller already built
    pub fn with_client(
        config: &DatabaseConfig,
        context: AdapterContext,
        client: Arc<dyn CqlSession>,
    ) -> MigrateResult<Self> {
        let descriptor = config.resolve()?;
        Ok(Self::assemble(descriptor, context, client))
    }

    fn assemble(descriptor: ConnectionDescriptor, context: AdapterContext, client: Arc<dyn CqlSession>) -> Self {
        let context = context.instrumented(descriptor.keyspace());
        let ledger = MigrationLedger::new(context.migrations_table.clone());
        let gateway = ExecutionGateway::new(client, context.span.clone());
        context.span.in_scope(|| {
            tracing::info!(
                "Cassandra migration driver ready (hosts: {})",
                descriptor.hosts().join(",")
            )
        });
        Self {
            descriptor,
            context,
            ledger,
            gateway,
        }
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &AdapterContext {
        &self.context
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Run a raw CQL statement
    pub async fn execute(&self, cql: &str) -> MigrateResult<QueryOutcome> {
        self.gateway.execute(cql).await
    }

    async fn run(&self, cql: String) -> MigrateResult<()> {
        self.gateway.execute(&cql).await.map(|_| ())
    }

    /// Create a table; without constraints no PRIMARY KEY clause is emitted
    pub async fn create_table(
        &self,
        table_name: &str,
        columns: &ColumnSpec,
        constraints: Option<&TableConstraints>,
    ) -> MigrateResult<()> {
        let default_constraints = TableConstraints::default();
        let constraints = constraints.unwrap_or(&default_constraints);
        self.run(schema_builder::create_table(table_name, columns, constraints))
            .await
    }

    pub async fn drop_table(&self, table_name: &str) -> MigrateResult<()> {
        self.run(schema_builder::drop_table(table_name)).await
    }

    pub async fn add_column(&self, table_name: &str, column_name: &str, column_type: &str) -> MigrateResult<()> {
        self.run(schema_builder::add_column(table_name, column_name, column_type))
            .await
    }

    pub async fn remove_column(&self, table_name: &str, column_name: &str) -> MigrateResult<()> {
        self.run(schema_builder::remove_column(table_name, column_name))
            .await
    }

    pub async fn rename_column(
        &self,
        table_name: &str,
        column_name: &str,
        new_column_name: &str,
    ) -> MigrateResult<()> {
        self.run(schema_builder::rename_column(table_name, column_name, new_column_name))
            .await
    }

    pub async fn change_column(&self, table_name: &str, column_name: &str, column_type: &str) -> MigrateResult<()> {
        self.run(schema_builder::change_column(table_name, column_name, column_type))
            .await
    }

    /// Create the ledger table if it does not exist yet
    pub async fn create_migrations_table(&self) -> MigrateResult<()> {
        self.run(self.ledger.create_table_sql()).await
    }

    /// Applied migrations, most recently applied first
    pub async fn all_loaded_migrations(&self) -> MigrateResult<Vec<AppliedMigration>> {
        let statement = self.ledger.list_sql();
        let rows = self
            .gateway
            .execute(&statement)
            .await?
            .into_rows()
            .ok_or_else(|| MigrateError::Decode(format!("'{}' returned no result set", statement)))?;
        self.ledger.applied_from_rows(rows)
    }

    /// Record a migration as applied
    pub async fn add_migration_record(&self, name: &str) -> MigrateResult<()> {
        self.run(self.ledger.record_sql(&MigrationName::new(name))).await
    }

    /// Remove a migration record
    pub async fn delete_migration(&self, name: &str) -> MigrateResult<()> {
        self.run(self.ledger.remove_sql(&MigrationName::new(name))).await
    }

    /// Whether the ledger has a record for `name`
    pub async fn is_applied(&self, name: &str) -> MigrateResult<bool> {
        let name = MigrationName::new(name);
        Ok(self
            .all_loaded_migrations()
            .await?
            .iter()
            .any(|m| m.name == name.as_str()))
    }

    /// Release the client handle. Safe to call more than once.
    pub async fn close(&self) {
        self.gateway.close().await
    }
}
