//! Adapter context
//!
//! State shared by every component of one adapter instance, built once at
//! connect time and passed down explicitly.

use tracing::Span;

use crate::migrations::DEFAULT_MIGRATIONS_TABLE;

#[derive(Debug, Clone)]
pub struct AdapterContext {
    /// Ledger table name
    pub migrations_table: String,
    /// Span every statement of this adapter is recorded under
    pub span: Span,
}

impl AdapterContext {
    pub fn new(migrations_table: impl Into<String>) -> Self {
        Self {
            migrations_table: migrations_table.into(),
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach the default adapter span unless the caller supplied one
    pub(crate) fn instrumented(mut self, keyspace: &str) -> Self {
        if self.span.is_none() {
            self.span = tracing::info_span!(
                "cassandra_migrate",
                keyspace = %keyspace,
                migrations_table = %self.migrations_table
            );
        }
        self
    }
}

impl Default for AdapterContext {
    fn default() -> Self {
        Self::new(DEFAULT_MIGRATIONS_TABLE)
    }
}
