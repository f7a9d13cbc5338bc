//! Error types for the migration adapter
//!
//! Configuration problems are returned from `connect`; everything that goes
//! wrong while talking to the store arrives through the operation's result.

use thiserror::Error;

use crate::backends::ClientError;
use cassandra_migrate_core::ConfigError;

/// Result type alias for adapter operations
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error types for adapter operations
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Settings could not be resolved into a connection descriptor
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The store client could not be constructed
    #[error("Connection error: {0}")]
    Connection(#[source] ClientError),

    /// The store rejected or failed to run a statement
    #[error("Execution error: {source} (statement: {statement})")]
    Execution {
        statement: String,
        #[source]
        source: ClientError,
    },

    /// A row returned by the store did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The adapter was closed before the statement was issued
    #[error("Connection already closed")]
    Closed,
}

impl MigrateError {
    /// The statement that failed, for execution errors
    pub fn statement(&self) -> Option<&str> {
        match self {
            MigrateError::Execution { statement, .. } => Some(statement),
            _ => None,
        }
    }

    /// The underlying client error, if the store was involved
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            MigrateError::Connection(source) | MigrateError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}
