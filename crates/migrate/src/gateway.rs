//! Execution Gateway
//!
//! Sends built statements to the store client and normalizes the outcome.
//! Failures are logged together with the offending statement and returned
//! with the client's own error attached.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{Instrument, Span};

use crate::backends::{CqlSession, QueryOutcome};
use crate::error::{MigrateError, MigrateResult};

pub struct ExecutionGateway {
    session: RwLock<Option<Arc<dyn CqlSession>>>,
    span: Span,
}

impl ExecutionGateway {
    pub fn new(session: Arc<dyn CqlSession>, span: Span) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            span,
        }
    }

    /// Run one statement and wait for its completion
    pub async fn execute(&self, statement: &str) -> MigrateResult<QueryOutcome> {
        let session = self.session.read().await.clone().ok_or(MigrateError::Closed)?;

        async move {
            match session.execute(statement).await {
                Ok(outcome) => {
                    tracing::debug!("Executed CQL: {}", statement);
                    Ok(outcome)
                }
                Err(e) => {
                    tracing::error!("{}", e.message());
                    tracing::debug!("Failed CQL: {}", statement);
                    Err(MigrateError::Execution {
                        statement: statement.to_string(),
                        source: e,
                    })
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Release the client handle. Later calls are no-ops.
    pub async fn close(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            session.shutdown().await;
            self.span.in_scope(|| tracing::info!("Cassandra connection closed"));
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.session.read().await.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ClientError, ClientErrorKind, MemorySession};

    #[tokio::test]
    async fn test_failure_carries_client_error() {
        let store = MemorySession::shared();
        store.fail_next(ClientError::new(ClientErrorKind::Syntax, "line 1:0 no viable alternative"));
        let gateway = ExecutionGateway::new(store.clone(), Span::none());

        let err = gateway.execute("DROP TABL users").await.unwrap_err();
        assert_eq!(err.statement(), Some("DROP TABL users"));
        assert_eq!(err.client_error().map(|e| e.kind()), Some(ClientErrorKind::Syntax));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MemorySession::shared();
        let gateway = ExecutionGateway::new(store.clone(), Span::none());

        gateway.close().await;
        gateway.close().await;

        assert!(gateway.is_closed().await);
        assert_eq!(store.shutdown_count(), 1);
        assert!(matches!(gateway.execute("DROP TABLE users").await, Err(MigrateError::Closed)));
        assert!(store.statements().is_empty());
    }
}
