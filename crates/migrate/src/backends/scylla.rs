//! Cassandra client built on the `scylla` driver
//!
//! The driver speaks the native protocol to both Apache Cassandra and
//! ScyllaDB. Connection pooling, retries and timeouts stay with the driver.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::{DbError, ExecutionError, RequestAttemptError};
use scylla::value::{CqlValue as DriverValue, Row as DriverRow};

use cassandra_migrate_core::{ConnectionDescriptor, PlainTextAuthProvider};

use super::core::*;

/// Builds [`ScyllaSession`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct ScyllaClientFactory;

#[async_trait]
impl ClientFactory for ScyllaClientFactory {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        auth: &PlainTextAuthProvider,
    ) -> Result<Arc<dyn CqlSession>, ClientError> {
        let mut builder = SessionBuilder::new()
            .known_nodes(descriptor.contact_points())
            .use_keyspace(descriptor.keyspace(), false);
        if let (Some(user), Some(password)) = (auth.username(), auth.password()) {
            builder = builder.user(user, password);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| ClientError::new(ClientErrorKind::Unavailable, e.to_string()))?;
        tracing::debug!("Cassandra session established with {:?}", descriptor.hosts());

        Ok(Arc::new(ScyllaSession { session }))
    }
}

/// [`CqlSession`] over a driver session
pub struct ScyllaSession {
    session: Session,
}

impl ScyllaSession {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, ClientError> {
        let result = self.session.query_unpaged(cql, ()).await.map_err(classify)?;
        if !result.is_rows() {
            return Ok(QueryOutcome::Void);
        }

        let rows_result = result
            .into_rows_result()
            .map_err(|e| ClientError::new(ClientErrorKind::Other, e.to_string()))?;
        let columns: Vec<String> = rows_result
            .column_specs()
            .iter()
            .map(|spec| spec.name().to_string())
            .collect();

        let mut rows = Vec::new();
        for row in rows_result
            .rows::<DriverRow>()
            .map_err(|e| ClientError::new(ClientErrorKind::Other, e.to_string()))?
        {
            let row = row.map_err(|e| ClientError::new(ClientErrorKind::Other, e.to_string()))?;
            rows.push(Row::new(
                columns
                    .iter()
                    .cloned()
                    .zip(row.columns.into_iter().map(convert))
                    .collect(),
            ));
        }

        Ok(QueryOutcome::Rows(RowSet::new(columns, rows)))
    }
}

fn classify(err: ExecutionError) -> ClientError {
    let kind = match &err {
        ExecutionError::LastAttemptError(RequestAttemptError::DbError(db_error, _)) => match db_error {
            DbError::SyntaxError => ClientErrorKind::Syntax,
            DbError::Invalid | DbError::AlreadyExists { .. } | DbError::ConfigError => ClientErrorKind::Invalid,
            DbError::Unauthorized | DbError::AuthenticationError => ClientErrorKind::Unauthorized,
            DbError::Unavailable { .. } | DbError::Overloaded | DbError::IsBootstrapping => {
                ClientErrorKind::Unavailable
            }
            DbError::ReadTimeout { .. } | DbError::WriteTimeout { .. } => ClientErrorKind::Timeout,
            _ => ClientErrorKind::Other,
        },
        ExecutionError::RequestTimeout(_) => ClientErrorKind::Timeout,
        _ => ClientErrorKind::Other,
    };
    ClientError::new(kind, err.to_string())
}

fn convert(value: Option<DriverValue>) -> CqlValue {
    match value {
        None | Some(DriverValue::Empty) => CqlValue::Null,
        Some(DriverValue::Boolean(b)) => CqlValue::Boolean(b),
        Some(DriverValue::Int(i)) => CqlValue::Int(i),
        Some(DriverValue::BigInt(i)) => CqlValue::BigInt(i),
        Some(DriverValue::Double(f)) => CqlValue::Double(f),
        Some(DriverValue::Text(s)) | Some(DriverValue::Ascii(s)) => CqlValue::Text(s),
        Some(DriverValue::Timestamp(ts)) => Utc
            .timestamp_millis_opt(ts.0)
            .single()
            .map_or(CqlValue::Null, CqlValue::Timestamp),
        Some(DriverValue::Uuid(u)) => CqlValue::Uuid(u),
        Some(DriverValue::Blob(b)) => CqlValue::Blob(b),
        Some(DriverValue::List(items)) | Some(DriverValue::Set(items)) => {
            CqlValue::List(items.into_iter().map(|v| convert(Some(v))).collect())
        }
        Some(other) => CqlValue::Text(format!("{:?}", other)),
    }
}

#[cfg(all(test, feature = "scylla"))]
mod tests {
    use super::*;
    use scylla::value::CqlTimestamp;

    #[test]
    fn test_convert_timestamp() {
        let converted = convert(Some(DriverValue::Timestamp(CqlTimestamp(1_708_353_050_000))));
        assert_eq!(
            converted.as_timestamp().map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Some("2024-02-19 14:30:50".to_string())
        );
    }

    #[test]
    fn test_convert_text_kinds() {
        assert_eq!(
            convert(Some(DriverValue::Text("20240219143050-add-users".to_string()))),
            CqlValue::Text("20240219143050-add-users".to_string())
        );
        assert_eq!(
            convert(Some(DriverValue::Ascii("init".to_string()))),
            CqlValue::Text("init".to_string())
        );
    }

    #[test]
    fn test_convert_collections() {
        let expected = CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)]);
        assert_eq!(
            convert(Some(DriverValue::List(vec![DriverValue::Int(1), DriverValue::Int(2)]))),
            expected
        );
        assert_eq!(
            convert(Some(DriverValue::Set(vec![DriverValue::Int(1), DriverValue::Int(2)]))),
            expected
        );
    }

    #[test]
    fn test_convert_missing_values() {
        assert_eq!(convert(None), CqlValue::Null);
        assert_eq!(convert(Some(DriverValue::Empty)), CqlValue::Null);
    }
}
