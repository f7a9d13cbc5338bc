//! Core store client traits
//!
//! The adapter never talks to the network itself. It hands statements to a
//! [`CqlSession`] and builds sessions through a [`ClientFactory`]; these
//! traits are the only surface a driver has to provide.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use cassandra_migrate_core::{ConnectionDescriptor, PlainTextAuthProvider};

/// Broad classification of store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorKind {
    /// Statement could not be parsed
    Syntax,
    /// Statement is well formed but invalid for the current schema or data
    Invalid,
    /// Authentication or authorization failed
    Unauthorized,
    /// Not enough replicas or no reachable host
    Unavailable,
    /// The coordinator or client timed out
    Timeout,
    Other,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::Syntax => write!(f, "syntax error"),
            ClientErrorKind::Invalid => write!(f, "invalid request"),
            ClientErrorKind::Unauthorized => write!(f, "unauthorized"),
            ClientErrorKind::Unavailable => write!(f, "unavailable"),
            ClientErrorKind::Timeout => write!(f, "timeout"),
            ClientErrorKind::Other => write!(f, "client error"),
        }
    }
}

/// Error reported by a store client, kept verbatim for the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: ClientErrorKind,
    message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A single CQL value as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(uuid::Uuid),
    Blob(Vec<u8>),
    List(Vec<CqlValue>),
}

impl CqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CqlValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CqlValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            CqlValue::Null => JsonValue::Null,
            CqlValue::Boolean(b) => JsonValue::Bool(*b),
            CqlValue::Int(i) => JsonValue::Number((*i).into()),
            CqlValue::BigInt(i) => JsonValue::Number((*i).into()),
            CqlValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CqlValue::Text(s) => JsonValue::String(s.clone()),
            CqlValue::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
            CqlValue::Uuid(u) => JsonValue::String(u.to_string()),
            CqlValue::Blob(b) => JsonValue::Array(b.iter().map(|&x| JsonValue::Number(x.into())).collect()),
            CqlValue::List(items) => JsonValue::Array(items.iter().map(CqlValue::to_json).collect()),
        }
    }
}

impl From<&str> for CqlValue {
    fn from(value: &str) -> Self {
        CqlValue::Text(value.to_string())
    }
}

impl From<String> for CqlValue {
    fn from(value: String) -> Self {
        CqlValue::Text(value)
    }
}

impl From<DateTime<Utc>> for CqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        CqlValue::Timestamp(value)
    }
}

impl From<i32> for CqlValue {
    fn from(value: i32) -> Self {
        CqlValue::Int(value)
    }
}

impl From<i64> for CqlValue {
    fn from(value: i64) -> Self {
        CqlValue::BigInt(value)
    }
}

impl<T: Into<CqlValue>> From<Option<T>> for CqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CqlValue::Null, Into::into)
    }
}

/// One result row, columns in the order the store returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, CqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, CqlValue)>) -> Self {
        Self { columns }
    }

    /// Get a column value by name
    pub fn get(&self, name: &str) -> Option<&CqlValue> {
        self.columns.iter().find(|(column, _)| column == name).map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert row to a JSON object
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.columns
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<CqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Rows plus column metadata of a read statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What a statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Acknowledged write or schema change
    Void,
    Rows(RowSet),
}

impl QueryOutcome {
    /// Rows of a read statement; `None` for acknowledgments
    pub fn rows(&self) -> Option<&RowSet> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            QueryOutcome::Void => None,
        }
    }

    pub fn into_rows(self) -> Option<RowSet> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            QueryOutcome::Void => None,
        }
    }
}

/// A live client handle able to run CQL statements.
///
/// Implementations must be safe to share: the adapter keeps the handle in an
/// `Arc` and does not serialize calls.
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Run one statement
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, ClientError>;

    /// Release the handle's resources
    async fn shutdown(&self) {}
}

/// Builds client handles from resolved settings
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        auth: &PlainTextAuthProvider,
    ) -> Result<Arc<dyn CqlSession>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_lookup_and_json() {
        let row: Row = vec![("name", CqlValue::from("20240101120000-init")), ("ran_on", CqlValue::Null)]
            .into_iter()
            .collect();

        assert_eq!(row.get("name").and_then(CqlValue::as_text), Some("20240101120000-init"));
        assert!(row.get("ran_on").map_or(false, CqlValue::is_null));
        assert!(row.get("missing").is_none());
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["name", "ran_on"]);
        assert_eq!(row.to_json(), json!({ "name": "20240101120000-init", "ran_on": null }));
    }

    #[test]
    fn test_outcome_rows() {
        assert!(QueryOutcome::Void.rows().is_none());
        let outcome = QueryOutcome::Rows(RowSet::new(vec!["name".to_string()], Vec::new()));
        assert!(outcome.rows().map_or(false, RowSet::is_empty));
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::new(ClientErrorKind::Syntax, "line 1:0 no viable alternative");
        assert_eq!(err.to_string(), "syntax error: line 1:0 no viable alternative");
    }
}
