//! In-process store
//!
//! Records every statement it receives and keeps just enough table state to
//! answer the statements this adapter issues: schema changes, ledger inserts
//! and deletes, and full-table selects. Used for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use cassandra_migrate_core::{ConnectionDescriptor, PlainTextAuthProvider};

use super::core::*;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^CREATE TABLE (IF NOT EXISTS )?([\w.]+) \( (.*) \)( WITH .*)?$").expect("valid regex")
});
static DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^DROP TABLE (IF EXISTS )?([\w.]+)$").expect("valid regex"));
static ALTER_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ALTER TABLE ([\w.]+) (.*)$").expect("valid regex"));
static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^INSERT INTO ([\w.]+) \(([^)]*)\) VALUES \((.*)\)$").expect("valid regex")
});
static DELETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^DELETE FROM ([\w.]+) WHERE (\w+) = (.*)$").expect("valid regex")
});
static SELECT_ALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^SELECT \* FROM ([\w.]+)$").expect("valid regex"));
static PRIMARY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^PRIMARY KEY \(+\s*(\w+)").expect("valid regex"));

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    /// (name, type) in declaration order
    columns: Vec<(String, String)>,
    key: String,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn column_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, ty)| ty.as_str())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    statements: Vec<String>,
    tables: HashMap<String, MemoryTable>,
    failures: VecDeque<ClientError>,
    connected_to: Option<ConnectionDescriptor>,
    shutdown_count: usize,
}

/// In-memory [`CqlSession`]
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<MemoryState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, usable both as a session and as a [`ClientFactory`]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every statement received so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<String> {
        self.state().statements.last().cloned()
    }

    pub fn clear_statements(&self) {
        self.state().statements.clear();
    }

    /// Make the next statement fail with `error`
    pub fn fail_next(&self, error: ClientError) {
        self.state().failures.push_back(error);
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(&table_key(table))
    }

    /// Column names of a table in declaration order
    pub fn table_columns(&self, table: &str) -> Option<Vec<String>> {
        self.state()
            .tables
            .get(&table_key(table))
            .map(|t| t.columns.iter().map(|(name, _)| name.clone()).collect())
    }

    /// Descriptor of the last `connect` through the factory
    pub fn connected_to(&self) -> Option<ConnectionDescriptor> {
        self.state().connected_to.clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.state().shutdown_count
    }

    fn run(state: &mut MemoryState, cql: &str) -> Result<QueryOutcome, ClientError> {
        let cql = cql.trim().trim_end_matches(';');

        if let Some(caps) = CREATE_TABLE.captures(cql) {
            return Self::create_table(state, caps.get(1).is_none(), &caps[2], &caps[3]);
        }
        if let Some(caps) = DROP_TABLE.captures(cql) {
            let name = table_key(&caps[2]);
            if state.tables.remove(&name).is_none() && caps.get(1).is_none() {
                return Err(unconfigured(&name));
            }
            return Ok(QueryOutcome::Void);
        }
        if let Some(caps) = ALTER_TABLE.captures(cql) {
            let table = table_mut(state, &caps[1])?;
            return Self::alter_table(table, &caps[2]);
        }
        if let Some(caps) = INSERT.captures(cql) {
            let table = table_mut(state, &caps[1])?;
            return Self::insert(table, &caps[2], &caps[3]);
        }
        if let Some(caps) = DELETE.captures(cql) {
            let table = table_mut(state, &caps[1])?;
            let values = parse_literals(&caps[3])?;
            let key = values.first().cloned().unwrap_or(CqlValue::Null);
            let column = caps[2].to_string();
            table.rows.retain(|row| row.get(&column) != Some(&key));
            return Ok(QueryOutcome::Void);
        }
        if let Some(caps) = SELECT_ALL.captures(cql) {
            let table = table_mut(state, &caps[1])?;
            let columns = table.columns.iter().map(|(name, _)| name.clone()).collect();
            return Ok(QueryOutcome::Rows(RowSet::new(columns, table.rows.clone())));
        }

        Err(no_viable_alternative(cql))
    }

    fn create_table(
        state: &mut MemoryState,
        must_not_exist: bool,
        name: &str,
        body: &str,
    ) -> Result<QueryOutcome, ClientError> {
        let name = table_key(name);
        if state.tables.contains_key(&name) {
            if must_not_exist {
                return Err(ClientError::new(
                    ClientErrorKind::Invalid,
                    format!("Table {} already exists", name),
                ));
            }
            return Ok(QueryOutcome::Void);
        }

        let mut table = MemoryTable::default();
        for part in split_top_level(body) {
            let part = part.trim();
            if let Some(caps) = PRIMARY_KEY.captures(part) {
                table.key = caps[1].to_string();
            } else if let Some((column, ty)) = part.split_once(' ') {
                table.columns.push((column.to_string(), ty.trim().to_string()));
            } else {
                return Err(ClientError::new(
                    ClientErrorKind::Syntax,
                    format!("line 1: missing type for column '{}'", part),
                ));
            }
        }
        if table.key.is_empty() {
            return Err(ClientError::new(
                ClientErrorKind::Invalid,
                "No PRIMARY KEY specifed (exactly one required)",
            ));
        }

        state.tables.insert(name, table);
        Ok(QueryOutcome::Void)
    }

    /// `ADD c t`, `DROP c`, `RENAME a TO b` or `ALTER c TYPE t`; types may contain spaces
    fn alter_table(table: &mut MemoryTable, action: &str) -> Result<QueryOutcome, ClientError> {
        let (op, rest) = next_word(action);
        if op.eq_ignore_ascii_case("ADD") {
            let (column, ty) = next_word(rest);
            if column.is_empty() || ty.is_empty() {
                return Err(no_viable_alternative(action));
            }
            table.columns.push((column.to_string(), ty.to_string()));
        } else if op.eq_ignore_ascii_case("DROP") {
            let (column, extra) = next_word(rest);
            if column.is_empty() || !extra.is_empty() {
                return Err(no_viable_alternative(action));
            }
            table.columns.retain(|(name, _)| name != column);
        } else if op.eq_ignore_ascii_case("RENAME") {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            match tokens.as_slice() {
                [from, to_kw, to] if to_kw.eq_ignore_ascii_case("TO") => {
                    if let Some(entry) = table.columns.iter_mut().find(|(name, _)| name == from) {
                        entry.0 = to.to_string();
                    }
                }
                _ => return Err(no_viable_alternative(action)),
            }
        } else if op.eq_ignore_ascii_case("ALTER") {
            let (column, rest) = next_word(rest);
            let (type_kw, ty) = next_word(rest);
            if column.is_empty() || !type_kw.eq_ignore_ascii_case("TYPE") || ty.is_empty() {
                return Err(no_viable_alternative(action));
            }
            if let Some(entry) = table.columns.iter_mut().find(|(name, _)| name == column) {
                entry.1 = ty.to_string();
            }
        } else {
            return Err(no_viable_alternative(action));
        }
        Ok(QueryOutcome::Void)
    }

    fn insert(table: &mut MemoryTable, columns: &str, values: &str) -> Result<QueryOutcome, ClientError> {
        let columns: Vec<&str> = columns.split(',').map(str::trim).collect();
        let values = parse_literals(values)?;
        if columns.len() != values.len() {
            return Err(ClientError::new(
                ClientErrorKind::Invalid,
                "Unmatched column names/values",
            ));
        }

        let mut row = Vec::with_capacity(columns.len());
        for (column, value) in columns.iter().zip(values) {
            let value = match (table.column_type(column), value) {
                (None, _) => {
                    return Err(ClientError::new(
                        ClientErrorKind::Invalid,
                        format!("Undefined column name {}", column),
                    ))
                }
                (Some(ty), CqlValue::Text(text)) if ty.eq_ignore_ascii_case("timestamp") => {
                    CqlValue::Timestamp(parse_timestamp(&text)?)
                }
                (Some(_), value) => value,
            };
            row.push((column.to_string(), value));
        }

        let row = Row::new(row);
        let key = row.get(&table.key).cloned().ok_or_else(|| {
            ClientError::new(
                ClientErrorKind::Invalid,
                format!("Some partition key parts are missing: {}", table.key),
            )
        })?;
        let key_column = table.key.clone();
        table.rows.retain(|existing| existing.get(&key_column) != Some(&key));
        table.rows.push(row);
        Ok(QueryOutcome::Void)
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    async fn execute(&self, cql: &str) -> Result<QueryOutcome, ClientError> {
        let mut state = self.state();
        state.statements.push(cql.to_string());
        if let Some(failure) = state.failures.pop_front() {
            return Err(failure);
        }
        Self::run(&mut state, cql)
    }

    async fn shutdown(&self) {
        self.state().shutdown_count += 1;
    }
}

#[async_trait]
impl ClientFactory for Arc<MemorySession> {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        _auth: &PlainTextAuthProvider,
    ) -> Result<Arc<dyn CqlSession>, ClientError> {
        self.state().connected_to = Some(descriptor.clone());
        let session: Arc<dyn CqlSession> = self.clone();
        Ok(session)
    }
}

fn unconfigured(table: &str) -> ClientError {
    ClientError::new(ClientErrorKind::Invalid, format!("unconfigured table {}", table))
}

fn no_viable_alternative(input: &str) -> ClientError {
    ClientError::new(
        ClientErrorKind::Syntax,
        format!("line 1: no viable alternative at input '{}'", input),
    )
}

/// Tables are keyed by bare lowercase name; a keyspace prefix is dropped
fn table_key(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

/// First whitespace-delimited word and the trimmed remainder
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn table_mut<'a>(state: &'a mut MemoryState, name: &str) -> Result<&'a mut MemoryTable, ClientError> {
    let name = table_key(name);
    match state.tables.get_mut(&name) {
        Some(table) => Ok(table),
        None => Err(unconfigured(&name)),
    }
}

fn parse_timestamp(text: &str) -> Result<chrono::DateTime<Utc>, ClientError> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| {
            ClientError::new(
                ClientErrorKind::Invalid,
                format!("Unable to coerce '{}' to a formatted date (long)", text),
            )
        })
}

/// Split on commas that are not nested in parentheses or quotes
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in body.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' | '<' | '{' if !in_quote => depth += 1,
            ')' | '>' | '}' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Parse a comma separated list of CQL literals
fn parse_literals(input: &str) -> Result<Vec<CqlValue>, ClientError> {
    let mut values = Vec::new();
    let mut chars = input.trim().chars().peekable();

    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek() {
            None => break,
            Some('\'') => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            text.push('\'');
                        }
                        Some('\'') => break,
                        Some(c) => text.push(c),
                        None => {
                            return Err(ClientError::new(
                                ClientErrorKind::Syntax,
                                "line 1: unterminated string literal",
                            ))
                        }
                    }
                }
                values.push(CqlValue::Text(text));
            }
            Some(_) => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                values.push(bare_literal(token.trim()));
            }
        }

        while chars.peek().map_or(false, |c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(c) => {
                return Err(ClientError::new(
                    ClientErrorKind::Syntax,
                    format!("line 1: extraneous input '{}'", c),
                ))
            }
        }
    }
    Ok(values)
}

fn bare_literal(token: &str) -> CqlValue {
    if token.eq_ignore_ascii_case("null") {
        CqlValue::Null
    } else if let Ok(b) = token.to_lowercase().parse::<bool>() {
        CqlValue::Boolean(b)
    } else if let Ok(i) = token.parse::<i32>() {
        CqlValue::Int(i)
    } else if let Ok(i) = token.parse::<i64>() {
        CqlValue::BigInt(i)
    } else if let Ok(f) = token.parse::<f64>() {
        CqlValue::Double(f)
    } else {
        CqlValue::Text(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ledger_round_trip() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE IF NOT EXISTS migrations ( name varchar, ran_on timestamp, PRIMARY KEY (name) )")
            .await
            .unwrap();
        session
            .execute("INSERT INTO migrations (name, ran_on) VALUES ('20240101120000-init', '2024-01-01 12:00:00')")
            .await
            .unwrap();

        let rows = session.execute("SELECT * FROM migrations").await.unwrap().into_rows().unwrap();
        assert_eq!(rows.columns, vec!["name", "ran_on"]);
        assert_eq!(rows.len(), 1);
        assert!(rows.rows[0].get("ran_on").and_then(CqlValue::as_timestamp).is_some());

        session
            .execute("DELETE FROM migrations WHERE name = '20240101120000-init'")
            .await
            .unwrap();
        let rows = session.execute("SELECT * FROM migrations").await.unwrap().into_rows().unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_invalid_timestamp() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE IF NOT EXISTS migrations ( name varchar, ran_on timestamp, PRIMARY KEY (name) )")
            .await
            .unwrap();
        let err = session
            .execute("INSERT INTO migrations (name, ran_on) VALUES ('x', 'Invalid date')")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ClientErrorKind::Invalid);
    }

    #[tokio::test]
    async fn test_schema_changes() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE users ( name varchar, age int, PRIMARY KEY (name, age) ) WITH compression = { 'class' : 'LZ4Compressor' }")
            .await
            .unwrap();
        session.execute("ALTER TABLE users ADD email text").await.unwrap();
        session.execute("ALTER TABLE users RENAME age TO years").await.unwrap();
        session.execute("ALTER TABLE users DROP email").await.unwrap();
        assert_eq!(session.table_columns("users").unwrap(), vec!["name", "years"]);

        let err = session
            .execute("CREATE TABLE users ( name varchar, PRIMARY KEY (name) )")
            .await
            .unwrap_err();
        assert!(err.message().contains("already exists"));

        session.execute("DROP TABLE users").await.unwrap();
        assert!(!session.has_table("users"));
        assert!(session.execute("DROP TABLE users").await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let session = MemorySession::new();
        session.fail_next(ClientError::new(ClientErrorKind::Unavailable, "no hosts available"));

        let create = "CREATE TABLE IF NOT EXISTS migrations ( name varchar, ran_on timestamp, PRIMARY KEY (name) )";
        assert!(session.execute(create).await.is_err());
        assert!(!session.has_table("migrations"));
        assert!(session.execute(create).await.is_ok());
        assert_eq!(session.statements().len(), 2);
        assert_eq!(session.last_statement().as_deref(), Some(create));

        session.clear_statements();
        assert!(session.statements().is_empty());
        assert_eq!(session.last_statement(), None);
    }

    #[tokio::test]
    async fn test_unrecognized_statement_is_a_syntax_error() {
        let session = MemorySession::new();

        let err = session.execute("DROP TABL users").await.unwrap_err();

        assert_eq!(err.kind(), ClientErrorKind::Syntax);
        assert_eq!(err.message(), "line 1: no viable alternative at input 'DROP TABL users'");
    }

    #[tokio::test]
    async fn test_keyspace_qualified_table_names() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE IF NOT EXISTS ks.users ( name varchar, PRIMARY KEY (name) )")
            .await
            .unwrap();
        assert!(session.has_table("users"));
        assert!(session.has_table("ks.users"));

        session.execute("ALTER TABLE ks.users ADD age int").await.unwrap();
        assert_eq!(session.table_columns("users").unwrap(), vec!["name", "age"]);

        session.execute("DROP TABLE ks.users").await.unwrap();
        assert!(!session.has_table("users"));
    }

    #[tokio::test]
    async fn test_alter_with_collection_types() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE users ( name varchar, PRIMARY KEY (name) )")
            .await
            .unwrap();

        session.execute("ALTER TABLE users ADD prefs map<text, text>").await.unwrap();
        session.execute("ALTER TABLE users ADD scores list<int>").await.unwrap();
        session
            .execute("ALTER TABLE users ALTER scores TYPE frozen<list<int>>")
            .await
            .unwrap();

        let state = session.state();
        let table = &state.tables["users"];
        assert_eq!(table.column_type("prefs"), Some("map<text, text>"));
        assert_eq!(table.column_type("scores"), Some("frozen<list<int>>"));
    }

    #[tokio::test]
    async fn test_malformed_alter_actions() {
        let session = MemorySession::new();
        session
            .execute("CREATE TABLE users ( name varchar, PRIMARY KEY (name) )")
            .await
            .unwrap();

        for action in ["ADD prefs", "DROP a b", "RENAME a b", "ALTER name varchar", "TRUNCATE"] {
            let err = session
                .execute(&format!("ALTER TABLE users {}", action))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ClientErrorKind::Syntax, "{}", action);
        }
    }

    #[test]
    fn test_parse_literals() {
        let values = parse_literals("'it''s', 42, null, 'a,b'").unwrap();
        assert_eq!(
            values,
            vec![
                CqlValue::Text("it's".to_string()),
                CqlValue::Int(42),
                CqlValue::Null,
                CqlValue::Text("a,b".to_string()),
            ]
        );
        assert!(parse_literals("'open").is_err());
    }
}
