//! Schema Builder - CQL statements for schema changes
//!
//! Pure functions mapping each migration operation to a CQL string. Tokens
//! are separated by exactly one space; callers and tests compare the output
//! verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\(.*\)$").expect("valid regex"));

/// Column definitions of a table, kept in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<(String, String)>,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, column_type: impl Into<String>) -> Self {
        self.columns.push((name.into(), column_type.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), ty.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ColumnSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Primary key and storage options of a table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableConstraints {
    primary_key: Option<String>,
    compression: Option<String>,
}

impl TableConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary key as a bare column (`name`), a list (`name, age`) or an
    /// explicit expression (`((tenant, name), age)`)
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// Primary key from individual columns
    pub fn primary_key_columns(self, columns: &[&str]) -> Self {
        self.primary_key(columns.join(", "))
    }

    /// Compression map, emitted verbatim, e.g.
    /// `{ 'class' : 'LZ4Compressor' }`
    pub fn compression(mut self, clause: impl Into<String>) -> Self {
        self.compression = Some(clause.into());
        self
    }

    pub fn primary_key_clause(&self) -> Option<String> {
        self.primary_key.as_deref().map(format_primary_key)
    }

    pub fn compression_clause(&self) -> Option<&str> {
        self.compression.as_deref()
    }
}

/// Wrap a primary key in parentheses unless it already is
pub fn format_primary_key(key: &str) -> String {
    if PARENTHESIZED.is_match(key) {
        key.to_string()
    } else {
        format!("({})", key)
    }
}

/// `CREATE TABLE IF NOT EXISTS <table> ( <col> <type>, ..., PRIMARY KEY <pk> ) [WITH compression = <clause>]`
pub fn create_table(table_name: &str, columns: &ColumnSpec, constraints: &TableConstraints) -> String {
    let mut definitions: Vec<String> = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect();
    if let Some(key) = constraints.primary_key_clause() {
        definitions.push(format!("PRIMARY KEY {}", key));
    }

    let mut cql = vec![format!("CREATE TABLE IF NOT EXISTS {}", table_name), "(".to_string()];
    if !definitions.is_empty() {
        cql.push(definitions.join(", "));
    }
    cql.push(")".to_string());
    if let Some(clause) = constraints.compression_clause() {
        cql.push("WITH compression =".to_string());
        cql.push(clause.to_string());
    }
    cql.join(" ")
}

pub fn drop_table(table_name: &str) -> String {
    format!("DROP TABLE {}", table_name)
}

pub fn add_column(table_name: &str, column_name: &str, column_type: &str) -> String {
    format!("ALTER TABLE {} ADD {} {}", table_name, column_name, column_type)
}

pub fn remove_column(table_name: &str, column_name: &str) -> String {
    format!("ALTER TABLE {} DROP {}", table_name, column_name)
}

pub fn rename_column(table_name: &str, column_name: &str, new_column_name: &str) -> String {
    format!("ALTER TABLE {} RENAME {} TO {}", table_name, column_name, new_column_name)
}

pub fn change_column(table_name: &str, column_name: &str, column_type: &str) -> String {
    format!("ALTER TABLE {} ALTER {} TYPE {}", table_name, column_name, column_type)
}
