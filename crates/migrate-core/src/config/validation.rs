use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingRequired { field, .. } | ConfigError::InvalidValue { field, .. } => {
                Some(field)
            }
            ConfigError::Json(_) => None,
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Keyspace name validator
///
/// Keyspace names contain only alphanumerics and underscores, at most
/// 48 characters.
pub struct KeyspaceValidator {
    pub max_len: usize,
}

impl Default for KeyspaceValidator {
    fn default() -> Self {
        Self { max_len: 48 }
    }
}

impl ConfigValidator<str> for KeyspaceValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        let chars_ok = value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if value.is_empty() || !chars_ok || value.len() > self.max_len {
            return Err(ConfigError::invalid_value(
                "database",
                value,
                format!(
                    "a keyspace name of at most {} letters, digits or underscores",
                    self.max_len
                ),
            ));
        }
        Ok(())
    }
}

/// Contact address validator
pub struct HostValidator;

impl ConfigValidator<str> for HostValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "host",
                value,
                "a non-empty host name or address without whitespace",
            ));
        }
        Ok(())
    }
}
