//! Connection settings as supplied by the host runner, and their resolution
//! into a canonical [`ConnectionDescriptor`].

use serde::{Deserialize, Serialize};

use super::credentials::{Credentials, PlainTextAuthProvider};
use super::validation::{ConfigError, ConfigValidator, HostValidator, KeyspaceValidator};

/// Host used when the settings carry none
pub const DEFAULT_HOST: &str = "localhost";

/// Native protocol port
pub const DEFAULT_PORT: u16 = 9042;

/// The `host` setting: either one string (possibly comma separated) or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostSetting {
    List(Vec<String>),
    Single(String),
}

impl HostSetting {
    /// Expand the setting into individual contact addresses.
    ///
    /// A single string is split on commas; a list is taken as given.
    pub fn addresses(&self) -> Vec<String> {
        match self {
            HostSetting::List(hosts) => hosts.clone(),
            HostSetting::Single(host) => host.split(',').map(|h| h.trim().to_string()).collect(),
        }
    }
}

impl From<&str> for HostSetting {
    fn from(value: &str) -> Self {
        HostSetting::Single(value.to_string())
    }
}

impl From<String> for HostSetting {
    fn from(value: String) -> Self {
        HostSetting::Single(value)
    }
}

impl From<Vec<String>> for HostSetting {
    fn from(value: Vec<String>) -> Self {
        HostSetting::List(value)
    }
}

impl From<Vec<&str>> for HostSetting {
    fn from(value: Vec<&str>) -> Self {
        HostSetting::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Raw database settings.
///
/// Mirrors the settings document a migration runner keeps per environment;
/// keys this adapter does not understand (e.g. `driver`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: Option<HostSetting>,
    /// Keyspace name
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

impl DatabaseConfig {
    /// Settings for the given keyspace with every other field defaulted
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            database: Some(keyspace.into()),
            ..Self::default()
        }
    }

    /// Parse settings out of an already-decoded JSON document
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_host(mut self, host: impl Into<HostSetting>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Resolve into a [`ConnectionDescriptor`].
    ///
    /// Fails when the keyspace is missing or malformed, or when a host entry
    /// is empty after splitting.
    pub fn resolve(&self) -> Result<ConnectionDescriptor, ConfigError> {
        let keyspace = self.database.as_deref().ok_or_else(|| {
            ConfigError::missing_required("database", "keyspace must be defined in the database settings")
        })?;
        KeyspaceValidator::default().validate(keyspace)?;

        let hosts = match &self.host {
            Some(setting) => setting.addresses(),
            None => vec![DEFAULT_HOST.to_string()],
        };
        if hosts.is_empty() {
            return Err(ConfigError::invalid_value("host", "[]", "at least one contact address"));
        }
        for host in &hosts {
            HostValidator.validate(host)?;
        }

        let credentials = match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)),
            _ => None,
        };

        let descriptor = ConnectionDescriptor {
            hosts,
            keyspace: keyspace.to_string(),
            port: self.port.unwrap_or(DEFAULT_PORT),
            credentials,
        };
        tracing::debug!(
            "Resolved connection settings: hosts={:?}, keyspace={}, authenticated={}",
            descriptor.hosts,
            descriptor.keyspace,
            descriptor.credentials.is_some()
        );
        Ok(descriptor)
    }
}

/// Canonical connection settings, created once per adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    hosts: Vec<String>,
    keyspace: String,
    port: u16,
    credentials: Option<Credentials>,
}

impl ConnectionDescriptor {
    /// Contact addresses in declaration order; never empty
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Authentication provider for client construction. Always present,
    /// anonymous when no credentials were configured.
    pub fn auth_provider(&self) -> PlainTextAuthProvider {
        PlainTextAuthProvider::new(self.credentials.as_ref())
    }

    /// Contact addresses as `host:port`, keeping an explicit port if present
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| with_port(host, self.port))
            .collect()
    }
}

fn with_port(host: &str, port: u16) -> String {
    if host.starts_with('[') {
        return if host.contains("]:") {
            host.to_string()
        } else {
            format!("{}:{}", host, port)
        };
    }
    match host.matches(':').count() {
        0 => format!("{}:{}", host, port),
        1 => host.to_string(),
        // bare IPv6 literal
        _ => format!("[{}]:{}", host, port),
    }
}
