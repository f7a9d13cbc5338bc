//! Connection configuration
//!
//! Normalizes user supplied settings (host list, credentials, keyspace)
//! into the descriptor the store client is built from.

pub mod connection;
pub mod credentials;
pub mod validation;

pub use connection::{ConnectionDescriptor, DatabaseConfig, HostSetting, DEFAULT_HOST, DEFAULT_PORT};
pub use credentials::{Credentials, PlainTextAuthProvider};
pub use validation::{ConfigError, ConfigValidator, HostValidator, KeyspaceValidator};
