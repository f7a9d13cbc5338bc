//! # cassandra-migrate-core
//!
//! Configuration types shared by the cassandra-migrate adapter crates.

pub mod config;

pub use config::*;
