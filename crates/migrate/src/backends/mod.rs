//! Store client backends
//!
//! The adapter only depends on the traits in [`core`]. The in-memory store is
//! always available; the `scylla` feature adds a native protocol client.

pub mod core;
pub mod memory;
#[cfg(feature = "scylla")]
pub mod scylla;

// Re-export core traits and types
pub use self::core::*;
pub use memory::MemorySession;
#[cfg(feature = "scylla")]
pub use self::scylla::{ScyllaClientFactory, ScyllaSession};
