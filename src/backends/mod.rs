//! Storage backend implementations
//!
//! Concrete implementations of the [`Database`](crate::core::database::Database)
//! trait. SQLite is the only backend shipped today.

pub mod sqlite;

pub use sqlite::{PoolConfig, PoolStats, SqlitePool, SqliteWork};
