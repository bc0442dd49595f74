//! Storage backend traits
//!
//! [`Database`] is the read-side entry point and the place transactions
//! start; [`Work`] is one open transaction pinned to one connection. The
//! transaction executor owns finalization: exactly one of `commit` or
//! `rollback` consumes every `Work` on every exit path.

use async_trait::async_trait;

use super::error::Result;
use super::query_builder::Statement;
use super::value::RowSet;

/// Lock intent passed through to storage when a transaction begins.
/// The core never implements locking itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Take locks lazily, on first write
    #[default]
    Deferred,
    /// Reserve the write lock up front (lock-for-update)
    Immediate,
}

/// A storage backend reachable through a pool of connections
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a read-only statement on a pooled connection and return its
    /// rows. Implementations may retry bounded connectivity failures;
    /// nothing else is ever retried.
    async fn fetch(&self, statement: &Statement) -> Result<RowSet>;

    /// Check out a dedicated connection and open a transaction on it
    /// with the requested lock intent
    async fn begin(&self, lock: LockMode) -> Result<Box<dyn Work>>;
}

/// One open transaction. Every call runs on the same checked-out
/// connection; the connection returns to the pool when the work is
/// finalized or dropped.
#[async_trait]
pub trait Work: Send {
    /// Run a mutating statement, returning the affected-row count
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Run a read inside the transaction, seeing its uncommitted writes
    async fn fetch(&mut self, statement: &Statement) -> Result<RowSet>;

    /// Row id assigned by the most recent insert on this connection
    async fn last_insert_id(&mut self) -> Result<i64>;

    /// Commit. On a commit failure the implementation rolls the
    /// transaction back before returning the error, so no finalized
    /// `Work` ever leaves a transaction open on a pooled connection.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll back, discarding every write made through this work
    async fn rollback(self: Box<Self>) -> Result<()>;
}
