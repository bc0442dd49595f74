//! Transaction executor
//!
//! Runs a unit of work against a [`Database`] with an explicit outcome:
//! the work function either returns `Ok` and the transaction commits, or
//! it fails (error, panic, or timeout) and the transaction rolls back.
//! There is no partially applied state to reason about afterwards.
//!
//! The work function receives a [`TxHandle`] scoped to the open
//! transaction. All reads through the handle see the transaction's own
//! uncommitted writes.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::core::database::{Database, LockMode, Work};
use crate::core::error::{AccessError, Result};
use crate::core::mapper::{self, Record};
use crate::core::query_builder::{
    DeleteBuilder, InsertBuilder, SelectBuilder, Statement, UpdateBuilder,
};
use crate::core::schema::Schema;
use crate::core::value::{Row, RowSet};

/// Default transaction timeout
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of a transaction as driven by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No transaction begun yet
    Idle,
    /// Transaction begun, work function running
    Open,
    /// Work function returned `Ok`, commit in flight
    Committing,
    /// Commit acknowledged by storage
    Committed,
    /// Work failed, timed out, or panicked; rollback in flight
    RollingBack,
    /// Rollback finished, nothing was applied
    RolledBack,
}

/// How a transaction acquires its locks and how long it may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    /// Lock acquisition mode passed to [`Database::begin`]
    pub lock: LockMode,
    /// Wall-clock budget for the work function. Exceeding it rolls the
    /// transaction back and surfaces [`AccessError::Timeout`].
    pub timeout: Duration,
}

impl Default for TxOptions {
    fn default() -> Self {
        TxOptions {
            lock: LockMode::Deferred,
            timeout: DEFAULT_TX_TIMEOUT,
        }
    }
}

impl TxOptions {
    /// Options for a read-modify-write transaction: the write lock is
    /// taken up front so the rows read cannot change underneath it
    pub fn immediate() -> Self {
        TxOptions {
            lock: LockMode::Immediate,
            ..TxOptions::default()
        }
    }

    /// Set the wall-clock budget
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the lock acquisition mode
    #[must_use]
    pub fn with_lock(mut self, lock: LockMode) -> Self {
        self.lock = lock;
        self
    }
}

/// What a committed transaction did, alongside the work function's own
/// return value
#[derive(Debug)]
pub struct TxReport<T> {
    /// Value returned by the work function
    pub value: T,
    /// Keys assigned by storage, in insertion order
    pub inserted_ids: Vec<i64>,
    /// Total rows written across all statements
    pub rows_affected: u64,
}

/// Runs transactions against one schema and one backend
pub struct TransactionExecutor<'a, D: Database> {
    schema: &'a Schema,
    db: &'a D,
}

impl<'a, D: Database> TransactionExecutor<'a, D> {
    pub fn new(schema: &'a Schema, db: &'a D) -> Self {
        TransactionExecutor { schema, db }
    }

    /// Run `work_fn` inside a transaction and commit if it returns `Ok`.
    ///
    /// Any of the three failure shapes rolls the transaction back first:
    /// an `Err` from the work function is returned as-is, a panic is
    /// resumed after rollback, and exceeding `options.timeout` surfaces
    /// [`AccessError::Timeout`].
    pub async fn run<T, F>(&self, options: TxOptions, work_fn: F) -> Result<TxReport<T>>
    where
        T: Send,
        F: for<'h> FnOnce(&'h mut TxHandle<'a>) -> BoxFuture<'h, Result<T>> + Send,
    {
        let work = self.db.begin(options.lock).await?;
        debug!(
            lock = ?options.lock,
            timeout_ms = options.timeout.as_millis() as u64,
            "transaction open"
        );

        let mut handle = TxHandle {
            schema: self.schema,
            work: Some(work),
            inserted_ids: Vec::new(),
            rows_affected: 0,
            state: TxState::Open,
        };

        let outcome = tokio::time::timeout(
            options.timeout,
            AssertUnwindSafe(work_fn(&mut handle)).catch_unwind(),
        )
        .await;

        match outcome {
            Err(_elapsed) => {
                let elapsed_ms = options.timeout.as_millis() as u64;
                warn!(elapsed_ms, "transaction timed out, rolling back");
                handle.finish_rollback().await;
                Err(AccessError::timeout(elapsed_ms))
            }
            Ok(Err(payload)) => {
                warn!("work function panicked, rolling back");
                handle.finish_rollback().await;
                panic::resume_unwind(payload)
            }
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "work function failed, rolling back");
                handle.finish_rollback().await;
                Err(err)
            }
            Ok(Ok(Ok(value))) => {
                handle.state = TxState::Committing;
                let work = match handle.work.take() {
                    Some(work) => work,
                    None => return Err(AccessError::execution("transaction already finished")),
                };
                match work.commit().await {
                    Ok(()) => {
                        handle.state = TxState::Committed;
                        debug!(
                            inserted = handle.inserted_ids.len(),
                            rows_affected = handle.rows_affected,
                            "transaction committed"
                        );
                        Ok(TxReport {
                            value,
                            inserted_ids: std::mem::take(&mut handle.inserted_ids),
                            rows_affected: handle.rows_affected,
                        })
                    }
                    Err(err) => {
                        // Work::commit rolls back before reporting failure,
                        // so the connection is already clean here
                        handle.state = TxState::RolledBack;
                        warn!(error = %err, "commit failed, transaction rolled back");
                        Err(err)
                    }
                }
            }
        }
    }
}

/// Handle to one open transaction, passed to the work function.
///
/// Writes accumulate into the final [`TxReport`]; nothing is visible
/// outside the transaction until the executor commits.
pub struct TxHandle<'a> {
    schema: &'a Schema,
    work: Option<Box<dyn Work>>,
    inserted_ids: Vec<i64>,
    rows_affected: u64,
    state: TxState,
}

impl<'a> TxHandle<'a> {
    /// Insert a record and assign the storage-generated key back onto it.
    /// A primary key field already present on the record is ignored; keys
    /// are always assigned by storage.
    pub async fn insert(&mut self, record: &mut Record) -> Result<i64> {
        let table = record.table().to_string();
        let pk = self.schema.table(&table)?.primary_key().name().to_string();

        let mut builder = InsertBuilder::new(&table);
        for (column, value) in record.iter() {
            if column != pk {
                builder = builder.value(column, value);
            }
        }
        let statement = builder.build(self.schema)?;

        let affected = self
            .work()?
            .execute(&statement)
            .await
            .map_err(|err| err.with_table(&table))?;
        self.rows_affected += affected;

        let id = self.work()?.last_insert_id().await?;
        record.assign_key(&pk, id);
        self.inserted_ids.push(id);
        debug!(table = %table, id, "inserted");
        Ok(id)
    }

    /// Write a loaded record's fields back to its row. A record whose row
    /// no longer exists is a [`AccessError::Conflict`], since the caller
    /// is holding a stale copy.
    pub async fn update(&mut self, record: &Record) -> Result<u64> {
        let table = record.table().to_string();
        let id = record
            .id()
            .ok_or_else(|| AccessError::query_build(&table, "record has no primary key"))?;
        let pk = self.schema.table(&table)?.primary_key().name().to_string();

        let mut builder = UpdateBuilder::new(&table);
        for (column, value) in record.iter() {
            if column != pk {
                builder = builder.set(column, value);
            }
        }
        let statement = builder.where_eq(&pk, id).build(self.schema)?;

        let affected = self
            .work()?
            .execute(&statement)
            .await
            .map_err(|err| err.with_table(&table).with_key(id))?;
        self.rows_affected += affected;

        if affected == 0 {
            return Err(AccessError::conflict("row no longer exists")
                .with_table(&table)
                .with_key(id));
        }
        debug!(table = %table, id, "updated");
        Ok(affected)
    }

    /// Delete one row by primary key. Deleting an absent row is not an
    /// error; the returned count is zero.
    pub async fn delete(&mut self, table: &str, id: i64) -> Result<u64> {
        let pk = self.schema.table(table)?.primary_key().name().to_string();
        let statement = DeleteBuilder::new(table)
            .where_eq(&pk, id)
            .build(self.schema)?;

        let affected = self
            .work()?
            .execute(&statement)
            .await
            .map_err(|err| err.with_table(table).with_key(id))?;
        self.rows_affected += affected;
        debug!(table = %table, id, affected, "deleted");
        Ok(affected)
    }

    /// Execute a prepared write statement
    pub async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let affected = self.work()?.execute(statement).await?;
        self.rows_affected += affected;
        Ok(affected)
    }

    /// Run a read inside the transaction; it sees the transaction's own
    /// uncommitted writes
    pub async fn fetch(&mut self, statement: &Statement) -> Result<RowSet> {
        self.work()?.fetch(statement).await
    }

    /// Run a read and keep only the first row
    pub async fn fetch_one(&mut self, statement: &Statement) -> Result<Option<Row>> {
        let rows = self.work()?.fetch(statement).await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch one record by primary key inside the transaction
    pub async fn find(&mut self, table: &str, id: i64) -> Result<Option<Record>> {
        let pk = self.schema.table(table)?.primary_key().name().to_string();
        let statement = SelectBuilder::new(table)
            .where_eq(&pk, id)
            .build(self.schema)?;
        let rows = self.work()?.fetch(&statement).await?;
        match rows.first() {
            Some(row) => Ok(Some(mapper::hydrate_row(self.schema, table, row)?)),
            None => Ok(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// The schema this transaction validates against
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    fn work(&mut self) -> Result<&mut Box<dyn Work>> {
        self.work
            .as_mut()
            .ok_or_else(|| AccessError::execution("transaction is not open"))
    }

    async fn finish_rollback(&mut self) {
        if let Some(work) = self.work.take() {
            self.state = TxState::RollingBack;
            if let Err(err) = work.rollback().await {
                warn!(error = %err, "rollback failed");
            }
            self.state = TxState::RolledBack;
        }
    }
}
