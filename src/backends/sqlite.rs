//! Pooled SQLite backend
//!
//! Implements [`Database`] and [`Work`] over a deadpool-managed SQLite
//! connection pool. Statements run inside `interact` closures on the
//! pool's blocking threads, wrapped in a per-operation timeout.
//!
//! Foreign-key enforcement and the busy timeout are connection-local
//! settings in SQLite, so they are applied on every checkout rather than
//! once at pool creation. A connection whose transaction was neither
//! committed nor rolled back is discarded instead of returned, so the
//! pool never hands out a connection with leftover transaction state.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_sqlite::PoolConfig as ManagedPoolConfig;
use deadpool_sqlite::{Config, InteractError, Object, Pool, Runtime};
use rusqlite::{params_from_iter, types::ValueRef};
use tracing::{debug, warn};

use crate::core::database::{Database, LockMode, Work};
use crate::core::error::{AccessError, Result};
use crate::core::query_builder::Statement;
use crate::core::schema::Schema;
use crate::core::value::{Row, RowSet, Value};

/// Default timeout for one statement on a checked-out connection
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time a connection waits on a locked database before the
/// driver reports the lock
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between retry attempts of an idempotent read
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Pool configuration for SQLite connections
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database path, or a `file:` URI (`file:name?mode=memory&cache=shared`
    /// gives a named in-memory database shared across the pool)
    pub path: String,
    /// Maximum number of connections in the pool
    pub max_size: usize,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,
    /// Timeout for one statement on a checked-out connection
    pub operation_timeout: Duration,
    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
    /// How many times an idempotent read is retried on transient failure
    pub read_retries: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            max_size: 16,
            acquire_timeout: Duration::from_secs(5),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_retries: 2,
        }
    }
}

impl PoolConfig {
    /// Configuration for a database at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Configuration for a named in-memory database. Every pooled
    /// connection sees the same data; it vanishes when the pool closes.
    pub fn memory(name: &str) -> Self {
        Self::new(format!("file:{name}?mode=memory&cache=shared"))
    }

    /// Set maximum pool size
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Set connection acquisition timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the per-statement timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set how long a connection waits on a locked database
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Set the retry budget for idempotent reads
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total number of connections in the pool
    pub size: usize,
    /// Number of available connections
    pub available: usize,
    /// Number of requests waiting for a connection
    pub waiting: usize,
}

/// Connection-pooled SQLite database
pub struct SqlitePool {
    pool: Pool,
    operation_timeout: Duration,
    busy_timeout: Duration,
    read_retries: u32,
}

impl SqlitePool {
    /// Open a pool against the configured database and verify that a
    /// connection can be established
    pub async fn open(config: PoolConfig) -> Result<Self> {
        let mut pool_config = Config::new(config.path.as_str());
        let mut managed = ManagedPoolConfig::new(config.max_size);
        managed.timeouts.wait = Some(config.acquire_timeout);
        pool_config.pool = Some(managed);

        let pool = pool_config
            .create_pool(Runtime::Tokio1)
            .map_err(|e| AccessError::connectivity(format!("cannot create pool: {e}")))?;

        let db = Self {
            pool,
            operation_timeout: config.operation_timeout,
            busy_timeout: config.busy_timeout,
            read_retries: config.read_retries,
        };

        // journal mode persists on the database itself, so once is enough;
        // it also proves the path is openable before the pool is handed out
        let connection = db.checkout().await?;
        tokio::time::timeout(
            db.operation_timeout,
            connection.interact(|conn| {
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                Ok::<_, rusqlite::Error>(())
            }),
        )
        .await
        .map_err(|_| AccessError::timeout(db.operation_timeout.as_millis() as u64))?
        .map_err(interact_error)?
        .map_err(AccessError::from)?;

        debug!(path = %config.path, max_size = config.max_size, "pool open");
        Ok(db)
    }

    /// Open a pool against a named shared in-memory database
    pub async fn open_in_memory(name: &str) -> Result<Self> {
        Self::open(PoolConfig::memory(name)).await
    }

    /// Create every table of `schema` that does not already exist
    pub async fn provision(&self, schema: &Schema) -> Result<()> {
        let statements = schema.create_statements();
        let connection = self.checkout().await?;
        tokio::time::timeout(
            self.operation_timeout,
            connection.interact(move |conn| {
                for sql in &statements {
                    conn.execute(sql, [])?;
                }
                Ok::<_, rusqlite::Error>(())
            }),
        )
        .await
        .map_err(|_| AccessError::timeout(self.operation_timeout.as_millis() as u64))?
        .map_err(interact_error)?
        .map_err(AccessError::from)?;
        debug!("schema provisioned");
        Ok(())
    }

    /// Snapshot of pool usage
    pub fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }

    /// Shut the pool down. Waiting acquirers fail with a connectivity
    /// error; checked-out connections finish their work.
    pub fn close(&self) {
        self.pool.close();
        debug!("pool closed");
    }

    /// Acquire a connection and apply the connection-local settings
    async fn checkout(&self) -> Result<Object> {
        let connection = self
            .pool
            .get()
            .await
            .map_err(|e| AccessError::connectivity(format!("cannot acquire connection: {e}")))?;

        let busy_timeout = self.busy_timeout;
        tokio::time::timeout(
            self.operation_timeout,
            connection.interact(move |conn| {
                conn.busy_timeout(busy_timeout)?;
                conn.execute("PRAGMA foreign_keys = ON", [])?;
                Ok::<_, rusqlite::Error>(())
            }),
        )
        .await
        .map_err(|_| AccessError::timeout(self.operation_timeout.as_millis() as u64))?
        .map_err(interact_error)?
        .map_err(AccessError::from)?;

        Ok(connection)
    }
}

#[async_trait]
impl Database for SqlitePool {
    async fn fetch(&self, statement: &Statement) -> Result<RowSet> {
        let mut attempt = 0;
        loop {
            let connection = self.checkout().await?;
            match fetch_on(&connection, statement, self.operation_timeout).await {
                Err(err) if err.is_retryable_read() && attempt < self.read_retries => {
                    attempt += 1;
                    debug!(attempt, error = %err, "retrying read");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn begin(&self, lock: LockMode) -> Result<Box<dyn Work>> {
        let connection = self.checkout().await?;
        let sql = match lock {
            LockMode::Deferred => "BEGIN DEFERRED",
            LockMode::Immediate => "BEGIN IMMEDIATE",
        };
        execute_raw(&connection, sql, self.operation_timeout).await?;
        Ok(Box::new(SqliteWork {
            connection: Some(connection),
            operation_timeout: self.operation_timeout,
        }))
    }
}

/// One open transaction pinned to one pooled connection
pub struct SqliteWork {
    connection: Option<Object>,
    operation_timeout: Duration,
}

impl SqliteWork {
    fn connection(&self) -> Result<&Object> {
        self.connection
            .as_ref()
            .ok_or_else(|| AccessError::execution("transaction already finalized"))
    }

    fn take_connection(&mut self) -> Result<Object> {
        self.connection
            .take()
            .ok_or_else(|| AccessError::execution("transaction already finalized"))
    }
}

#[async_trait]
impl Work for SqliteWork {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        execute_on(self.connection()?, statement, self.operation_timeout).await
    }

    async fn fetch(&mut self, statement: &Statement) -> Result<RowSet> {
        fetch_on(self.connection()?, statement, self.operation_timeout).await
    }

    async fn last_insert_id(&mut self) -> Result<i64> {
        let connection = self.connection()?;
        let id = tokio::time::timeout(
            self.operation_timeout,
            connection.interact(|conn| Ok::<_, rusqlite::Error>(conn.last_insert_rowid())),
        )
        .await
        .map_err(|_| AccessError::timeout(self.operation_timeout.as_millis() as u64))?
        .map_err(interact_error)?
        .map_err(AccessError::from)?;
        Ok(id)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let connection = self.take_connection()?;
        match execute_raw(&connection, "COMMIT", self.operation_timeout).await {
            Ok(()) => Ok(()),
            Err(commit_err) => {
                if let Err(rollback_err) =
                    execute_raw(&connection, "ROLLBACK", self.operation_timeout).await
                {
                    warn!(
                        error = %rollback_err,
                        "rollback after failed commit also failed; discarding connection"
                    );
                    drop(Object::take(connection));
                }
                Err(commit_err)
            }
        }
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let connection = self.take_connection()?;
        match execute_raw(&connection, "ROLLBACK", self.operation_timeout).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "rollback failed; discarding connection");
                drop(Object::take(connection));
                Err(err)
            }
        }
    }
}

impl Drop for SqliteWork {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            warn!("transaction dropped without commit or rollback; discarding its connection");
            // closing the connection makes SQLite roll the transaction back
            drop(Object::take(connection));
        }
    }
}

async fn fetch_on(
    connection: &Object,
    statement: &Statement,
    operation_timeout: Duration,
) -> Result<RowSet> {
    let sql = statement.sql.clone();
    let params = statement.params.clone();

    let rows = tokio::time::timeout(
        operation_timeout,
        connection.interact(move |conn| {
            let binds: Vec<Box<dyn rusqlite::ToSql>> = params.iter().map(to_param).collect();
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map(params_from_iter(binds.iter()), decode_row)?;

            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            Ok::<_, rusqlite::Error>(rows)
        }),
    )
    .await
    .map_err(|_| AccessError::timeout(operation_timeout.as_millis() as u64))?
    .map_err(interact_error)?
    .map_err(AccessError::from)?;

    Ok(rows)
}

async fn execute_on(
    connection: &Object,
    statement: &Statement,
    operation_timeout: Duration,
) -> Result<u64> {
    let sql = statement.sql.clone();
    let params = statement.params.clone();

    let affected = tokio::time::timeout(
        operation_timeout,
        connection.interact(move |conn| {
            let binds: Vec<Box<dyn rusqlite::ToSql>> = params.iter().map(to_param).collect();
            let mut stmt = conn.prepare(&sql)?;
            let affected = stmt.execute(params_from_iter(binds.iter()))?;
            Ok::<_, rusqlite::Error>(affected)
        }),
    )
    .await
    .map_err(|_| AccessError::timeout(operation_timeout.as_millis() as u64))?
    .map_err(interact_error)?
    .map_err(AccessError::from)?;

    Ok(affected as u64)
}

async fn execute_raw(
    connection: &Object,
    sql: &'static str,
    operation_timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(
        operation_timeout,
        connection.interact(move |conn| {
            conn.execute(sql, [])?;
            Ok::<_, rusqlite::Error>(())
        }),
    )
    .await
    .map_err(|_| AccessError::timeout(operation_timeout.as_millis() as u64))?
    .map_err(interact_error)?
    .map_err(AccessError::from)?;
    Ok(())
}

fn decode_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let column_count = row.as_ref().column_count();
    let mut out = Row::with_capacity(column_count);

    for i in 0..column_count {
        let name = row.as_ref().column_name(i)?.to_string();
        let value = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            ValueRef::Real(v) => Value::Real(v),
            ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).to_string()),
            ValueRef::Blob(v) => Value::Blob(v.to_vec()),
        };
        out.push(name, value);
    }

    Ok(out)
}

fn to_param(value: &Value) -> Box<dyn rusqlite::ToSql> {
    match value {
        Value::Null => Box::new(None::<i64>),
        Value::Integer(v) => Box::new(*v),
        Value::Real(v) => Box::new(*v),
        Value::Text(v) => Box::new(v.clone()),
        Value::Blob(v) => Box::new(v.clone()),
    }
}

fn interact_error(err: InteractError) -> AccessError {
    AccessError::execution(format!("connection worker failed: {err}"))
}
