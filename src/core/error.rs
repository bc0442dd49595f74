//! Error types for the data-access layer
//!
//! One taxonomy covers the whole crate: construction mistakes (schema and
//! query building), hydration mismatches, and storage-reported failures
//! (constraint, conflict, timeout, connectivity). Driver errors are
//! classified into the taxonomy in exactly one place, the `From` impl at
//! the bottom of this module.

/// Result type alias for data-access operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Error taxonomy for data-access operations
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Undeclared table, column, or relationship in the schema registry
    #[error("schema error on `{table}`: {message}")]
    Schema { table: String, message: String },

    /// Invalid projection, filter, or join request against a declared schema
    #[error("query build error on `{table}`: {message}")]
    QueryBuild { table: String, message: String },

    /// Result row does not match the declared shape of the target table
    #[error("mapping error on `{table}`: missing or mistyped column `{column}`")]
    Mapping { table: String, column: String },

    /// Foreign-key or uniqueness violation reported by storage
    #[error("constraint violation: {message}")]
    Constraint {
        /// Table the write targeted, when known at the failure site
        table: Option<String>,
        message: String,
    },

    /// Concurrent-write or lock conflict detected at commit or lock acquisition
    #[error("write conflict: {message}")]
    Conflict {
        /// Table the write targeted, when known at the failure site
        table: Option<String>,
        /// Primary key of the contested row, when known
        key: Option<i64>,
        message: String,
    },

    /// Transaction or statement held open beyond its configured limit
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Storage unreachable, pool closed, or pool exhausted
    #[error("storage unreachable: {message}")]
    Connectivity { message: String },

    /// Residual driver failure that fits none of the structured kinds
    #[error("execution error: {message}")]
    Execution { message: String },
}

impl AccessError {
    /// Create a schema error for a table-level lookup failure
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a query build error against a base table
    pub fn query_build(table: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::QueryBuild {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error for a missing or mistyped column
    pub fn mapping(table: impl Into<String>, column: impl Into<String>) -> Self {
        AccessError::Mapping {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a constraint error without table context
    pub fn constraint(message: impl Into<String>) -> Self {
        AccessError::Constraint {
            table: None,
            message: message.into(),
        }
    }

    /// Create a conflict error without row context
    pub fn conflict(message: impl Into<String>) -> Self {
        AccessError::Conflict {
            table: None,
            key: None,
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed_ms: u64) -> Self {
        AccessError::Timeout { elapsed_ms }
    }

    /// Create a connectivity error
    pub fn connectivity(message: impl Into<String>) -> Self {
        AccessError::Connectivity {
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        AccessError::Execution {
            message: message.into(),
        }
    }

    /// Fill in the target table on a constraint or conflict error that was
    /// classified below the level where the table was known. Other kinds
    /// pass through unchanged.
    pub fn with_table(self, table: impl Into<String>) -> Self {
        match self {
            AccessError::Constraint { table: None, message } => AccessError::Constraint {
                table: Some(table.into()),
                message,
            },
            AccessError::Conflict {
                table: None,
                key,
                message,
            } => AccessError::Conflict {
                table: Some(table.into()),
                key,
                message,
            },
            other => other,
        }
    }

    /// Fill in the contested row key on a conflict error
    pub fn with_key(self, key: i64) -> Self {
        match self {
            AccessError::Conflict {
                table,
                key: None,
                message,
            } => AccessError::Conflict {
                table,
                key: Some(key),
                message,
            },
            other => other,
        }
    }

    /// Whether a read-only operation may be retried after this error.
    /// Only connectivity failures qualify; lock conflicts are absorbed by
    /// the driver's busy timeout and surfaced if that expires, and
    /// everything else is surfaced immediately.
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, AccessError::Connectivity { .. })
    }
}

impl From<rusqlite::Error> for AccessError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;

        match &err {
            rusqlite::Error::SqliteFailure(cause, message) => {
                let text = message
                    .clone()
                    .unwrap_or_else(|| cause.to_string());
                match cause.code {
                    ErrorCode::ConstraintViolation => AccessError::constraint(text),
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        AccessError::conflict(text)
                    }
                    ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DiskFull
                    | ErrorCode::SystemIoFailure => AccessError::connectivity(text),
                    _ => AccessError::execution(text),
                }
            }
            other => AccessError::execution(other.to_string()),
        }
    }
}
