//! Core data-access types and traits
//!
//! The building blocks of the crate: the error taxonomy, dynamically
//! typed values and rows, the schema registry, the query builders, the
//! backend traits, record hydration, transactions, and result rendering.

pub mod database;
pub mod error;
pub mod format;
pub mod mapper;
pub mod query_builder;
pub mod schema;
pub mod transaction;
pub mod value;

// Re-export commonly used types
pub use database::{Database, LockMode, Work};
pub use error::{AccessError, Result};
pub use format::{format_record, format_records, format_rows, NO_VALUE};
pub use mapper::{Record, RecordCache, RecordMapper};
pub use query_builder::{
    DeleteBuilder, InsertBuilder, JoinType, Operator, OrderDirection, SelectBuilder, Statement,
    UpdateBuilder,
};
pub use schema::{Column, ColumnType, Relation, Schema, SchemaBuilder, Table};
pub use transaction::{TransactionExecutor, TxHandle, TxOptions, TxReport, TxState};
pub use value::{Row, RowSet, Value};
