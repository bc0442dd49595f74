//! # Rust Data Access
//!
//! A small relational data-access layer over pooled SQLite: a declared
//! schema registry, parameterized query building, record hydration with
//! explicit relationship traversal, and transactions with an explicit
//! commit-or-rollback outcome.
//!
//! The crate deliberately stays below ORM territory. Nothing is fetched
//! implicitly, identifiers are assigned by storage, the identity cache is
//! bounded and caller-controlled, and every write happens inside a
//! transaction whose outcome is reported rather than assumed.
//!
//! ## Features
//!
//! - **Declared schema**: tables, columns, and relationships are declared
//!   once, validated, and frozen; inverse relationships are derived from
//!   the foreign-key side.
//! - **Parameterized statements**: query builders emit SQL with `?`
//!   placeholders and a bound parameter list; literal values never land
//!   in SQL text.
//! - **Typed records**: rows hydrate into schema-ordered records with
//!   storage-class checking; related records are fetched on explicit
//!   request only.
//! - **Explicit transactions**: a work function either commits or rolls
//!   back, with conflict detection, panic safety, and a wall-clock
//!   timeout.
//! - **Pooled SQLite**: deadpool-managed connections with per-connection
//!   foreign-key enforcement and per-statement timeouts.
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rust_data_access = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use rust_data_access::catalog::commerce_schema;
//! use rust_data_access::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let schema = commerce_schema()?;
//!     let db = SqlitePool::open_in_memory("quick_start").await?;
//!     db.provision(&schema).await?;
//!
//!     // writes happen inside a transaction with an explicit outcome
//!     let executor = TransactionExecutor::new(&schema, &db);
//!     let report = executor
//!         .run(TxOptions::default(), |tx| {
//!             Box::pin(async move {
//!                 let mut shipper = Record::new("shippers")
//!                     .with("shipper_name", "Speedy Express")
//!                     .with("phone", "(503) 555-9831");
//!                 tx.insert(&mut shipper).await
//!             })
//!         })
//!         .await?;
//!
//!     // read it back through the mapper
//!     let mut mapper = RecordMapper::new(&schema, &db);
//!     if let Some(shipper) = mapper.find("shippers", report.value).await? {
//!         println!("{}", format_record(&shipper));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Relationship Traversal
//!
//! ```rust,no_run
//! use rust_data_access::catalog::commerce_schema;
//! use rust_data_access::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let schema = commerce_schema()?;
//!     let db = SqlitePool::open_in_memory("relationships").await?;
//!     db.provision(&schema).await?;
//!
//!     let mut mapper = RecordMapper::new(&schema, &db);
//!     if let Some(order) = mapper.find("orders", 1).await? {
//!         // the derived many-to-many view across line_items
//!         for product in mapper.related(&order, "products").await? {
//!             println!("{}", format_record(&product));
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_data_access/
//! ├── src/
//! │   ├── core/              # Core types and traits
//! │   │   ├── database.rs    # Backend traits
//! │   │   ├── error.rs       # Error taxonomy
//! │   │   ├── format.rs      # Tab-delimited result rendering
//! │   │   ├── mapper.rs      # Record hydration and relationships
//! │   │   ├── query_builder.rs
//! │   │   ├── schema.rs      # Schema registry
//! │   │   ├── transaction.rs # Transaction executor
//! │   │   └── value.rs       # Values and rows
//! │   ├── backends/          # Storage backend implementations
//! │   │   └── sqlite.rs      # Pooled SQLite
//! │   └── catalog.rs         # The built-in commerce schema
//! ├── demos/                 # Example programs
//! ├── tests/                 # Integration tests
//! └── benches/               # Criterion benchmarks
//! ```

/// Core data-access types and traits
pub mod core;

/// Storage backend implementations
pub mod backends;

/// The built-in commerce schema and its derived views
pub mod catalog;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_data_access::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let db = SqlitePool::open_in_memory("prelude_demo").await?;
///     db.close();
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::backends::{PoolConfig, SqlitePool};
    pub use crate::core::database::{Database, LockMode, Work};
    pub use crate::core::error::{AccessError, Result};
    pub use crate::core::format::{format_record, format_records, format_rows, NO_VALUE};
    pub use crate::core::mapper::{Record, RecordMapper};
    pub use crate::core::query_builder::{
        DeleteBuilder, InsertBuilder, OrderDirection, SelectBuilder, Statement, UpdateBuilder,
    };
    pub use crate::core::schema::{Column, ColumnType, Relation, Schema, SchemaBuilder, Table};
    pub use crate::core::transaction::{TransactionExecutor, TxOptions, TxReport, TxState};
    pub use crate::core::value::{Row, RowSet, Value};
}

// Re-export at root level for convenience
pub use crate::backends::{PoolConfig, SqlitePool};
pub use crate::core::{
    AccessError, Database, LockMode, Record, RecordMapper, Result, Row, RowSet, Schema,
    SchemaBuilder, SelectBuilder, Statement, TransactionExecutor, TxOptions, TxReport, Value, Work,
};
