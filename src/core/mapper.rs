//! Record mapper
//!
//! Hydrates raw rows into typed [`Record`]s and resolves declared
//! relationships. Every relationship traversal is an explicit call that
//! issues its own query; nothing is fetched behind the caller's back. The
//! mapper carries a bounded identity cache keyed by (table, primary key),
//! consulted only by [`RecordMapper::find`] and invalidated only on
//! refresh or by explicit request.

use std::collections::{HashMap, VecDeque};

use crate::core::database::Database;
use crate::core::error::{AccessError, Result};
use crate::core::query_builder::SelectBuilder;
use crate::core::schema::{Column, ColumnType, Relation, Schema};
use crate::core::value::{Row, Value};

/// A typed record: one row of one declared table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: String,
    row: Row,
    key: Option<i64>,
}

impl Record {
    /// Start a new record for insertion. It has no primary key until a
    /// transaction inserts it and storage assigns one.
    pub fn new(table: impl Into<String>) -> Self {
        Record {
            table: table.into(),
            row: Row::new(),
            key: None,
        }
    }

    /// Set a field, builder style
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.row.set(column, value.into());
        self
    }

    /// Set a field on a loaded record. The change is in-memory only until
    /// a transaction writes it back.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.row.set(column, value.into());
    }

    /// Get a field value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    /// The table this record belongs to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key, if the record has been loaded or inserted
    pub fn id(&self) -> Option<i64> {
        self.key
    }

    /// Column names in field order
    pub fn columns(&self) -> &[String] {
        self.row.columns()
    }

    /// Values in field order
    pub fn values(&self) -> &[Value] {
        self.row.values()
    }

    /// Iterate over (column, value) pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.row.iter()
    }

    /// The underlying ordered row
    pub fn row(&self) -> &Row {
        &self.row
    }

    pub(crate) fn from_row(table: impl Into<String>, row: Row, key: i64) -> Self {
        Record {
            table: table.into(),
            row,
            key: Some(key),
        }
    }

    pub(crate) fn assign_key(&mut self, pk_column: &str, key: i64) {
        self.row.set(pk_column, Value::Integer(key));
        self.key = Some(key);
    }
}

/// Bounded identity cache keyed by (table, primary key), FIFO eviction.
/// Purely caller-controlled: nothing invalidates it implicitly.
#[derive(Debug)]
pub struct RecordCache {
    capacity: usize,
    entries: HashMap<(String, i64), Record>,
    order: VecDeque<(String, i64)>,
}

impl RecordCache {
    /// Create a cache holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        RecordCache {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a cached record
    pub fn get(&self, table: &str, id: i64) -> Option<&Record> {
        self.entries.get(&(table.to_string(), id))
    }

    /// Store a record. Records without a primary key are not cacheable
    /// and are ignored. When full, the oldest entry is evicted.
    pub fn put(&mut self, record: Record) {
        let Some(id) = record.id() else { return };
        if self.capacity == 0 {
            return;
        }
        let key = (record.table().to_string(), id);
        if self.entries.insert(key.clone(), record).is_none() {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    /// Drop one entry
    pub fn invalidate(&mut self, table: &str, id: i64) {
        let key = (table.to_string(), id);
        self.entries.remove(&key);
        self.order.retain(|k| *k != key);
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default identity-cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Hydrates rows against a schema and resolves relationships through a
/// backend
pub struct RecordMapper<'a, D: Database> {
    schema: &'a Schema,
    db: &'a D,
    cache: RecordCache,
}

impl<'a, D: Database> RecordMapper<'a, D> {
    /// Create a mapper with the default cache capacity
    pub fn new(schema: &'a Schema, db: &'a D) -> Self {
        RecordMapper {
            schema,
            db,
            cache: RecordCache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// Create a mapper with an explicit cache capacity (zero disables
    /// caching)
    pub fn with_cache_capacity(schema: &'a Schema, db: &'a D, capacity: usize) -> Self {
        RecordMapper {
            schema,
            db,
            cache: RecordCache::new(capacity),
        }
    }

    /// Convert one full row into a typed record. The row must carry every
    /// declared column of the table; a missing column, a NULL in a
    /// NOT NULL column, or a storage-class mismatch is a mapping error.
    pub fn hydrate(&self, table: &str, row: &Row) -> Result<Record> {
        hydrate_row(self.schema, table, row)
    }

    /// Convert a batch of full rows
    pub fn hydrate_all(&self, table: &str, rows: &[Row]) -> Result<Vec<Record>> {
        rows.iter().map(|row| self.hydrate(table, row)).collect()
    }

    /// Run a select and hydrate its rows. The builder's projection must
    /// cover the table's declared columns, so leave it at the default
    /// full projection.
    pub async fn select(&self, builder: &SelectBuilder) -> Result<Vec<Record>> {
        let statement = builder.build(self.schema)?;
        let rows = self.db.fetch(&statement).await?;
        self.hydrate_all(builder.table(), &rows)
    }

    /// Fetch one record by primary key, consulting the identity cache
    /// first. A miss queries storage and fills the cache.
    pub async fn find(&mut self, table: &str, id: i64) -> Result<Option<Record>> {
        if let Some(record) = self.cache.get(table, id) {
            return Ok(Some(record.clone()));
        }
        match self.fetch_by_key(table, id).await? {
            Some(record) => {
                self.cache.put(record.clone());
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Eagerly fetch a related collection (one-to-many or the derived
    /// many-to-many view). The relationship must be declared; the record
    /// must have a primary key.
    pub async fn related(&self, record: &Record, target: &str) -> Result<Vec<Record>> {
        let id = record.id().ok_or_else(|| {
            AccessError::query_build(record.table(), "record has no primary key")
        })?;

        match self.schema.relation(record.table(), target)? {
            Relation::HasMany { target, remote_key } => {
                let builder = SelectBuilder::new(target.clone()).where_eq(remote_key, id);
                self.select(&builder).await
            }
            Relation::ManyToMany {
                target,
                via,
                near_key,
                far_key: _,
            } => {
                let projection: Vec<String> = self
                    .schema
                    .table(target)?
                    .column_names()
                    .map(|name| format!("{target}.{name}"))
                    .collect();
                let projection: Vec<&str> = projection.iter().map(String::as_str).collect();

                let builder = SelectBuilder::new(via.clone())
                    .columns(&projection)
                    .join(target)
                    .where_eq(near_key, id)
                    .distinct();
                let statement = builder.build(self.schema)?;
                let rows = self.db.fetch(&statement).await?;
                let mut records = self.hydrate_all(target, &rows)?;
                // the derived view is kept deterministic: target key order
                records.sort_by_key(|r| r.id());
                Ok(records)
            }
            Relation::BelongsTo { .. } => Err(AccessError::query_build(
                record.table(),
                format!("`{target}` is a single parent; use related_one"),
            )),
        }
    }

    /// Fetch the single parent across a belongs_to relationship. Returns
    /// `None` when the foreign key is NULL.
    pub async fn related_one(&self, record: &Record, target: &str) -> Result<Option<Record>> {
        match self.schema.relation(record.table(), target)? {
            Relation::BelongsTo { target, local_key } => {
                let foreign = record
                    .get(local_key)
                    .ok_or_else(|| AccessError::mapping(record.table(), local_key.clone()))?;
                match foreign.as_integer() {
                    Some(id) => self.fetch_by_key(target, id).await,
                    None => Ok(None),
                }
            }
            _ => Err(AccessError::query_build(
                record.table(),
                format!("`{target}` is a collection; use related"),
            )),
        }
    }

    /// Re-read a record from storage, discarding the cached copy. Returns
    /// `None` when the row no longer exists.
    pub async fn refresh(&mut self, record: &Record) -> Result<Option<Record>> {
        let id = record.id().ok_or_else(|| {
            AccessError::query_build(record.table(), "record has no primary key")
        })?;
        self.cache.invalidate(record.table(), id);

        match self.fetch_by_key(record.table(), id).await? {
            Some(fresh) => {
                self.cache.put(fresh.clone());
                Ok(Some(fresh))
            }
            None => Ok(None),
        }
    }

    /// Drop one record from the identity cache
    pub fn invalidate(&mut self, table: &str, id: i64) {
        self.cache.invalidate(table, id);
    }

    /// Drop every cached record
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Number of records currently cached
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn fetch_by_key(&self, table: &str, id: i64) -> Result<Option<Record>> {
        let pk = self.schema.table(table)?.primary_key().name().to_string();
        let statement = SelectBuilder::new(table)
            .where_eq(&pk, id)
            .build(self.schema)?;
        let rows = self.db.fetch(&statement).await?;
        match rows.first() {
            Some(row) => Ok(Some(self.hydrate(table, row)?)),
            None => Ok(None),
        }
    }
}

pub(crate) fn hydrate_row(schema: &Schema, table: &str, row: &Row) -> Result<Record> {
    let descriptor = schema.table(table)?;
    let mut ordered = Row::with_capacity(descriptor.columns().len());
    let mut key = None;

    for column in descriptor.columns() {
        let value = row
            .get(column.name())
            .ok_or_else(|| AccessError::mapping(table, column.name()))?;
        if !storage_class_matches(column, value) {
            return Err(AccessError::mapping(table, column.name()));
        }
        if column.is_primary_key() {
            key = value.as_integer();
        }
        ordered.push(column.name(), value.clone());
    }

    let key = key.ok_or_else(|| AccessError::mapping(table, descriptor.primary_key().name()))?;
    Ok(Record::from_row(table, ordered, key))
}

fn storage_class_matches(column: &Column, value: &Value) -> bool {
    match value {
        Value::Null => column.is_nullable(),
        Value::Integer(_) => matches!(
            column.column_type(),
            ColumnType::Integer | ColumnType::Real
        ),
        Value::Real(_) => column.column_type() == ColumnType::Real,
        Value::Text(_) => column.column_type() == ColumnType::Text,
        Value::Blob(_) => column.column_type() == ColumnType::Blob,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::{LockMode, Work};
    use crate::core::query_builder::Statement;
    use crate::core::schema::{Column as SchemaColumn, SchemaBuilder, Table};
    use crate::core::value::RowSet;

    fn schema() -> Schema {
        SchemaBuilder::new()
            .table(
                Table::new("products")
                    .column(SchemaColumn::primary_key("product_id"))
                    .column(SchemaColumn::text("product_name").not_null())
                    .column(SchemaColumn::integer("supplier_id"))
                    .column(SchemaColumn::real("price")),
            )
            .build()
            .unwrap()
    }

    fn product_row(id: i64, name: &str, price: f64) -> Row {
        let mut row = Row::new();
        row.push("product_id", Value::Integer(id));
        row.push("product_name", Value::Text(name.to_string()));
        row.push("supplier_id", Value::Null);
        row.push("price", Value::Real(price));
        row
    }

    // hydration and the cache are pure; a backend is only needed for the
    // fetching paths, which the integration tests cover
    struct NoDatabase;

    #[async_trait::async_trait]
    impl Database for NoDatabase {
        async fn fetch(&self, _statement: &Statement) -> Result<RowSet> {
            Err(AccessError::connectivity("no backend in unit tests"))
        }

        async fn begin(&self, _lock: LockMode) -> Result<Box<dyn Work>> {
            Err(AccessError::connectivity("no backend in unit tests"))
        }
    }

    #[test]
    fn test_hydrate_orders_fields_by_schema() {
        let schema = schema();
        let db = NoDatabase;
        let mapper = RecordMapper::new(&schema, &db);

        // row arrives in query order, record comes out in schema order
        let mut shuffled = Row::new();
        shuffled.push("price", Value::Real(18.0));
        shuffled.push("product_id", Value::Integer(1));
        shuffled.push("supplier_id", Value::Integer(3));
        shuffled.push("product_name", Value::Text("Chai".to_string()));

        let record = mapper.hydrate("products", &shuffled).unwrap();
        assert_eq!(record.id(), Some(1));
        assert_eq!(
            record.columns(),
            &["product_id", "product_name", "supplier_id", "price"]
        );
        assert_eq!(record.get("product_name"), Some(&Value::Text("Chai".into())));
    }

    #[test]
    fn test_hydrate_rejects_mismatched_rows() {
        let schema = schema();
        let db = NoDatabase;
        let mapper = RecordMapper::new(&schema, &db);

        let mut missing = Row::new();
        missing.push("product_id", Value::Integer(1));
        missing.push("product_name", Value::Text("Chai".to_string()));
        missing.push("supplier_id", Value::Null);
        assert!(matches!(
            mapper.hydrate("products", &missing),
            Err(AccessError::Mapping { .. })
        ));

        let mut null_name = product_row(2, "Chang", 19.0);
        null_name.set("product_name", Value::Null);
        assert!(matches!(
            mapper.hydrate("products", &null_name),
            Err(AccessError::Mapping { .. })
        ));

        let mut mistyped = product_row(3, "Aniseed Syrup", 10.0);
        mistyped.set("price", Value::Text("ten".to_string()));
        assert!(matches!(
            mapper.hydrate("products", &mistyped),
            Err(AccessError::Mapping { .. })
        ));
    }

    #[test]
    fn test_hydrate_accepts_integer_in_real_column() {
        let schema = schema();
        let db = NoDatabase;
        let mapper = RecordMapper::new(&schema, &db);

        let mut row = product_row(4, "Ikura", 31.0);
        row.set("price", Value::Integer(31));
        let record = mapper.hydrate("products", &row).unwrap();
        assert_eq!(record.get("price"), Some(&Value::Integer(31)));
    }

    #[test]
    fn test_record_builder_and_mutation() {
        let mut record = Record::new("products")
            .with("product_name", "Tofu")
            .with("price", 23.25);

        assert_eq!(record.table(), "products");
        assert_eq!(record.id(), None);
        record.set("price", 21.35);
        assert_eq!(record.get("price"), Some(&Value::Real(21.35)));

        record.assign_key("product_id", 14);
        assert_eq!(record.id(), Some(14));
        assert_eq!(record.get("product_id"), Some(&Value::Integer(14)));
    }

    #[test]
    fn test_cache_fifo_eviction() {
        let schema = schema();
        let db = NoDatabase;
        let mapper = RecordMapper::new(&schema, &db);
        let mut cache = RecordCache::new(2);

        for id in 1..=3 {
            let row = product_row(id, "p", 1.0);
            cache.put(mapper.hydrate("products", &row).unwrap());
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get("products", 1).is_none());
        assert!(cache.get("products", 2).is_some());
        assert!(cache.get("products", 3).is_some());
    }

    #[test]
    fn test_cache_invalidate_and_clear() {
        let schema = schema();
        let db = NoDatabase;
        let mapper = RecordMapper::new(&schema, &db);
        let mut cache = RecordCache::new(8);

        cache.put(mapper.hydrate("products", &product_row(1, "a", 1.0)).unwrap());
        cache.put(mapper.hydrate("products", &product_row(2, "b", 2.0)).unwrap());

        cache.invalidate("products", 1);
        assert!(cache.get("products", 1).is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());

        // unkeyed records are not cacheable
        cache.put(Record::new("products").with("product_name", "x"));
        assert!(cache.is_empty());
    }
}
