//! Schema registry
//!
//! Tables, columns, keys, and relationships are declared once through
//! [`SchemaBuilder`], validated, and frozen into an immutable [`Schema`].
//! Declarations are authoritative on the many side only: a child table
//! declares `belongs_to` its parent, and the inverse one-to-many (and the
//! many-to-many view across a junction table) are derived at build time.
//! Nothing mutates the registry after `build()`.

use serde::{Deserialize, Serialize};

use crate::core::error::{AccessError, Result};

/// Storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    /// SQL type keyword for DDL emission
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// A declared column: name, storage class, nullability, primary-key flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    ty: ColumnType,
    nullable: bool,
    primary_key: bool,
}

impl Column {
    /// Declare the integer primary key of a table. Keys are assigned by
    /// storage at insert and immutable thereafter.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Column {
            name: name.into(),
            ty: ColumnType::Integer,
            nullable: false,
            primary_key: true,
        }
    }

    /// Declare a nullable INTEGER column
    pub fn integer(name: impl Into<String>) -> Self {
        Column::plain(name, ColumnType::Integer)
    }

    /// Declare a nullable REAL column
    pub fn real(name: impl Into<String>) -> Self {
        Column::plain(name, ColumnType::Real)
    }

    /// Declare a nullable TEXT column
    pub fn text(name: impl Into<String>) -> Self {
        Column::plain(name, ColumnType::Text)
    }

    /// Declare a nullable BLOB column
    pub fn blob(name: impl Into<String>) -> Self {
        Column::plain(name, ColumnType::Blob)
    }

    fn plain(name: impl Into<String>, ty: ColumnType) -> Self {
        Column {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
        }
    }

    /// Mark the column NOT NULL
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage class
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    /// Whether NULL is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether this is the table's primary key
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    fn ddl_fragment(&self) -> String {
        if self.primary_key {
            format!("{} {} PRIMARY KEY AUTOINCREMENT", self.name, self.ty.as_sql())
        } else if self.nullable {
            format!("{} {}", self.name, self.ty.as_sql())
        } else {
            format!("{} {} NOT NULL", self.name, self.ty.as_sql())
        }
    }
}

/// A declared or derived relationship, named after its target table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Relation {
    /// Foreign key on this table referencing a parent row. The only
    /// declared form; everything else is derived from it.
    BelongsTo {
        target: String,
        /// Foreign-key column on the declaring table
        local_key: String,
    },
    /// Inverse of a child's `BelongsTo`, derived at build
    HasMany {
        target: String,
        /// Foreign-key column on the child (target) table
        remote_key: String,
    },
    /// View across a junction table, derived at build
    ManyToMany {
        target: String,
        /// The junction table
        via: String,
        /// Junction column referencing this side
        near_key: String,
        /// Junction column referencing the target side
        far_key: String,
    },
}

impl Relation {
    /// Target table of the relationship
    pub fn target(&self) -> &str {
        match self {
            Relation::BelongsTo { target, .. }
            | Relation::HasMany { target, .. }
            | Relation::ManyToMany { target, .. } => target,
        }
    }
}

/// A table declaration, and after `SchemaBuilder::build` the frozen
/// table description with its derived relationships filled in
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    junction: bool,
    relations: Vec<(String, Relation)>,
    pk: usize,
}

impl Table {
    /// Start declaring a table
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            junction: false,
            relations: Vec::new(),
            pk: 0,
        }
    }

    /// Add a column
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare that `local_key` on this table references a row of
    /// `target`. The inverse one-to-many is derived at build; do not
    /// declare it.
    #[must_use]
    pub fn belongs_to(mut self, target: impl Into<String>, local_key: impl Into<String>) -> Self {
        let target = target.into();
        self.relations.push((
            target.clone(),
            Relation::BelongsTo {
                target,
                local_key: local_key.into(),
            },
        ));
        self
    }

    /// Flag this table as a junction: exactly two `belongs_to` edges, and
    /// a many-to-many view is derived between their targets
    #[must_use]
    pub fn junction(mut self) -> Self {
        self.junction = true;
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns in declaration order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Look up a column by name
    pub fn column_named(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                AccessError::schema(&self.name, format!("column `{name}` is not declared"))
            })
    }

    /// Whether a column is declared
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// The table's primary-key column
    pub fn primary_key(&self) -> &Column {
        &self.columns[self.pk]
    }

    /// Whether this table was flagged as a junction
    pub fn is_junction(&self) -> bool {
        self.junction
    }

    /// All relationships (declared and derived), named by target table
    pub fn relations(&self) -> &[(String, Relation)] {
        &self.relations
    }

    /// Look up a relationship by target table name
    pub fn relation(&self, target: &str) -> Result<&Relation> {
        self.relations
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, rel)| rel)
            .ok_or_else(|| {
                AccessError::schema(
                    &self.name,
                    format!("no declared relationship to `{target}`"),
                )
            })
    }

    fn belongs_to_edges(&self) -> Vec<(String, String)> {
        self.relations
            .iter()
            .filter_map(|(_, rel)| match rel {
                Relation::BelongsTo { target, local_key } => {
                    Some((target.clone(), local_key.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Declares tables and relationships, validates the whole graph, and
/// freezes it into a [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<Table>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Add a table declaration
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Validate every declaration and derive the inverse relationships.
    /// The returned schema is immutable.
    pub fn build(mut self) -> Result<Schema> {
        for i in 0..self.tables.len() {
            for j in (i + 1)..self.tables.len() {
                if self.tables[i].name == self.tables[j].name {
                    return Err(AccessError::schema(
                        &self.tables[i].name,
                        "table declared twice",
                    ));
                }
            }
        }

        for table in &mut self.tables {
            validate_columns(table)?;
        }

        let derived = self.derive_relations()?;
        for (source, name, relation) in derived {
            let table = self
                .tables
                .iter_mut()
                .find(|t| t.name == source)
                .ok_or_else(|| AccessError::schema(&source, "table is not declared"))?;
            if table.relations.iter().any(|(n, _)| *n == name) {
                return Err(AccessError::schema(
                    &source,
                    format!("relationship to `{name}` declared more than once"),
                ));
            }
            table.relations.push((name, relation));
        }

        Ok(Schema {
            tables: self.tables,
        })
    }

    /// Check declared edges and compute the derived ones without touching
    /// the tables yet (split borrows keep this simple).
    fn derive_relations(&self) -> Result<Vec<(String, String, Relation)>> {
        let mut derived = Vec::new();

        for table in &self.tables {
            let mut seen = Vec::new();
            for (name, relation) in &table.relations {
                if seen.contains(name) {
                    return Err(AccessError::schema(
                        &table.name,
                        format!("relationship to `{name}` declared more than once"),
                    ));
                }
                seen.push(name.clone());

                let Relation::BelongsTo { target, local_key } = relation else {
                    return Err(AccessError::schema(
                        &table.name,
                        "only belongs_to may be declared; inverses are derived",
                    ));
                };

                let parent = self
                    .tables
                    .iter()
                    .find(|t| t.name == *target)
                    .ok_or_else(|| {
                        AccessError::schema(
                            &table.name,
                            format!("belongs_to target `{target}` is not declared"),
                        )
                    })?;
                let local = table.column_named(local_key)?;
                if local.ty != ColumnType::Integer {
                    return Err(AccessError::schema(
                        &table.name,
                        format!("foreign key `{local_key}` must be an INTEGER column"),
                    ));
                }

                derived.push((
                    parent.name.clone(),
                    table.name.clone(),
                    Relation::HasMany {
                        target: table.name.clone(),
                        remote_key: local_key.clone(),
                    },
                ));
            }

            if table.junction {
                let edges = table.belongs_to_edges();
                if edges.len() != 2 {
                    return Err(AccessError::schema(
                        &table.name,
                        format!(
                            "a junction table needs exactly two belongs_to edges, found {}",
                            edges.len()
                        ),
                    ));
                }
                let (left, left_key) = &edges[0];
                let (right, right_key) = &edges[1];
                derived.push((
                    left.clone(),
                    right.clone(),
                    Relation::ManyToMany {
                        target: right.clone(),
                        via: table.name.clone(),
                        near_key: left_key.clone(),
                        far_key: right_key.clone(),
                    },
                ));
                derived.push((
                    right.clone(),
                    left.clone(),
                    Relation::ManyToMany {
                        target: left.clone(),
                        via: table.name.clone(),
                        near_key: right_key.clone(),
                        far_key: left_key.clone(),
                    },
                ));
            }
        }

        Ok(derived)
    }
}

fn validate_columns(table: &mut Table) -> Result<()> {
    if table.columns.is_empty() {
        return Err(AccessError::schema(&table.name, "table has no columns"));
    }

    for i in 0..table.columns.len() {
        for j in (i + 1)..table.columns.len() {
            if table.columns[i].name == table.columns[j].name {
                return Err(AccessError::schema(
                    &table.name,
                    format!("column `{}` declared twice", table.columns[i].name),
                ));
            }
        }
    }

    let keys: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.primary_key)
        .map(|(i, _)| i)
        .collect();
    match keys.as_slice() {
        [index] => {
            if table.columns[*index].ty != ColumnType::Integer {
                return Err(AccessError::schema(
                    &table.name,
                    "the primary key must be an INTEGER column",
                ));
            }
            table.pk = *index;
            Ok(())
        }
        [] => Err(AccessError::schema(
            &table.name,
            "table has no primary key",
        )),
        _ => Err(AccessError::schema(
            &table.name,
            "table has more than one primary key",
        )),
    }
}

/// Immutable registry of tables and relationships
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// All tables in declaration order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| AccessError::schema(name, "table is not declared"))
    }

    /// Look up a column by table and name
    pub fn column(&self, table: &str, column: &str) -> Result<&Column> {
        self.table(table)?.column_named(column)
    }

    /// Look up a relationship by source table and target table
    pub fn relation(&self, table: &str, target: &str) -> Result<&Relation> {
        self.table(table)?.relation(target)
    }

    /// DDL for provisioning the schema, one CREATE TABLE per table in
    /// declaration order. Foreign-key clauses are emitted for every
    /// declared belongs_to edge; enforcement still has to be switched on
    /// per connection.
    pub fn create_statements(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|table| {
                let mut parts: Vec<String> =
                    table.columns.iter().map(Column::ddl_fragment).collect();
                for (_, relation) in &table.relations {
                    if let Relation::BelongsTo { target, local_key } = relation {
                        // build() guarantees the target exists
                        let parent_key = self
                            .table(target)
                            .map(|t| t.primary_key().name().to_string())
                            .unwrap_or_default();
                        parts.push(format!(
                            "FOREIGN KEY ({local_key}) REFERENCES {target} ({parent_key})"
                        ));
                    }
                }
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({})",
                    table.name,
                    parts.join(", ")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_table_schema() -> Schema {
        SchemaBuilder::new()
            .table(
                Table::new("suppliers")
                    .column(Column::primary_key("supplier_id"))
                    .column(Column::text("supplier_name").not_null()),
            )
            .table(
                Table::new("products")
                    .column(Column::primary_key("product_id"))
                    .column(Column::text("product_name").not_null())
                    .column(Column::integer("supplier_id"))
                    .column(Column::real("price"))
                    .belongs_to("suppliers", "supplier_id"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookups() {
        let schema = two_table_schema();

        let products = schema.table("products").unwrap();
        assert_eq!(products.primary_key().name(), "product_id");
        assert_eq!(
            products.column_names().collect::<Vec<_>>(),
            vec!["product_id", "product_name", "supplier_id", "price"]
        );
        assert!(products.column_named("price").unwrap().is_nullable());
        assert!(!products.column_named("product_name").unwrap().is_nullable());

        assert!(matches!(
            schema.table("missing"),
            Err(AccessError::Schema { .. })
        ));
        assert!(matches!(
            schema.column("products", "missing"),
            Err(AccessError::Schema { .. })
        ));
    }

    #[test]
    fn test_inverse_relation_is_derived() {
        let schema = two_table_schema();

        match schema.relation("products", "suppliers").unwrap() {
            Relation::BelongsTo { target, local_key } => {
                assert_eq!(target, "suppliers");
                assert_eq!(local_key, "supplier_id");
            }
            other => panic!("unexpected relation: {other:?}"),
        }

        match schema.relation("suppliers", "products").unwrap() {
            Relation::HasMany { target, remote_key } => {
                assert_eq!(target, "products");
                assert_eq!(remote_key, "supplier_id");
            }
            other => panic!("unexpected relation: {other:?}"),
        }
    }

    #[test]
    fn test_junction_derives_many_to_many_both_ways() {
        let schema = SchemaBuilder::new()
            .table(
                Table::new("orders")
                    .column(Column::primary_key("order_id")),
            )
            .table(
                Table::new("products")
                    .column(Column::primary_key("product_id")),
            )
            .table(
                Table::new("line_items")
                    .column(Column::primary_key("line_item_id"))
                    .column(Column::integer("order_id").not_null())
                    .column(Column::integer("product_id").not_null())
                    .column(Column::integer("quantity").not_null())
                    .belongs_to("orders", "order_id")
                    .belongs_to("products", "product_id")
                    .junction(),
            )
            .build()
            .unwrap();

        match schema.relation("orders", "products").unwrap() {
            Relation::ManyToMany {
                via,
                near_key,
                far_key,
                ..
            } => {
                assert_eq!(via, "line_items");
                assert_eq!(near_key, "order_id");
                assert_eq!(far_key, "product_id");
            }
            other => panic!("unexpected relation: {other:?}"),
        }

        match schema.relation("products", "orders").unwrap() {
            Relation::ManyToMany {
                near_key, far_key, ..
            } => {
                assert_eq!(near_key, "product_id");
                assert_eq!(far_key, "order_id");
            }
            other => panic!("unexpected relation: {other:?}"),
        }

        // the junction's own edges also derive the line collections
        assert!(matches!(
            schema.relation("orders", "line_items").unwrap(),
            Relation::HasMany { .. }
        ));
    }

    #[test]
    fn test_build_rejects_bad_declarations() {
        let dup = SchemaBuilder::new()
            .table(Table::new("a").column(Column::primary_key("id")))
            .table(Table::new("a").column(Column::primary_key("id")))
            .build();
        assert!(matches!(dup, Err(AccessError::Schema { .. })));

        let no_pk = SchemaBuilder::new()
            .table(Table::new("a").column(Column::text("name")))
            .build();
        assert!(matches!(no_pk, Err(AccessError::Schema { .. })));

        // a non-integer key can only arrive through deserialized descriptors
        let key: Column = serde_json::from_str(
            r#"{"name":"id","ty":"Text","nullable":false,"primary_key":true}"#,
        )
        .unwrap();
        let text_pk = SchemaBuilder::new().table(Table::new("a").column(key)).build();
        assert!(matches!(text_pk, Err(AccessError::Schema { .. })));

        let dangling = SchemaBuilder::new()
            .table(
                Table::new("a")
                    .column(Column::primary_key("id"))
                    .column(Column::integer("b_id"))
                    .belongs_to("b", "b_id"),
            )
            .build();
        assert!(matches!(dangling, Err(AccessError::Schema { .. })));

        let missing_key = SchemaBuilder::new()
            .table(Table::new("b").column(Column::primary_key("id")))
            .table(
                Table::new("a")
                    .column(Column::primary_key("id"))
                    .belongs_to("b", "b_id"),
            )
            .build();
        assert!(matches!(missing_key, Err(AccessError::Schema { .. })));

        let lopsided_junction = SchemaBuilder::new()
            .table(Table::new("b").column(Column::primary_key("id")))
            .table(
                Table::new("j")
                    .column(Column::primary_key("id"))
                    .column(Column::integer("b_id").not_null())
                    .belongs_to("b", "b_id")
                    .junction(),
            )
            .build();
        assert!(matches!(lopsided_junction, Err(AccessError::Schema { .. })));
    }

    #[test]
    fn test_create_statements() {
        let schema = two_table_schema();
        let ddl = schema.create_statements();

        assert_eq!(
            ddl[0],
            "CREATE TABLE IF NOT EXISTS suppliers (supplier_id INTEGER PRIMARY KEY AUTOINCREMENT, supplier_name TEXT NOT NULL)"
        );
        assert_eq!(
            ddl[1],
            "CREATE TABLE IF NOT EXISTS products (product_id INTEGER PRIMARY KEY AUTOINCREMENT, \
             product_name TEXT NOT NULL, supplier_id INTEGER, price REAL, \
             FOREIGN KEY (supplier_id) REFERENCES suppliers (supplier_id))"
        );
    }
}
