//! Schema-validated SQL builders
//!
//! Fluent builders for SELECT, INSERT, UPDATE, and DELETE. Every builder is
//! checked against the schema registry at `build()` time and produces a
//! [`Statement`]: SQL text plus its ordered parameter list. Filter values
//! are never interpolated into the text; joins are resolved through the
//! registry's declared relationships rather than hand-written ON clauses.

use super::error::{AccessError, Result};
use super::schema::{Relation, Schema};
use super::value::Value;

/// A built query: SQL text and its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// SQL comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal to (=)
    Eq,
    /// Not equal to (!=)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
}

impl Operator {
    fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

/// WHERE clause condition against a base-table column
#[derive(Debug, Clone)]
struct Condition {
    column: String,
    operator: Operator,
    value: Value,
}

/// JOIN flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN
    Inner,
    /// LEFT JOIN
    Left,
}

impl JoinType {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// A requested join: the target table of a declared relationship
#[derive(Debug, Clone)]
struct Join {
    join_type: JoinType,
    target: String,
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// SELECT query builder
///
/// The projection defaults to every declared column of the base table, in
/// declaration order. Projection and filter entries may name a joined
/// table's column with a `table.column` prefix; ordering applies to
/// base-table columns.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<Join>,
    where_conditions: Vec<Condition>,
    order_by: Vec<(String, OrderDirection)>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SelectBuilder {
    /// Create a new SELECT query builder for a base table
    ///
    /// # Example
    ///
    /// ```
    /// use rust_data_access::core::query_builder::SelectBuilder;
    /// use rust_data_access::catalog::commerce_schema;
    ///
    /// let schema = commerce_schema().unwrap();
    /// let stmt = SelectBuilder::new("products")
    ///     .columns(&["product_name", "price"])
    ///     .build(&schema)
    ///     .unwrap();
    /// assert_eq!(stmt.sql, "SELECT product_name, price FROM products");
    /// ```
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// The base table this builder selects from
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Select specific columns; `table.column` entries reach into joined
    /// tables. An empty list restores the default full projection.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Deduplicate result rows (SELECT DISTINCT)
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Eq, value.into());
        self
    }

    /// Add a WHERE column != value condition
    #[must_use]
    pub fn where_ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Ne, value.into());
        self
    }

    /// Add a WHERE column > value condition
    #[must_use]
    pub fn where_gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Gt, value.into());
        self
    }

    /// Add a WHERE column >= value condition
    #[must_use]
    pub fn where_ge(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Ge, value.into());
        self
    }

    /// Add a WHERE column < value condition
    #[must_use]
    pub fn where_lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Lt, value.into());
        self
    }

    /// Add a WHERE column <= value condition
    #[must_use]
    pub fn where_le(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(column, Operator::Le, value.into());
        self
    }

    fn condition(&mut self, column: &str, operator: Operator, value: Value) {
        self.where_conditions.push(Condition {
            column: column.to_string(),
            operator,
            value,
        });
    }

    /// Join a related table. The relationship must be declared in the
    /// schema; a many-to-many target joins through its junction in two
    /// hops.
    #[must_use]
    pub fn join(mut self, target: &str) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Inner,
            target: target.to_string(),
        });
        self
    }

    /// Join a related table, keeping base rows without a match
    #[must_use]
    pub fn left_join(mut self, target: &str) -> Self {
        self.joins.push(Join {
            join_type: JoinType::Left,
            target: target.to_string(),
        });
        self
    }

    /// Add ORDER BY clause on a base-table column
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    /// Add ORDER BY ASC
    #[must_use]
    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Asc)
    }

    /// Add ORDER BY DESC
    #[must_use]
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Desc)
    }

    /// Add LIMIT clause
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add OFFSET clause
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Validate against the schema and build the statement
    pub fn build(&self, schema: &Schema) -> Result<Statement> {
        let base = schema
            .table(&self.table)
            .map_err(|_| AccessError::query_build(&self.table, "base table is not declared"))?;
        let qualify = !self.joins.is_empty();

        // resolve joins first so projections may reference joined tables
        let mut join_sql = String::new();
        let mut joined: Vec<String> = Vec::new();
        for join in &self.joins {
            let relation = base.relation(&join.target).map_err(|_| {
                AccessError::query_build(
                    &self.table,
                    format!("no declared relationship to join target `{}`", join.target),
                )
            })?;
            let keyword = join.join_type.as_sql();
            match relation {
                Relation::BelongsTo { target, local_key } => {
                    let parent_key = schema.table(target)?.primary_key().name().to_string();
                    join_sql.push_str(&format!(
                        " {keyword} {target} ON {}.{local_key} = {target}.{parent_key}",
                        self.table
                    ));
                }
                Relation::HasMany { target, remote_key } => {
                    join_sql.push_str(&format!(
                        " {keyword} {target} ON {target}.{remote_key} = {}.{}",
                        self.table,
                        base.primary_key().name()
                    ));
                }
                Relation::ManyToMany {
                    target,
                    via,
                    near_key,
                    far_key,
                } => {
                    let far_pk = schema.table(target)?.primary_key().name().to_string();
                    join_sql.push_str(&format!(
                        " {keyword} {via} ON {via}.{near_key} = {}.{}",
                        self.table,
                        base.primary_key().name()
                    ));
                    join_sql.push_str(&format!(
                        " {keyword} {target} ON {target}.{far_pk} = {via}.{far_key}"
                    ));
                    joined.push(via.clone());
                }
            }
            joined.push(join.target.clone());
        }

        let projection = if self.columns.is_empty() {
            base.column_names()
                .map(|name| {
                    if qualify {
                        format!("{}.{name}", self.table)
                    } else {
                        name.to_string()
                    }
                })
                .collect::<Vec<_>>()
        } else {
            self.columns
                .iter()
                .map(|entry| self.resolve_column_ref(schema, entry, &joined, qualify))
                .collect::<Result<Vec<_>>>()?
        };

        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if self.distinct { "DISTINCT " } else { "" },
            projection.join(", "),
            self.table
        );
        sql.push_str(&join_sql);

        let mut params = Vec::with_capacity(self.where_conditions.len());
        if !self.where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            let conditions: Vec<String> = self
                .where_conditions
                .iter()
                .map(|cond| {
                    let column = self.resolve_column_ref(schema, &cond.column, &joined, qualify)?;
                    params.push(cond.value.clone());
                    Ok(format!("{column} {} ?", cond.operator.as_sql()))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let order_clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|(col, dir)| {
                    if !base.has_column(col) {
                        return Err(AccessError::query_build(
                            &self.table,
                            format!("order column `{col}` is not declared"),
                        ));
                    }
                    let column = if qualify {
                        format!("{}.{col}", self.table)
                    } else {
                        col.clone()
                    };
                    Ok(format!("{column} {}", dir.as_sql()))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(&order_clauses.join(", "));
        }

        // limit and offset are structural integers, never data
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(Statement { sql, params })
    }

    /// Resolve a projection or filter entry to its SQL column reference.
    /// Dotted entries must name the base table or one the joins pulled in.
    fn resolve_column_ref(
        &self,
        schema: &Schema,
        entry: &str,
        joined: &[String],
        qualify: bool,
    ) -> Result<String> {
        match entry.split_once('.') {
            Some((table, column)) => {
                if table != self.table && !joined.iter().any(|j| j == table) {
                    return Err(AccessError::query_build(
                        &self.table,
                        format!("table `{table}` is not part of this query"),
                    ));
                }
                schema.table(table)?.column_named(column).map_err(|_| {
                    AccessError::query_build(
                        &self.table,
                        format!("column `{entry}` is not declared"),
                    )
                })?;
                Ok(format!("{table}.{column}"))
            }
            None => {
                let base = schema.table(&self.table)?;
                if !base.has_column(entry) {
                    return Err(AccessError::query_build(
                        &self.table,
                        format!("column `{entry}` is not declared"),
                    ));
                }
                if qualify {
                    Ok(format!("{}.{entry}", self.table))
                } else {
                    Ok(entry.to_string())
                }
            }
        }
    }
}

/// INSERT query builder. Primary keys are assigned by storage and may not
/// be supplied.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertBuilder {
    /// Create a new INSERT query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a column-value pair
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Validate against the schema and build the statement
    pub fn build(&self, schema: &Schema) -> Result<Statement> {
        let table = schema
            .table(&self.table)
            .map_err(|_| AccessError::query_build(&self.table, "base table is not declared"))?;
        if self.columns.is_empty() {
            return Err(AccessError::query_build(
                &self.table,
                "insert has no values",
            ));
        }
        for column in &self.columns {
            if !table.has_column(column) {
                return Err(AccessError::query_build(
                    &self.table,
                    format!("insert column `{column}` is not declared"),
                ));
            }
            if column == table.primary_key().name() {
                return Err(AccessError::query_build(
                    &self.table,
                    format!("primary key `{column}` is assigned by storage"),
                ));
            }
        }

        let placeholders: Vec<&str> = vec!["?"; self.values.len()];
        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                self.columns.join(", "),
                placeholders.join(", ")
            ),
            params: self.values.clone(),
        })
    }
}

/// UPDATE query builder. Refuses to touch the primary key and refuses to
/// run unfiltered.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set_columns: Vec<String>,
    set_values: Vec<Value>,
    where_conditions: Vec<Condition>,
}

impl UpdateBuilder {
    /// Create a new UPDATE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_columns: Vec::new(),
            set_values: Vec::new(),
            where_conditions: Vec::new(),
        }
    }

    /// Set a column value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_columns.push(column.to_string());
        self.set_values.push(value.into());
        self
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_conditions.push(Condition {
            column: column.to_string(),
            operator: Operator::Eq,
            value: value.into(),
        });
        self
    }

    /// Validate against the schema and build the statement. Parameters
    /// carry the SET values followed by the WHERE values.
    pub fn build(&self, schema: &Schema) -> Result<Statement> {
        let table = schema
            .table(&self.table)
            .map_err(|_| AccessError::query_build(&self.table, "base table is not declared"))?;
        if self.set_columns.is_empty() {
            return Err(AccessError::query_build(
                &self.table,
                "update sets no columns",
            ));
        }
        if self.where_conditions.is_empty() {
            return Err(AccessError::query_build(
                &self.table,
                "refusing an unfiltered update",
            ));
        }
        for column in &self.set_columns {
            if !table.has_column(column) {
                return Err(AccessError::query_build(
                    &self.table,
                    format!("set column `{column}` is not declared"),
                ));
            }
            if column == table.primary_key().name() {
                return Err(AccessError::query_build(
                    &self.table,
                    format!("primary key `{column}` is immutable"),
                ));
            }
        }

        let set_clauses: Vec<String> = self
            .set_columns
            .iter()
            .map(|col| format!("{col} = ?"))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, set_clauses.join(", "));

        let mut params = self.set_values.clone();
        sql.push_str(" WHERE ");
        let conditions: Vec<String> = self
            .where_conditions
            .iter()
            .map(|cond| {
                if !table.has_column(&cond.column) {
                    return Err(AccessError::query_build(
                        &self.table,
                        format!("filter column `{}` is not declared", cond.column),
                    ));
                }
                params.push(cond.value.clone());
                Ok(format!("{} {} ?", cond.column, cond.operator.as_sql()))
            })
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(&conditions.join(" AND "));

        Ok(Statement { sql, params })
    }
}

/// DELETE query builder. Refuses to run unfiltered.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    where_conditions: Vec<Condition>,
}

impl DeleteBuilder {
    /// Create a new DELETE query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_conditions: Vec::new(),
        }
    }

    /// Add a WHERE column = value condition
    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_conditions.push(Condition {
            column: column.to_string(),
            operator: Operator::Eq,
            value: value.into(),
        });
        self
    }

    /// Validate against the schema and build the statement
    pub fn build(&self, schema: &Schema) -> Result<Statement> {
        let table = schema
            .table(&self.table)
            .map_err(|_| AccessError::query_build(&self.table, "base table is not declared"))?;
        if self.where_conditions.is_empty() {
            return Err(AccessError::query_build(
                &self.table,
                "refusing an unfiltered delete",
            ));
        }

        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = Vec::with_capacity(self.where_conditions.len());
        sql.push_str(" WHERE ");
        let conditions: Vec<String> = self
            .where_conditions
            .iter()
            .map(|cond| {
                if !table.has_column(&cond.column) {
                    return Err(AccessError::query_build(
                        &self.table,
                        format!("filter column `{}` is not declared", cond.column),
                    ));
                }
                params.push(cond.value.clone());
                Ok(format!("{} {} ?", cond.column, cond.operator.as_sql()))
            })
            .collect::<Result<Vec<_>>>()?;
        sql.push_str(&conditions.join(" AND "));

        Ok(Statement { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, SchemaBuilder, Table};

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .table(
                Table::new("suppliers")
                    .column(Column::primary_key("supplier_id"))
                    .column(Column::text("supplier_name").not_null())
                    .column(Column::text("city")),
            )
            .table(
                Table::new("products")
                    .column(Column::primary_key("product_id"))
                    .column(Column::text("product_name").not_null())
                    .column(Column::integer("supplier_id"))
                    .column(Column::real("price"))
                    .belongs_to("suppliers", "supplier_id"),
            )
            .table(
                Table::new("orders")
                    .column(Column::primary_key("order_id"))
                    .column(Column::text("order_date")),
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
            .unwrap()
    }

    #[test]
    fn test_select_default_projection() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("products").build(&schema).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT product_id, product_name, supplier_id, price FROM products"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_where_params_in_order() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("products")
            .columns(&["product_name"])
            .where_gt("price", 10.0)
            .where_ne("product_name", "Chai")
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT product_name FROM products WHERE price > ? AND product_name != ?"
        );
        assert_eq!(
            stmt.params,
            vec![Value::Real(10.0), Value::Text("Chai".to_string())]
        );
    }

    #[test]
    fn test_select_order_limit_offset() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("products")
            .order_by_desc("price")
            .order_by_asc("product_name")
            .limit(10)
            .offset(20)
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT product_id, product_name, supplier_id, price FROM products \
             ORDER BY price DESC, product_name ASC LIMIT 10 OFFSET 20"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_join_belongs_to() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("products")
            .columns(&["product_name", "suppliers.supplier_name"])
            .join("suppliers")
            .limit(5)
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT products.product_name, suppliers.supplier_name FROM products \
             JOIN suppliers ON products.supplier_id = suppliers.supplier_id LIMIT 5"
        );
    }

    #[test]
    fn test_select_filter_on_joined_table() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("products")
            .columns(&["product_name"])
            .join("suppliers")
            .where_eq("suppliers.city", "London")
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT products.product_name FROM products \
             JOIN suppliers ON products.supplier_id = suppliers.supplier_id \
             WHERE suppliers.city = ?"
        );
        assert_eq!(stmt.params, vec![Value::Text("London".to_string())]);

        // a dotted filter on a table the query never joined is rejected
        let stray = SelectBuilder::new("products")
            .where_eq("suppliers.city", "London")
            .build(&schema);
        assert!(matches!(stray, Err(AccessError::QueryBuild { .. })));
    }

    #[test]
    fn test_select_join_has_many() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("orders")
            .columns(&["order_id", "line_items.quantity"])
            .join("line_items")
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT orders.order_id, line_items.quantity FROM orders \
             JOIN line_items ON line_items.order_id = orders.order_id"
        );
    }

    #[test]
    fn test_select_join_many_to_many_two_hops() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("orders")
            .columns(&["order_id", "products.product_name"])
            .join("products")
            .where_eq("order_id", 3)
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT orders.order_id, products.product_name FROM orders \
             JOIN line_items ON line_items.order_id = orders.order_id \
             JOIN products ON products.product_id = line_items.product_id \
             WHERE orders.order_id = ?"
        );
        assert_eq!(stmt.params, vec![Value::Integer(3)]);
    }

    #[test]
    fn test_select_distinct_through_junction() {
        let schema = test_schema();
        let stmt = SelectBuilder::new("line_items")
            .columns(&["products.product_id", "products.product_name"])
            .join("products")
            .where_eq("order_id", 7)
            .distinct()
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT DISTINCT products.product_id, products.product_name FROM line_items \
             JOIN products ON line_items.product_id = products.product_id \
             WHERE line_items.order_id = ?"
        );
    }

    #[test]
    fn test_select_rejects_undeclared_names() {
        let schema = test_schema();

        let unknown_table = SelectBuilder::new("warehouses").build(&schema);
        assert!(matches!(
            unknown_table,
            Err(AccessError::QueryBuild { .. })
        ));

        let unknown_column = SelectBuilder::new("products")
            .columns(&["prize"])
            .build(&schema);
        assert!(matches!(
            unknown_column,
            Err(AccessError::QueryBuild { .. })
        ));

        let unknown_filter = SelectBuilder::new("products")
            .where_eq("prize", 1)
            .build(&schema);
        assert!(matches!(
            unknown_filter,
            Err(AccessError::QueryBuild { .. })
        ));

        let undeclared_join = SelectBuilder::new("suppliers")
            .join("orders")
            .build(&schema);
        assert!(matches!(
            undeclared_join,
            Err(AccessError::QueryBuild { .. })
        ));

        let stray_projection = SelectBuilder::new("products")
            .columns(&["orders.order_id"])
            .build(&schema);
        assert!(matches!(
            stray_projection,
            Err(AccessError::QueryBuild { .. })
        ));
    }

    #[test]
    fn test_insert() {
        let schema = test_schema();
        let stmt = InsertBuilder::new("line_items")
            .value("order_id", 1)
            .value("product_id", 2)
            .value("quantity", 10)
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO line_items (order_id, product_id, quantity) VALUES (?, ?, ?)"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_insert_rejects_primary_key() {
        let schema = test_schema();
        let stmt = InsertBuilder::new("line_items")
            .value("line_item_id", 99)
            .value("quantity", 1)
            .build(&schema);
        assert!(matches!(stmt, Err(AccessError::QueryBuild { .. })));
    }

    #[test]
    fn test_update() {
        let schema = test_schema();
        let stmt = UpdateBuilder::new("line_items")
            .set("quantity", 20)
            .where_eq("line_item_id", 5)
            .build(&schema)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE line_items SET quantity = ? WHERE line_item_id = ?"
        );
        assert_eq!(stmt.params, vec![Value::Integer(20), Value::Integer(5)]);
    }

    #[test]
    fn test_update_guards() {
        let schema = test_schema();

        let pk_touch = UpdateBuilder::new("line_items")
            .set("line_item_id", 1)
            .where_eq("quantity", 1)
            .build(&schema);
        assert!(matches!(pk_touch, Err(AccessError::QueryBuild { .. })));

        let unfiltered = UpdateBuilder::new("line_items")
            .set("quantity", 1)
            .build(&schema);
        assert!(matches!(unfiltered, Err(AccessError::QueryBuild { .. })));
    }

    #[test]
    fn test_delete() {
        let schema = test_schema();
        let stmt = DeleteBuilder::new("line_items")
            .where_eq("line_item_id", 42)
            .build(&schema)
            .unwrap();

        assert_eq!(stmt.sql, "DELETE FROM line_items WHERE line_item_id = ?");
        assert_eq!(stmt.params, vec![Value::Integer(42)]);
    }

    #[test]
    fn test_delete_requires_filter() {
        let schema = test_schema();
        let unfiltered = DeleteBuilder::new("line_items").build(&schema);
        assert!(matches!(unfiltered, Err(AccessError::QueryBuild { .. })));
    }
}
