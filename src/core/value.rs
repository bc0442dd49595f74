//! Column values and result rows
//!
//! Values mirror the storage classes of the backing store (NULL, INTEGER,
//! REAL, TEXT, BLOB). Rows keep their column order: a projection comes back
//! in exactly the order it was requested, and the formatter renders it in
//! that order.

use serde::{Deserialize, Serialize};

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit integer
    Integer(i64),
    /// 64-bit floating point
    Real(f64),
    /// UTF-8 text
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    /// Get the value as an i64
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Real(v) => Some(*v as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice (zero-copy for Text values)
    ///
    /// Returns a reference without cloning for Text values. For other
    /// types, use `as_string()` which performs conversion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a string (with conversion)
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::Real(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the storage-class name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A result row: column names paired with values, in query order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Row::default()
    }

    /// Create an empty row with capacity for `n` columns
    pub fn with_capacity(n: usize) -> Self {
        Row {
            columns: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
        }
    }

    /// Append a column to the row
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Replace a column's value, appending the column if absent
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(i) => self.values[i] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Get a value by column name (first match wins for duplicate names)
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Get a value by position
    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names in query order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in query order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (column, value) pairs in query order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Multiple rows returned from a query
pub type RowSet = Vec<Row>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let val = Value::Integer(42);
        assert_eq!(val.as_integer(), Some(42));
        assert_eq!(val.as_real(), Some(42.0));
        assert_eq!(val.as_string(), "42");

        let val = Value::Text("123".to_string());
        assert_eq!(val.as_integer(), Some(123));
        assert_eq!(val.as_str(), Some("123"));

        let val = Value::Real(2.5);
        assert_eq!(val.as_integer(), Some(2));
        assert_eq!(val.as_real(), Some(2.5));
    }

    #[test]
    fn test_value_from_types() {
        let val: Value = 42.into();
        assert_eq!(val, Value::Integer(42));

        let val: Value = "hello".into();
        assert_eq!(val, Value::Text("hello".to_string()));

        let val: Value = 2.5f64.into();
        assert_eq!(val, Value::Real(2.5));

        let val: Value = Some(42i64).into();
        assert_eq!(val, Value::Integer(42));

        let val: Value = Option::<i64>::None.into();
        assert_eq!(val, Value::Null);
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Integer(42).type_name(), "integer");
        assert_eq!(Value::Real(1.5).type_name(), "real");
        assert_eq!(Value::Text("test".to_string()).type_name(), "text");
        assert_eq!(Value::Blob(vec![1, 2]).type_name(), "blob");
    }

    #[test]
    fn test_row_preserves_order() {
        let mut row = Row::with_capacity(3);
        row.push("product_name", Value::Text("Chai".to_string()));
        row.push("price", Value::Real(18.0));
        row.push("supplier_id", Value::Null);

        assert_eq!(
            row.columns(),
            &["product_name", "price", "supplier_id"]
        );
        assert_eq!(row.get("price"), Some(&Value::Real(18.0)));
        assert_eq!(row.get_at(2), Some(&Value::Null));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_row_iter_pairs() {
        let mut row = Row::new();
        row.push("quantity", Value::Integer(10));
        row.push("order_id", Value::Integer(2));

        let pairs: Vec<(&str, &Value)> = row.iter().collect();
        assert_eq!(pairs[0], ("quantity", &Value::Integer(10)));
        assert_eq!(pairs[1], ("order_id", &Value::Integer(2)));
    }
}
