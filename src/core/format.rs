//! Result formatter
//!
//! Renders rows and records as tab-delimited text: a header line, a
//! dashed separator, then one line per row. A field that is absent, SQL
//! NULL, or empty text prints as [`NO_VALUE`] so downstream consumers
//! never see an empty cell.

use crate::core::mapper::Record;
use crate::core::value::{Row, Value};

/// Placeholder printed for absent, NULL, or empty-text fields
pub const NO_VALUE: &str = "no_value";

/// Render raw rows under an explicit column ordering. Rows missing one
/// of the named columns print [`NO_VALUE`] in that cell.
pub fn format_rows<'r>(columns: &[&str], rows: impl IntoIterator<Item = &'r Row>) -> String {
    let header = columns.join("\t");
    let mut out = String::with_capacity(2 * (header.len() + 1));
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.len()));
    out.push('\n');

    for row in rows {
        let mut first = true;
        for column in columns {
            if !first {
                out.push('\t');
            }
            first = false;
            match row.get(column) {
                Some(value) => push_field(&mut out, value),
                None => out.push_str(NO_VALUE),
            }
        }
        out.push('\n');
    }
    out
}

/// Render hydrated records. The column ordering is taken from the first
/// record, which hydration guarantees to be the declared schema order.
/// An empty slice renders as an empty string.
pub fn format_records(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let columns: Vec<&str> = first.columns().iter().map(String::as_str).collect();
    format_rows(&columns, records.iter().map(Record::row))
}

/// Render a single record as a one-row table
pub fn format_record(record: &Record) -> String {
    format_records(std::slice::from_ref(record))
}

fn push_field(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str(NO_VALUE),
        Value::Text(text) if text.is_empty() => out.push_str(NO_VALUE),
        Value::Text(text) => out.push_str(text),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Real(r) => out.push_str(&r.to_string()),
        Value::Blob(bytes) => out.push_str(&format!("<{} bytes>", bytes.len())),
    }
}
