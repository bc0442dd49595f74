//! Built-in commerce catalog
//!
//! The schema the crate ships for demos and tests: customers, employees,
//! and shippers placing and moving orders, suppliers and categories
//! behind products, and a line_items junction giving orders and products
//! their many-to-many view. Every relationship is declared on the
//! foreign-key side only; the inverse collections are derived.

use crate::core::error::Result;
use crate::core::mapper::Record;
use crate::core::schema::{Column, Schema, SchemaBuilder, Table};

/// Build the commerce schema
pub fn commerce_schema() -> Result<Schema> {
    SchemaBuilder::new()
        .table(
            Table::new("customers")
                .column(Column::primary_key("customer_id"))
                .column(Column::text("customer_name").not_null())
                .column(Column::text("contact_name"))
                .column(Column::text("address"))
                .column(Column::text("city"))
                .column(Column::text("postal_code"))
                .column(Column::text("country")),
        )
        .table(
            Table::new("employees")
                .column(Column::primary_key("employee_id"))
                .column(Column::text("last_name").not_null())
                .column(Column::text("first_name").not_null())
                .column(Column::text("birth_date"))
                .column(Column::blob("photo"))
                .column(Column::text("notes")),
        )
        .table(
            Table::new("shippers")
                .column(Column::primary_key("shipper_id"))
                .column(Column::text("shipper_name").not_null())
                .column(Column::text("phone")),
        )
        .table(
            Table::new("suppliers")
                .column(Column::primary_key("supplier_id"))
                .column(Column::text("supplier_name").not_null())
                .column(Column::text("contact_name"))
                .column(Column::text("address"))
                .column(Column::text("city"))
                .column(Column::text("postal_code"))
                .column(Column::text("country"))
                .column(Column::text("phone")),
        )
        .table(
            Table::new("categories")
                .column(Column::primary_key("category_id"))
                .column(Column::text("category_name").not_null())
                .column(Column::text("description")),
        )
        .table(
            Table::new("products")
                .column(Column::primary_key("product_id"))
                .column(Column::text("product_name").not_null())
                .column(Column::integer("supplier_id"))
                .column(Column::integer("category_id"))
                .column(Column::text("unit"))
                .column(Column::real("price"))
                .belongs_to("suppliers", "supplier_id")
                .belongs_to("categories", "category_id"),
        )
        .table(
            Table::new("orders")
                .column(Column::primary_key("order_id"))
                .column(Column::integer("customer_id").not_null())
                .column(Column::integer("employee_id").not_null())
                .column(Column::text("order_date"))
                .column(Column::integer("shipper_id"))
                .belongs_to("customers", "customer_id")
                .belongs_to("employees", "employee_id")
                .belongs_to("shippers", "shipper_id"),
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
}

/// Derived full name of an employee record, computed on read and never
/// stored. Returns `None` unless both name parts are present as text.
pub fn employee_full_name(record: &Record) -> Option<String> {
    let first = record.get("first_name")?.as_str()?;
    let last = record.get("last_name")?.as_str()?;
    Some(format!("{first} {last}"))
}
