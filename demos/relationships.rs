//! Relationship traversal example
//!
//! Walks the declared relationship graph of the commerce schema:
//! - belongs_to: product to its supplier
//! - derived one-to-many: supplier to its products
//! - derived many-to-many: order to products across line_items
//! - the staleness rule: an already-fetched collection never updates
//!   itself; re-fetch to see committed changes
//!
//! Run with: cargo run --example relationships

use rust_data_access::catalog::{commerce_schema, employee_full_name};
use rust_data_access::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Rust Data Access - Relationships Example ===\n");

    let schema = commerce_schema()?;
    let db = SqlitePool::open_in_memory("relationships_demo").await?;
    db.provision(&schema).await?;
    let executor = TransactionExecutor::new(&schema, &db);

    println!("1. Seeding a small catalog...");
    let report = executor
        .run(TxOptions::default(), |tx| {
            Box::pin(async move {
                let mut supplier = Record::new("suppliers")
                    .with("supplier_name", "Exotic Liquid")
                    .with("city", "London")
                    .with("country", "UK");
                let supplier_id = tx.insert(&mut supplier).await?;

                let mut category =
                    Record::new("categories").with("category_name", "Beverages");
                let category_id = tx.insert(&mut category).await?;

                let mut product_ids = Vec::new();
                for (name, price) in [("Chai", 18.0), ("Chang", 19.0), ("Chartreuse verte", 18.0)]
                {
                    let mut product = Record::new("products")
                        .with("product_name", name)
                        .with("supplier_id", supplier_id)
                        .with("category_id", category_id)
                        .with("price", price);
                    product_ids.push(tx.insert(&mut product).await?);
                }

                let mut customer =
                    Record::new("customers").with("customer_name", "Berglunds snabbköp");
                let customer_id = tx.insert(&mut customer).await?;

                let mut employee = Record::new("employees")
                    .with("last_name", "Fuller")
                    .with("first_name", "Andrew");
                let employee_id = tx.insert(&mut employee).await?;

                let mut order = Record::new("orders")
                    .with("customer_id", customer_id)
                    .with("employee_id", employee_id)
                    .with("order_date", "1996-08-01");
                let order_id = tx.insert(&mut order).await?;

                for product_id in &product_ids[..2] {
                    let mut line = Record::new("line_items")
                        .with("order_id", order_id)
                        .with("product_id", *product_id)
                        .with("quantity", 5);
                    tx.insert(&mut line).await?;
                }

                Ok((supplier_id, product_ids, order_id, employee_id))
            })
        })
        .await?;
    let (supplier_id, product_ids, order_id, employee_id) = report.value;
    println!("   ✓ Committed {} rows\n", report.rows_affected);

    let mut mapper = RecordMapper::new(&schema, &db);

    println!("2. belongs_to: product -> supplier...");
    let chai = mapper
        .find("products", product_ids[0])
        .await?
        .ok_or_else(|| AccessError::execution("seeded product missing"))?;
    match mapper.related_one(&chai, "suppliers").await? {
        Some(supplier) => println!(
            "   Chai is supplied by {}",
            supplier
                .get("supplier_name")
                .and_then(Value::as_str)
                .unwrap_or(NO_VALUE)
        ),
        None => println!("   Chai has no supplier"),
    }
    println!();

    println!("3. one-to-many: supplier -> products...");
    let supplier = mapper
        .find("suppliers", supplier_id)
        .await?
        .ok_or_else(|| AccessError::execution("seeded supplier missing"))?;
    let products = mapper.related(&supplier, "products").await?;
    println!("{}", format_records(&products));

    println!("4. many-to-many: order -> products across line_items...");
    let order = mapper
        .find("orders", order_id)
        .await?
        .ok_or_else(|| AccessError::execution("seeded order missing"))?;
    let ordered = mapper.related(&order, "products").await?;
    for product in &ordered {
        let name = product
            .get("product_name")
            .and_then(Value::as_str)
            .unwrap_or(NO_VALUE);
        println!("   - order {order_id} contains {name}");
    }
    println!();

    println!("5. ...and back: product -> orders...");
    let orders_for_chai = mapper.related(&chai, "orders").await?;
    println!("   Chai appears in {} order(s)\n", orders_for_chai.len());

    println!("6. Collections are snapshots; re-fetch to see new rows...");
    let snapshot = mapper.related(&order, "products").await?;
    let third_product = product_ids[2];
    executor
        .run(TxOptions::default(), move |tx| {
            Box::pin(async move {
                let mut line = Record::new("line_items")
                    .with("order_id", order_id)
                    .with("product_id", third_product)
                    .with("quantity", 2);
                tx.insert(&mut line).await
            })
        })
        .await?;
    let refreshed = mapper.related(&order, "products").await?;
    println!(
        "   snapshot taken before the insert: {} products; fresh fetch: {} products\n",
        snapshot.len(),
        refreshed.len()
    );

    println!("7. Derived employee full name...");
    if let Some(employee) = mapper.find("employees", employee_id).await? {
        match employee_full_name(&employee) {
            Some(full_name) => println!("   order {order_id} was handled by {full_name}"),
            None => println!("   employee record is missing a name part"),
        }
    }

    db.close();
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
