//! Transaction outcomes example
//!
//! Shows every way a transaction can end:
//! - Commit, with the report of assigned keys and written rows
//! - Rollback when the work function fails partway through
//! - Conflict when writing back a record whose row vanished
//! - Rollback when the work exceeds its wall-clock budget
//! - Read-modify-write under an up-front write lock
//!
//! Run with: cargo run --example transactions

use std::time::Duration;

use rust_data_access::catalog::commerce_schema;
use rust_data_access::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Rust Data Access - Transactions Example ===\n");

    let schema = commerce_schema()?;
    let db = SqlitePool::open_in_memory("transactions_demo").await?;
    db.provision(&schema).await?;
    let executor = TransactionExecutor::new(&schema, &db);

    println!("1. Seeding a customer, an employee, and two products...");
    let report = executor
        .run(TxOptions::default(), |tx| {
            Box::pin(async move {
                let mut customer =
                    Record::new("customers").with("customer_name", "Around the Horn");
                let customer_id = tx.insert(&mut customer).await?;

                let mut employee = Record::new("employees")
                    .with("last_name", "Davolio")
                    .with("first_name", "Nancy");
                let employee_id = tx.insert(&mut employee).await?;

                let mut chai = Record::new("products")
                    .with("product_name", "Chai")
                    .with("unit", "10 boxes x 20 bags")
                    .with("price", 18.0);
                let chai_id = tx.insert(&mut chai).await?;

                let mut chang = Record::new("products")
                    .with("product_name", "Chang")
                    .with("unit", "24 - 12 oz bottles")
                    .with("price", 19.0);
                let chang_id = tx.insert(&mut chang).await?;

                Ok((customer_id, employee_id, chai_id, chang_id))
            })
        })
        .await?;
    let (customer_id, employee_id, chai_id, chang_id) = report.value;
    println!("   ✓ Committed {} rows\n", report.rows_affected);

    println!("2. Placing an order with two line items...");
    let report = executor
        .run(TxOptions::default(), move |tx| {
            Box::pin(async move {
                let mut order = Record::new("orders")
                    .with("customer_id", customer_id)
                    .with("employee_id", employee_id)
                    .with("order_date", "1996-07-04");
                let order_id = tx.insert(&mut order).await?;

                for (product_id, quantity) in [(chai_id, 12), (chang_id, 10)] {
                    let mut line = Record::new("line_items")
                        .with("order_id", order_id)
                        .with("product_id", product_id)
                        .with("quantity", quantity);
                    tx.insert(&mut line).await?;
                }
                Ok(order_id)
            })
        })
        .await?;
    println!(
        "   ✓ Order {} committed, line items {:?}\n",
        report.value,
        &report.inserted_ids[1..]
    );

    println!("3. A failing transaction leaves nothing behind...");
    let orders = SelectBuilder::new("orders").build(&schema)?;
    let before = db.fetch(&orders).await?.len();
    let outcome = executor
        .run(TxOptions::default(), move |tx| {
            Box::pin(async move {
                let mut order = Record::new("orders")
                    .with("customer_id", customer_id)
                    .with("employee_id", employee_id);
                let order_id = tx.insert(&mut order).await?;

                // dangling product reference; the insert above rolls back too
                let mut line = Record::new("line_items")
                    .with("order_id", order_id)
                    .with("product_id", 9999)
                    .with("quantity", 1);
                tx.insert(&mut line).await?;
                Ok(())
            })
        })
        .await;
    match outcome {
        Err(AccessError::Constraint { .. }) => {
            println!("   ✓ Rolled back on constraint violation");
        }
        Err(err) => println!("   unexpected error: {err}"),
        Ok(_) => println!("   unexpectedly committed"),
    }
    let after = db.fetch(&orders).await?.len();
    println!("   orders before: {before}, after: {after}\n");

    println!("4. Writing back a vanished row is a conflict...");
    let shipper_id = executor
        .run(TxOptions::default(), |tx| {
            Box::pin(async move {
                let mut shipper = Record::new("shippers").with("shipper_name", "Speedy Express");
                tx.insert(&mut shipper).await
            })
        })
        .await?
        .value;

    let mut mapper = RecordMapper::new(&schema, &db);
    let stale = mapper
        .find("shippers", shipper_id)
        .await?
        .ok_or_else(|| AccessError::execution("seeded shipper missing"))?;

    executor
        .run(TxOptions::default(), move |tx| {
            Box::pin(async move { tx.delete("shippers", shipper_id).await })
        })
        .await?;

    let mut updated = stale;
    updated.set("phone", "(503) 555-9831");
    let outcome = executor
        .run(TxOptions::default(), move |tx| {
            Box::pin(async move { tx.update(&updated).await })
        })
        .await;
    match outcome {
        Err(AccessError::Conflict { key, .. }) => {
            println!("   ✓ Conflict on stale row (key {key:?})\n");
        }
        Err(err) => println!("   unexpected error: {err}\n"),
        Ok(_) => println!("   unexpectedly committed\n"),
    }

    println!("5. A slow transaction is rolled back on timeout...");
    let outcome = executor
        .run(
            TxOptions::default().with_timeout(Duration::from_millis(50)),
            |tx| {
                Box::pin(async move {
                    let mut category =
                        Record::new("categories").with("category_name", "Beverages");
                    tx.insert(&mut category).await?;
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
            },
        )
        .await;
    match outcome {
        Err(AccessError::Timeout { elapsed_ms }) => {
            println!("   ✓ Timed out after {elapsed_ms}ms");
        }
        Err(err) => println!("   unexpected error: {err}"),
        Ok(_) => println!("   unexpectedly committed"),
    }
    let categories = db.fetch(&SelectBuilder::new("categories").build(&schema)?).await?;
    println!("   categories committed: {}\n", categories.len());

    println!("6. Read-modify-write under an immediate lock...");
    let report = executor
        .run(TxOptions::immediate(), move |tx| {
            Box::pin(async move {
                let product = tx
                    .find("products", chai_id)
                    .await?
                    .ok_or_else(|| AccessError::execution("seeded product missing"))?;
                let price = product.get("price").and_then(Value::as_real).unwrap_or(0.0);

                let mut repriced = product;
                repriced.set("price", price * 1.1);
                tx.update(&repriced).await
            })
        })
        .await?;
    println!("   ✓ {} row repriced\n", report.value);

    db.close();
    println!("=== Example completed successfully! ===");
    Ok(())
}
