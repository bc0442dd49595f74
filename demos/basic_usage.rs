//! Basic usage example
//!
//! This example demonstrates the everyday flow:
//! - Opening a pooled database and provisioning the schema
//! - Inserting records inside a transaction
//! - Querying through the builder and hydrating records
//! - Rendering results as tab-delimited text
//!
//! Run with: cargo run --example basic_usage

use rust_data_access::catalog::commerce_schema;
use rust_data_access::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Rust Data Access - Basic Usage Example ===\n");

    // Open a pooled in-memory database
    println!("1. Opening database...");
    let schema = commerce_schema()?;
    let db = SqlitePool::open_in_memory("basic_usage").await?;
    println!("   ✓ Pool open\n");

    println!("2. Provisioning schema...");
    db.provision(&schema).await?;
    println!("   ✓ {} tables created\n", schema.tables().len());

    // All writes go through a transaction with an explicit outcome
    println!("3. Seeding customers...");
    let executor = TransactionExecutor::new(&schema, &db);
    let report = executor
        .run(TxOptions::default(), |tx| {
            Box::pin(async move {
                let seed = [
                    ("Alfreds Futterkiste", "Maria Anders", "Berlin", "Germany"),
                    ("Ana Trujillo Emparedados", "Ana Trujillo", "México D.F.", "Mexico"),
                    ("Around the Horn", "Thomas Hardy", "London", "UK"),
                    ("Berglunds snabbköp", "Christina Berglund", "Luleå", "Sweden"),
                ];
                for (name, contact, city, country) in seed {
                    let mut customer = Record::new("customers")
                        .with("customer_name", name)
                        .with("contact_name", contact)
                        .with("city", city)
                        .with("country", country);
                    tx.insert(&mut customer).await?;
                }
                Ok(())
            })
        })
        .await?;
    println!(
        "   ✓ Committed {} rows, keys {:?}\n",
        report.rows_affected, report.inserted_ids
    );

    // Hydrate the whole table through the mapper
    println!("4. Querying all customers...");
    let mut mapper = RecordMapper::new(&schema, &db);
    let customers = mapper
        .select(&SelectBuilder::new("customers").order_by_asc("customer_name"))
        .await?;
    println!("{}", format_records(&customers));

    println!("5. Customers from Germany...");
    let germans = mapper
        .select(&SelectBuilder::new("customers").where_eq("country", "Germany"))
        .await?;
    for customer in &germans {
        let name = customer
            .get("customer_name")
            .and_then(Value::as_str)
            .unwrap_or(NO_VALUE);
        println!("   - {name}");
    }
    println!();

    // find consults the identity cache; the second call is a cache hit
    println!("6. Fetching one customer by key...");
    if let Some(first) = mapper.find("customers", 1).await? {
        println!("{}", format_record(&first));
    }
    let _ = mapper.find("customers", 1).await?;
    println!("   records cached: {}\n", mapper.cached());

    // Raw rows with an explicit projection
    println!("7. Projected raw query...");
    let statement = SelectBuilder::new("customers")
        .columns(&["customer_name", "city"])
        .order_by_asc("customer_id")
        .limit(3)
        .build(&schema)?;
    let rows = db.fetch(&statement).await?;
    println!("{}", format_rows(&["customer_name", "city"], &rows));

    println!("8. Closing pool...");
    db.close();
    println!("   ✓ Closed");

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
