//! Criterion benchmarks for the pure paths: statement building, record
//! hydration, and result formatting. No IO runs here.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rust_data_access::catalog::commerce_schema;
use rust_data_access::core::format::{format_records, format_rows};
use rust_data_access::core::mapper::RecordMapper;
use rust_data_access::core::query_builder::{InsertBuilder, SelectBuilder, UpdateBuilder};
use rust_data_access::core::value::{Row, Value};

fn product_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::with_capacity(6);
            row.push("product_id", Value::Integer(i as i64 + 1));
            row.push("product_name", Value::Text(format!("Product {i}")));
            row.push("supplier_id", Value::Integer(1));
            row.push("category_id", Value::Null);
            row.push("unit", Value::Text("10 boxes".to_string()));
            row.push("price", Value::Real(18.0 + i as f64));
            row
        })
        .collect()
}

fn bench_statement_building(c: &mut Criterion) {
    let schema = commerce_schema().unwrap();
    let mut group = c.benchmark_group("statement_building");
    group.throughput(Throughput::Elements(1));

    group.bench_function("select_all", |b| {
        b.iter(|| {
            let stmt = SelectBuilder::new(black_box("products"))
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("select_filtered_ordered", |b| {
        b.iter(|| {
            let stmt = SelectBuilder::new("products")
                .columns(&["product_name", "price"])
                .where_gt("price", black_box(10.0))
                .where_ne("product_name", "Chai")
                .order_by_desc("price")
                .limit(20)
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("select_join_one_hop", |b| {
        b.iter(|| {
            let stmt = SelectBuilder::new("products")
                .columns(&["product_name", "suppliers.supplier_name"])
                .join("suppliers")
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("select_join_through_junction", |b| {
        b.iter(|| {
            let stmt = SelectBuilder::new("orders")
                .columns(&["order_id", "products.product_name"])
                .join("products")
                .where_eq("order_id", black_box(3))
                .distinct()
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("insert", |b| {
        b.iter(|| {
            let stmt = InsertBuilder::new("line_items")
                .value("order_id", black_box(1))
                .value("product_id", 2)
                .value("quantity", 12)
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.bench_function("update", |b| {
        b.iter(|| {
            let stmt = UpdateBuilder::new("line_items")
                .set("quantity", black_box(20))
                .where_eq("line_item_id", 5)
                .build(&schema)
                .unwrap();
            black_box(stmt)
        });
    });

    group.finish();
}

// a backend stub so the pure hydration path can run without a pool
struct NoDatabase;

#[async_trait::async_trait]
impl rust_data_access::core::database::Database for NoDatabase {
    async fn fetch(
        &self,
        _statement: &rust_data_access::core::query_builder::Statement,
    ) -> rust_data_access::core::error::Result<rust_data_access::core::value::RowSet> {
        unreachable!("benchmarks never fetch")
    }

    async fn begin(
        &self,
        _lock: rust_data_access::core::database::LockMode,
    ) -> rust_data_access::core::error::Result<Box<dyn rust_data_access::core::database::Work>>
    {
        unreachable!("benchmarks never begin")
    }
}

fn bench_hydration(c: &mut Criterion) {
    let schema = commerce_schema().unwrap();
    let db = NoDatabase;
    let mapper = RecordMapper::new(&schema, &db);

    let mut group = c.benchmark_group("hydration");
    for size in [1usize, 64, 512] {
        let rows = product_rows(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("hydrate_all", size), &rows, |b, rows| {
            b.iter(|| {
                let records = mapper.hydrate_all("products", black_box(rows)).unwrap();
                black_box(records)
            });
        });
    }
    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let schema = commerce_schema().unwrap();
    let db = NoDatabase;
    let mapper = RecordMapper::new(&schema, &db);

    let mut group = c.benchmark_group("formatting");
    for size in [1usize, 64, 512] {
        let rows = product_rows(size);
        let records = mapper.hydrate_all("products", &rows).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("format_rows", size), &rows, |b, rows| {
            let columns = ["product_id", "product_name", "price"];
            b.iter(|| black_box(format_rows(&columns, black_box(rows))));
        });

        group.bench_with_input(
            BenchmarkId::new("format_records", size),
            &records,
            |b, records| {
                b.iter(|| black_box(format_records(black_box(records))));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_statement_building,
    bench_hydration,
    bench_formatting
);
criterion_main!(benches);
