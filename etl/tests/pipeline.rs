mod fixtures;

use common::Error;
use common::config::LoadStrategy;
use etl::models::{Gender, SourceCourier};
use etl::report::RowRejection;
use etl::source::MemorySource;
use etl::warehouse::MemoryWarehouse;
use etl::{EtlOptions, run_and_close};

use fixtures::{dec, options, source};

const FACTS_STEP: &str = "Load Dates and Order Items";

#[tokio::test]
async fn full_run_loads_the_star_schema() {
    let source = source();
    let warehouse = MemoryWarehouse::new();

    let summary = run_and_close(&source, &warehouse, &options(LoadStrategy::BulkCopy, 2))
        .await
        .unwrap();
    assert!(summary.is_success(), "{:?}", summary);
    assert_eq!(summary.steps.len(), 4);

    let riders = warehouse.riders().await;
    assert_eq!(riders.len(), 2);
    assert_eq!(riders[0].courier_name.as_deref(), Some("ACME"));
    assert_eq!(riders[1].courier_name, None);
    assert_eq!(riders[0].vehicle_type.as_deref(), Some("bicycle"));

    let users = warehouse.users().await;
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].first_name, "Ada");
    assert_eq!(users[0].phone_number.as_deref(), Some("555-123-4567"));
    assert_eq!(users[0].zipcode.as_deref(), Some("123456789"));
    assert_eq!(users[0].gender, Some(Gender::Female));

    let dates = warehouse.dates().await;
    assert_eq!(
        dates.iter().map(|d| d.date_id).collect::<Vec<_>>(),
        vec![20250601, 20250602]
    );

    let facts = warehouse.facts().await;
    assert_eq!(facts.len(), 3);
    assert_eq!(facts[0].order_item_id, 100_000_003);
    assert_eq!(facts[0].total_revenue, dec("59.97"));
    assert_eq!(facts[0].notes.as_deref(), Some("leave at door"));
    assert_eq!(facts[1].total_revenue, dec("10.00"));
    assert_eq!(facts[2].order_item_id, 101_000_003);
    assert_eq!(facts[2].delivery_date_id, 20250602);
    assert_eq!(facts[2].delivery_rider_id, None);

    let report = summary.report(FACTS_STEP).unwrap();
    assert_eq!(report.extracted, 6);
    assert_eq!(report.written, 3);
    assert_eq!(report.extracted - report.excluded.total(), report.written);
    assert_eq!(report.excluded.count(RowRejection::UnparseableDate), 1);
    assert_eq!(report.excluded.count(RowRejection::UnknownProduct), 1);
    assert_eq!(report.excluded.count(RowRejection::MissingField("quantity")), 1);
    assert_eq!(report.dates_created, 2);
    assert!(report.warnings.is_empty());

    assert_eq!(warehouse.indexes().await.len(), 3);
    assert!(source.is_closed());
    assert!(warehouse.is_closed().await);
}

#[tokio::test]
async fn reruns_are_idempotent_under_both_strategies() {
    for strategy in [LoadStrategy::BulkCopy, LoadStrategy::ChunkedUpsert] {
        let source = source();
        let warehouse = MemoryWarehouse::new();
        let options = options(strategy, 2);

        run_and_close(&source, &warehouse, &options).await.unwrap();
        let first = (
            warehouse.riders().await,
            warehouse.products().await,
            warehouse.users().await,
            warehouse.dates().await,
            warehouse.facts().await,
        );

        let summary = run_and_close(&source, &warehouse, &options).await.unwrap();
        assert!(summary.is_success());
        let second = (
            warehouse.riders().await,
            warehouse.products().await,
            warehouse.users().await,
            warehouse.dates().await,
            warehouse.facts().await,
        );

        assert_eq!(first, second, "{}", strategy);
        assert_eq!(summary.report(FACTS_STEP).unwrap().dates_created, 0);
    }
}

#[tokio::test]
async fn both_strategies_produce_the_same_warehouse() {
    let bulk = MemoryWarehouse::new();
    run_and_close(&source(), &bulk, &options(LoadStrategy::BulkCopy, 4))
        .await
        .unwrap();

    let upsert = MemoryWarehouse::new();
    run_and_close(&source(), &upsert, &options(LoadStrategy::ChunkedUpsert, 1))
        .await
        .unwrap();

    assert_eq!(bulk.riders().await, upsert.riders().await);
    assert_eq!(bulk.users().await, upsert.users().await);
    assert_eq!(bulk.dates().await, upsert.dates().await);
    assert_eq!(bulk.facts().await, upsert.facts().await);
}

#[tokio::test]
async fn end_to_end_scenario() {
    let source = MemorySource::new()
        .with_couriers(vec![SourceCourier {
            id: Some(1),
            name: Some("Acme".into()),
        }])
        .with_riders(vec![fixtures::rider(7, Some(1))])
        .with_products(vec![fixtures::product(3, "10.00")])
        .with_users(vec![fixtures::user(5)])
        .with_order_lines(vec![fixtures::line(100, 5, Some(7), "2025-06-01", 3, Some(4))]);
    let warehouse = MemoryWarehouse::new();

    let summary = run_and_close(&source, &warehouse, &EtlOptions::default())
        .await
        .unwrap();
    assert!(summary.is_success(), "{:?}", summary);

    let riders = warehouse.riders().await;
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0].gender, Some(Gender::Male));
    assert_eq!(riders[0].gender.map(|g| g.as_str()), Some("male"));

    let dates = warehouse.dates().await;
    assert_eq!(dates.len(), 1);
    assert_eq!(dates[0].date_id, 20250601);

    let facts = warehouse.facts().await;
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].quantity, 4);
    assert_eq!(facts[0].total_revenue, dec("40.00"));
    assert_eq!(facts[0].delivery_date_id, 20250601);
    assert_eq!(facts[0].delivery_rider_id, Some(7));
}

#[tokio::test]
async fn only_bulk_copy_drops_rows_gone_from_the_source() {
    let shrunk = || {
        let lines = fixtures::order_lines()
            .into_iter()
            .filter(|l| l.product_id != Some(4))
            .collect();
        source().with_order_lines(lines)
    };

    for (strategy, kept) in [
        (LoadStrategy::ChunkedUpsert, true),
        (LoadStrategy::BulkCopy, false),
    ] {
        let warehouse = MemoryWarehouse::new();
        run_and_close(&source(), &warehouse, &options(strategy, 2))
            .await
            .unwrap();
        assert_eq!(warehouse.facts().await.len(), 3);

        run_and_close(&shrunk(), &warehouse, &options(strategy, 2))
            .await
            .unwrap();
        let ids: Vec<i64> = warehouse
            .facts()
            .await
            .iter()
            .map(|f| f.order_item_id)
            .collect();
        assert_eq!(ids.contains(&100_000_004), kept, "{:?}", strategy);
        assert_eq!(ids.len(), if kept { 3 } else { 2 });
    }
}

#[tokio::test]
async fn repeated_order_lines_collapse_to_the_last() {
    let mut lines = fixtures::order_lines();
    lines.push(fixtures::line(100, 5, Some(7), "2025-06-01", 3, Some(5)));
    let source = source().with_order_lines(lines);
    let warehouse = MemoryWarehouse::new();

    // batch size 1 puts the duplicate pair in different chunks
    let summary = run_and_close(&source, &warehouse, &options(LoadStrategy::BulkCopy, 1))
        .await
        .unwrap();
    assert!(summary.is_success());

    let report = summary.report(FACTS_STEP).unwrap();
    assert_eq!(report.duplicates_merged, 1);
    assert_eq!(report.written, 3);

    let facts = warehouse.facts().await;
    assert_eq!(facts.len(), 3);
    assert_eq!(facts[0].quantity, 5);
    assert_eq!(facts[0].total_revenue, dec("99.95"));
}

#[tokio::test]
async fn unreachable_source_is_fatal_and_closes_both_stores() {
    let source = fixtures::source().unreachable();
    let warehouse = MemoryWarehouse::new();

    let err = run_and_close(&source, &warehouse, &EtlOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connectivity(_)));
    assert!(err.is_fatal());
    assert!(source.is_closed());
    assert!(warehouse.is_closed().await);
    assert!(warehouse.products().await.is_empty());
}

#[tokio::test]
async fn unreachable_warehouse_is_fatal() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.set_unreachable(true).await;

    let err = run_and_close(&source, &warehouse, &EtlOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(source.is_closed());
}

#[tokio::test]
async fn source_schema_gap_stops_the_run_before_any_step() {
    let source = source().without_column("OrderItems", "quantity");
    let warehouse = MemoryWarehouse::new();

    let err = run_and_close(&source, &warehouse, &EtlOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)));
    assert!(err.to_string().contains("OrderItems.quantity"));
    assert!(warehouse.riders().await.is_empty());
}

#[tokio::test]
async fn empty_source_is_a_successful_run() {
    let source = MemorySource::new();
    let warehouse = MemoryWarehouse::new();

    let summary = run_and_close(&source, &warehouse, &EtlOptions::default())
        .await
        .unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.report(FACTS_STEP).unwrap().written, 0);
    assert!(warehouse.facts().await.is_empty());
}
