mod fixtures;

use common::Error;
use common::config::LoadStrategy;
use etl::loaders::{FactsStep, StepContext};
use etl::orchestrator::Orchestrator;
use etl::report::RowRejection;
use etl::run_and_close;
use etl::warehouse::{MemoryWarehouse, TargetTable};

use fixtures::{line, options, order_lines, rider, source, user};

const FACTS_STEP: &str = "Load Dates and Order Items";

#[tokio::test]
async fn failed_bulk_copy_leaves_the_previous_facts() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    let options = options(LoadStrategy::BulkCopy, 1);
    run_and_close(&source, &warehouse, &options).await.unwrap();
    let before = warehouse.facts().await;
    assert_eq!(before.len(), 3);

    warehouse.fail_writes_after(TargetTable::Facts, 1).await;
    let ctx = StepContext {
        source: &source,
        warehouse: &warehouse,
        options: &options,
    };
    let summary = Orchestrator::new(vec![Box::new(FactsStep)]).run(&ctx).await;

    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0].outcome, Err(Error::Load { .. })));
    assert_eq!(warehouse.facts().await, before);
    // indexes come back even though the load failed
    assert_eq!(warehouse.indexes().await.len(), 3);
}

#[tokio::test]
async fn failed_chunked_upsert_keeps_committed_chunks() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.fail_writes_after(TargetTable::Facts, 1).await;

    let summary = run_and_close(&source, &warehouse, &options(LoadStrategy::ChunkedUpsert, 1))
        .await
        .unwrap();

    assert!(!summary.is_success());
    assert_eq!(
        summary.failed().map(|s| s.name).collect::<Vec<_>>(),
        vec![FACTS_STEP]
    );
    assert_eq!(summary.succeeded().count(), 3);

    let facts = warehouse.facts().await;
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].order_item_id, 100_000_003);
    assert!(!warehouse.dates().await.is_empty());
    assert!(warehouse.is_closed().await);
}

#[tokio::test]
async fn index_rebuild_failure_is_a_warning() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.fail_index_creation(true).await;

    let summary = run_and_close(&source, &warehouse, &options(LoadStrategy::BulkCopy, 2))
        .await
        .unwrap();

    assert!(summary.is_success());
    let report = summary.report(FACTS_STEP).unwrap();
    assert_eq!(report.written, 3);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("fact indexes not rebuilt"));
    assert!(warehouse.indexes().await.is_empty());
    assert_eq!(warehouse.facts().await.len(), 3);
}

#[tokio::test]
async fn indexes_stay_in_place_without_rebuild() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.fail_index_creation(true).await;
    let mut options = options(LoadStrategy::BulkCopy, 2);
    options.rebuild_indexes = false;

    let summary = run_and_close(&source, &warehouse, &options).await.unwrap();

    // nothing was dropped; the failed re-create is only reported
    assert_eq!(warehouse.indexes().await.len(), 3);
    assert_eq!(summary.report(FACTS_STEP).unwrap().warnings.len(), 1);
}

#[tokio::test]
async fn a_failed_dimension_does_not_stop_later_steps() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.fail_writes_after(TargetTable::Products, 0).await;

    let summary = run_and_close(&source, &warehouse, &options(LoadStrategy::BulkCopy, 10))
        .await
        .unwrap();

    assert_eq!(summary.steps.len(), 4);
    assert_eq!(
        summary.failed().map(|s| s.name).collect::<Vec<_>>(),
        vec!["Load Products"]
    );
    assert_eq!(warehouse.users().await.len(), 2);

    // no prices, so every priced line is excluded rather than failing
    let report = summary.report(FACTS_STEP).unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(report.excluded.total(), 6);
    assert_eq!(report.excluded.count(RowRejection::UnknownProduct), 5);
}

#[tokio::test]
async fn halt_on_failure_skips_the_remaining_steps() {
    let source = source();
    let warehouse = MemoryWarehouse::new();
    warehouse.fail_writes_after(TargetTable::Products, 0).await;
    let mut options = options(LoadStrategy::BulkCopy, 10);
    options.halt_on_failure = true;

    let summary = run_and_close(&source, &warehouse, &options).await.unwrap();

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.skipped, vec!["Load Users", FACTS_STEP]);
    assert!(warehouse.users().await.is_empty());
    assert!(source.is_closed());
}

#[tokio::test]
async fn lines_of_excluded_riders_and_users_do_not_fail_the_fact_load() {
    for strategy in [LoadStrategy::BulkCopy, LoadStrategy::ChunkedUpsert] {
        let mut nameless_rider = rider(8, None);
        nameless_rider.first_name = None;
        let mut nameless_user = user(6);
        nameless_user.first_name = None;
        let mut lines = order_lines();
        lines.push(line(105, 5, Some(8), "2025-06-04", 3, Some(2)));

        let source = source()
            .with_riders(vec![rider(7, Some(1)), nameless_rider])
            .with_users(vec![user(5), nameless_user])
            .with_order_lines(lines);
        let warehouse = MemoryWarehouse::new();

        let summary = run_and_close(&source, &warehouse, &options(strategy, 2))
            .await
            .unwrap();
        assert!(summary.is_success(), "{:?}: {:?}", strategy, summary);

        let riders = summary.report("Load Riders").unwrap();
        assert_eq!(riders.excluded.count(RowRejection::MissingField("first_name")), 1);

        let report = summary.report(FACTS_STEP).unwrap();
        assert_eq!(report.extracted, 7);
        assert_eq!(report.written, 3);
        assert_eq!(report.excluded.count(RowRejection::UnknownUser), 1);
        assert_eq!(report.riders_unresolved, 1);

        let facts = warehouse.facts().await;
        assert_eq!(
            facts.iter().map(|f| f.order_item_id).collect::<Vec<_>>(),
            vec![100_000_003, 100_000_004, 105_000_003]
        );
        assert_eq!(facts[2].delivery_rider_id, None);
        // the excluded user's line never added its date
        assert_eq!(
            warehouse.dates().await.iter().map(|d| d.date_id).collect::<Vec<_>>(),
            vec![20250601, 20250604]
        );
    }
}
