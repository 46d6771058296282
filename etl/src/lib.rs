pub mod loaders;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod transform;
pub mod utils;
pub mod warehouse;

use common::Result;
use common::config::{EtlConfig, LoadStrategy, Settings};
use tracing::{error, info, warn};

use loaders::StepContext;
use orchestrator::{Orchestrator, RunSummary};
use source::{PgSource, SourceStore};
use warehouse::{PgWarehouse, Warehouse};

/// Run-wide knobs shared by every step.
#[derive(Debug, Clone, PartialEq)]
pub struct EtlOptions {
    pub batch_size: usize,
    pub strategy: LoadStrategy,
    /// Drop the fact indexes before a bulk fact load and rebuild them after.
    pub rebuild_indexes: bool,
    pub halt_on_failure: bool,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self::from(&EtlConfig::default())
    }
}

impl From<&EtlConfig> for EtlOptions {
    fn from(config: &EtlConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            strategy: config.strategy,
            rebuild_indexes: config.rebuild_indexes,
            halt_on_failure: config.halt_on_failure,
        }
    }
}

/// Connects to both stores and runs the standard pipeline.
///
/// Connectivity and schema problems are returned as errors before any step
/// runs; step failures are reported in the returned summary.
pub async fn run_etl_pipeline(settings: &Settings, options: EtlOptions) -> Result<RunSummary> {
    let source = PgSource::connect(&settings.source).await?;
    let warehouse = match PgWarehouse::connect(&settings.warehouse).await {
        Ok(warehouse) => warehouse,
        Err(e) => {
            source.close().await;
            return Err(e);
        }
    };

    run_and_close(&source, &warehouse, &options).await
}

/// Runs the pipeline and closes both stores, whatever the outcome.
pub async fn run_and_close(
    source: &dyn SourceStore,
    warehouse: &dyn Warehouse,
    options: &EtlOptions,
) -> Result<RunSummary> {
    let result = run_with(source, warehouse, options).await;

    source.close().await;
    warehouse.close().await;
    info!("Connections closed");

    result
}

/// Preflight checks, then every step of the standard pipeline.
pub async fn run_with(
    source: &dyn SourceStore,
    warehouse: &dyn Warehouse,
    options: &EtlOptions,
) -> Result<RunSummary> {
    source.ping().await?;
    warehouse.ping().await?;
    source.verify_schema().await?;
    warehouse.ensure_schema().await?;

    info!(
        batch_size = options.batch_size,
        strategy = %options.strategy,
        rebuild_indexes = options.rebuild_indexes,
        halt_on_failure = options.halt_on_failure,
        "Starting ETL run"
    );

    let ctx = StepContext {
        source,
        warehouse,
        options,
    };
    let summary = Orchestrator::standard().run(&ctx).await;
    summary.log();

    if summary.is_success() {
        log_row_counts(warehouse).await;
    }
    Ok(summary)
}

async fn log_row_counts(warehouse: &dyn Warehouse) {
    match warehouse.row_counts().await {
        Ok(counts) => {
            for (table, rows) in counts {
                info!(table = %table, rows, "Warehouse row count");
            }
        }
        Err(e) if e.is_fatal() => error!(error = %e, "Row counts unavailable"),
        Err(e) => warn!(error = %e, "Row counts unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let config = EtlConfig {
            batch_size: 0,
            strategy: LoadStrategy::ChunkedUpsert,
            rebuild_indexes: false,
            halt_on_failure: true,
        };
        let options = EtlOptions::from(&config);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.strategy, LoadStrategy::ChunkedUpsert);
        assert!(!options.rebuild_indexes);
        assert!(options.halt_on_failure);

        assert_eq!(EtlOptions::default().strategy, LoadStrategy::BulkCopy);
    }
}
