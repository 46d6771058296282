//! Runs the load steps in dependency order and collects their outcomes.

use std::time::{Duration, Instant};

use common::Result;
use tracing::{error, info, warn};

use crate::loaders::{EtlStep, FactsStep, ProductsStep, RidersStep, StepContext, UsersStep};
use crate::report::LoadReport;

#[derive(Debug)]
pub struct StepResult {
    pub name: &'static str,
    pub outcome: Result<LoadReport>,
    pub elapsed: Duration,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Everything a run did, in execution order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub steps: Vec<StepResult>,
    /// Steps never started because an earlier one failed with `halt_on_failure` set.
    pub skipped: Vec<&'static str>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.steps.iter().all(StepResult::is_success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.is_success())
    }

    pub fn report(&self, name: &str) -> Option<&LoadReport> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.outcome.as_ref().ok())
    }

    pub fn log(&self) {
        for step in &self.steps {
            match &step.outcome {
                Ok(report) => info!(
                    step = step.name,
                    table = %report.table,
                    strategy = %report.strategy,
                    extracted = report.extracted,
                    written = report.written,
                    excluded = report.excluded.total(),
                    elapsed_ms = step.elapsed.as_millis() as u64,
                    "Step succeeded"
                ),
                Err(e) => error!(
                    step = step.name,
                    error = %e,
                    elapsed_ms = step.elapsed.as_millis() as u64,
                    "Step failed"
                ),
            }
        }
        for name in &self.skipped {
            warn!(step = name, "Step skipped");
        }

        let failed = self.failed().count();
        if self.is_success() {
            info!(
                steps = self.steps.len(),
                elapsed_ms = self.elapsed.as_millis() as u64,
                "ETL run completed"
            );
        } else {
            error!(
                succeeded = self.succeeded().count(),
                failed,
                skipped = self.skipped.len(),
                elapsed_ms = self.elapsed.as_millis() as u64,
                "ETL run completed with failures"
            );
        }
    }
}

pub struct Orchestrator {
    steps: Vec<Box<dyn EtlStep>>,
}

impl Orchestrator {
    pub fn new(steps: Vec<Box<dyn EtlStep>>) -> Self {
        Self { steps }
    }

    /// Dimensions before facts: facts read product prices and reference every dimension.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(RidersStep),
            Box::new(ProductsStep),
            Box::new(UsersStep),
            Box::new(FactsStep),
        ])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// A failed step is recorded and, unless `halt_on_failure` is set, the
    /// remaining steps still run.
    pub async fn run(&self, ctx: &StepContext<'_>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut halted = false;

        for step in &self.steps {
            if halted {
                summary.skipped.push(step.name());
                continue;
            }

            info!(step = step.name(), "Step started");
            let step_started = Instant::now();
            let outcome = step.run(ctx).await;
            let elapsed = step_started.elapsed();

            if let Err(e) = &outcome {
                error!(step = step.name(), error = %e, "Step failed");
                halted = ctx.options.halt_on_failure;
            }

            summary.steps.push(StepResult {
                name: step.name(),
                outcome,
                elapsed,
            });
        }

        summary.elapsed = started.elapsed();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EtlOptions;
    use crate::source::MemorySource;
    use crate::warehouse::{MemoryWarehouse, TargetTable};
    use async_trait::async_trait;
    use common::Error;
    use common::config::LoadStrategy;

    struct Stub {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl EtlStep for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _ctx: &StepContext<'_>) -> Result<LoadReport> {
            if self.fail {
                return Err(Error::load("dim_products", "boom"));
            }
            Ok(LoadReport::new(TargetTable::Riders, LoadStrategy::BulkCopy))
        }
    }

    fn stubs() -> Orchestrator {
        Orchestrator::new(vec![
            Box::new(Stub { name: "a", fail: false }),
            Box::new(Stub { name: "b", fail: true }),
            Box::new(Stub { name: "c", fail: false }),
        ])
    }

    #[test]
    fn standard_order_puts_facts_last() {
        assert_eq!(
            Orchestrator::standard().step_names(),
            vec![
                "Load Riders",
                "Load Products",
                "Load Users",
                "Load Dates and Order Items"
            ]
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_steps() {
        let source = MemorySource::new();
        let warehouse = MemoryWarehouse::new();
        let options = EtlOptions::default();
        let ctx = StepContext {
            source: &source,
            warehouse: &warehouse,
            options: &options,
        };

        let summary = stubs().run(&ctx).await;
        assert_eq!(summary.steps.len(), 3);
        assert_eq!(summary.failed().map(|s| s.name).collect::<Vec<_>>(), vec!["b"]);
        assert!(summary.report("c").is_some());
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn halt_on_failure_skips_the_rest() {
        let source = MemorySource::new();
        let warehouse = MemoryWarehouse::new();
        let options = EtlOptions {
            halt_on_failure: true,
            ..EtlOptions::default()
        };
        let ctx = StepContext {
            source: &source,
            warehouse: &warehouse,
            options: &options,
        };

        let summary = stubs().run(&ctx).await;
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.skipped, vec!["c"]);
    }
}
