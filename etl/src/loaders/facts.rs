//! Order-line fact loader.
//!
//! Streams the order/item join in source order, resolves the delivery date
//! and the run's price snapshot for every line, and writes facts keyed by a
//! deterministic `(order, product)` identity so reruns land on the same rows.
//! Lines pointing at users or riders missing from the warehouse are settled
//! here, per line, so the fact table's foreign keys never fail a load.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use async_trait::async_trait;
use common::Result;
use common::config::LoadStrategy;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::loaders::dimension::{log_exclusions, required_text};
use crate::loaders::{EtlStep, StepContext};
use crate::models::{DimDate, FactOrderItem, SourceOrderLine};
use crate::report::{Exclusions, LoadReport, RowRejection, RowResult};
use crate::transform::{DateResolver, clean_text, parse_date};
use crate::warehouse::ddl::width;
use crate::warehouse::{Batch, TargetTable, Warehouse};

/// Multiplier of the order id in the fact identity. Product ids must stay below it.
pub const ORDER_ITEM_KEY_FACTOR: i64 = 1_000_000;

/// `order_id * ORDER_ITEM_KEY_FACTOR + product_id`, or `None` when the product
/// id cannot fit.
pub fn order_item_id(order_id: i32, product_id: i32) -> Option<i64> {
    let product_id = i64::from(product_id);
    if !(0..ORDER_ITEM_KEY_FACTOR).contains(&product_id) {
        return None;
    }
    Some(i64::from(order_id) * ORDER_ITEM_KEY_FACTOR + product_id)
}

pub fn line_revenue(quantity: i32, unit_price: Decimal) -> Decimal {
    (Decimal::from(quantity) * unit_price).round_dp(2)
}

/// Dimension state the fact step reads once, before its first chunk.
#[derive(Debug, Default, Clone)]
pub struct FactLookups {
    pub prices: HashMap<i32, Decimal>,
    pub riders: HashSet<i32>,
    pub users: HashSet<i32>,
}

impl FactLookups {
    pub async fn snapshot(warehouse: &dyn Warehouse) -> Result<Self> {
        Ok(Self {
            prices: warehouse.product_prices().await?,
            riders: warehouse.rider_ids().await?,
            users: warehouse.user_ids().await?,
        })
    }
}

/// A transformed line and what it added to the run's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
    pub fact: FactOrderItem,
    pub new_date: Option<DimDate>,
    /// The source named a rider the warehouse does not have; the fact keeps a null rider.
    pub rider_unresolved: bool,
}

/// Turns one joined line into a fact. The delivery date is resolved last, so a
/// rejected line never adds a date to the dimension.
pub fn transform_line(
    line: SourceOrderLine,
    lookups: &FactLookups,
    dates: &mut DateResolver,
) -> RowResult<ResolvedLine> {
    let order_id = line.order_id.ok_or(RowRejection::MissingField("order_id"))?;
    let product_id = line
        .product_id
        .ok_or(RowRejection::MissingField("product_id"))?;
    let order_item_id =
        order_item_id(order_id, product_id).ok_or(RowRejection::ProductIdOutOfRange)?;
    let order_num = required_text(line.order_number.as_deref(), "order_number", width::ORDER_NUM)?;
    let user_id = line.user_id.ok_or(RowRejection::MissingField("user_id"))?;
    let quantity = line
        .quantity
        .ok_or(RowRejection::MissingField("quantity"))?;
    let unit_price = *lookups
        .prices
        .get(&product_id)
        .ok_or(RowRejection::UnknownProduct)?;
    if !lookups.users.contains(&user_id) {
        return Err(RowRejection::UnknownUser);
    }
    let delivery_date = line
        .delivery_date
        .as_deref()
        .and_then(parse_date)
        .ok_or(RowRejection::UnparseableDate)?;

    let (delivery_rider_id, rider_unresolved) = match line.rider_id {
        Some(rider) if !lookups.riders.contains(&rider) => (None, true),
        rider => (rider, false),
    };
    let (delivery_date_id, new_date) = dates.resolve(delivery_date);

    let fact = FactOrderItem {
        order_item_id,
        product_id,
        quantity,
        notes: clean_text(line.notes.as_deref()),
        delivery_date_id,
        delivery_rider_id,
        user_id,
        order_num,
        total_revenue: line_revenue(quantity, unit_price),
    };
    Ok(ResolvedLine {
        fact,
        new_date,
        rider_unresolved,
    })
}

/// Collapses repeated `(order, product)` lines in an ordered stream, keeping
/// the last one. The newest line is held back until the next one shows it is
/// not repeated, so a duplicate split across two chunks is still caught.
#[derive(Debug, Default)]
pub struct LineDeduper {
    pending: Option<FactOrderItem>,
    merged: u64,
}

impl LineDeduper {
    pub fn push_chunk(&mut self, facts: Vec<FactOrderItem>) -> Vec<FactOrderItem> {
        let mut ready = Vec::with_capacity(facts.len());

        for fact in facts {
            match self.pending.take() {
                Some(previous) if previous.order_item_id == fact.order_item_id => {
                    self.merged += 1;
                }
                Some(previous) => ready.push(previous),
                None => {}
            }
            self.pending = Some(fact);
        }

        ready
    }

    pub fn finish(&mut self) -> Option<FactOrderItem> {
        self.pending.take()
    }

    pub fn merged(&self) -> u64 {
        self.merged
    }
}

/// Loads dates and order-line facts.
pub struct FactsStep;

#[async_trait]
impl EtlStep for FactsStep {
    fn name(&self) -> &'static str {
        "Load Dates and Order Items"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<LoadReport> {
        let started = Instant::now();

        let lookups = FactLookups::snapshot(ctx.warehouse).await?;
        let mut dates = DateResolver::new(ctx.warehouse.date_keys().await?);
        info!(
            products = lookups.prices.len(),
            riders = lookups.riders.len(),
            users = lookups.users.len(),
            known_dates = dates.len(),
            "Dimension lookups snapshotted"
        );

        let suspend_indexes =
            ctx.options.strategy == LoadStrategy::BulkCopy && ctx.options.rebuild_indexes;
        let loaded = suspend_and_load(ctx, suspend_indexes, &lookups, &mut dates).await;

        // Always attempted, whatever happened to the load.
        let rebuilt = ctx.warehouse.create_fact_indexes().await;

        let mut report = match loaded {
            Ok(report) => report,
            Err(e) => {
                if let Err(index_err) = rebuilt {
                    warn!(error = %index_err, "Fact indexes missing after failed load");
                }
                return Err(e);
            }
        };

        if let Err(e) = rebuilt {
            warn!(error = %e, "Fact indexes could not be rebuilt; queries will be slow until they are");
            report
                .warnings
                .push(format!("fact indexes not rebuilt: {}", e));
        }

        report.elapsed = started.elapsed();
        log_exclusions(&report);
        info!(
            written = report.written,
            dates_created = report.dates_created,
            duplicates_merged = report.duplicates_merged,
            riders_unresolved = report.riders_unresolved,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Fact load finished"
        );
        Ok(report)
    }
}

async fn suspend_and_load(
    ctx: &StepContext<'_>,
    suspend_indexes: bool,
    lookups: &FactLookups,
    dates: &mut DateResolver,
) -> Result<LoadReport> {
    if suspend_indexes {
        ctx.warehouse.drop_fact_indexes().await?;
    }
    load_facts(ctx, lookups, dates).await
}

async fn load_facts(
    ctx: &StepContext<'_>,
    lookups: &FactLookups,
    dates: &mut DateResolver,
) -> Result<LoadReport> {
    let strategy = ctx.options.strategy;
    let mut report = LoadReport::new(TargetTable::Facts, strategy);
    let mut load = ctx.warehouse.begin_load(TargetTable::Facts, strategy).await?;
    let mut lines = ctx.source.order_lines(ctx.options.batch_size);
    let mut deduper = LineDeduper::default();

    while let Some(chunk) = lines.try_next().await? {
        report.extracted += chunk.len() as u64;
        report.chunks += 1;

        let mut facts = Vec::with_capacity(chunk.len());
        let mut new_dates = Vec::new();
        let mut excluded = Exclusions::default();
        for line in chunk {
            match transform_line(line, lookups, dates) {
                Ok(resolved) => {
                    if resolved.rider_unresolved {
                        report.riders_unresolved += 1;
                    }
                    facts.push(resolved.fact);
                    new_dates.extend(resolved.new_date);
                }
                Err(rejection) => excluded.record(rejection),
            }
        }

        // dates first: the facts reference them
        if !new_dates.is_empty() {
            report.dates_created += load.write(Batch::Dates(new_dates)).await?;
        }
        let written = load
            .write(Batch::Facts(deduper.push_chunk(facts)))
            .await?;
        report.written += written;

        if excluded.is_empty() {
            debug!(chunk = report.chunks, written, "Fact chunk loaded");
        } else {
            warn!(
                chunk = report.chunks,
                written,
                excluded = excluded.total(),
                reasons = %excluded,
                "Fact chunk loaded with exclusions"
            );
        }
        report.excluded.merge(&excluded);
    }

    if let Some(last) = deduper.finish() {
        report.written += load.write(Batch::Facts(vec![last])).await?;
    }
    report.duplicates_merged = deduper.merged();

    load.commit().await?;
    Ok(report)
}
