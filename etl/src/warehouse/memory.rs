//! In-process warehouse with the same transactional behaviour as the Postgres
//! one: bulk-copy sessions stage a truncated copy and swap it in on commit,
//! chunked upserts land immediately, and fact rows are checked against their
//! dimensions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::LoadStrategy;
use common::{Error, Result};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::models::{DimDate, DimProduct, DimRider, DimUser, FactOrderItem};
use crate::warehouse::columnar::WarehouseRecord;
use crate::warehouse::ddl;
use crate::warehouse::{Batch, TableLoad, TargetTable, Warehouse};

#[derive(Debug, Default, Clone)]
struct Tables {
    riders: BTreeMap<i64, DimRider>,
    products: BTreeMap<i64, DimProduct>,
    users: BTreeMap<i64, DimUser>,
    dates: BTreeMap<i64, DimDate>,
    facts: BTreeMap<i64, FactOrderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WriteMode {
    /// Plain insert; an existing key is a constraint violation.
    Copy,
    Upsert,
    InsertIfAbsent,
}

impl Tables {
    fn truncate(&mut self, table: TargetTable) {
        match table {
            TargetTable::Riders => self.riders.clear(),
            TargetTable::Products => self.products.clear(),
            TargetTable::Users => self.users.clear(),
            TargetTable::Dates => return,
            TargetTable::Facts => {}
        }
        self.facts.clear();
    }

    fn apply(&mut self, batch: Batch, copy: bool) -> Result<u64> {
        let mode = if copy { WriteMode::Copy } else { WriteMode::Upsert };
        match batch {
            Batch::Riders(rows) => put(&mut self.riders, rows, mode, replace),
            Batch::Products(rows) => put(&mut self.products, rows, mode, replace),
            Batch::Users(rows) => put(&mut self.users, rows, mode, replace),
            Batch::Dates(rows) => put(&mut self.dates, rows, WriteMode::InsertIfAbsent, replace),
            Batch::Facts(rows) => {
                for row in &rows {
                    self.check_references(row)?;
                }
                put(&mut self.facts, rows, mode, update_measures)
            }
        }
    }

    fn check_references(&self, fact: &FactOrderItem) -> Result<()> {
        let violation = |what: &str, key: i64| {
            Error::load(
                TargetTable::Facts.table_name(),
                format!("foreign key violation: {} {} not present", what, key),
            )
        };

        if !self.products.contains_key(&(fact.product_id as i64)) {
            return Err(violation("product", fact.product_id as i64));
        }
        if !self.users.contains_key(&(fact.user_id as i64)) {
            return Err(violation("user", fact.user_id as i64));
        }
        if !self.dates.contains_key(&(fact.delivery_date_id as i64)) {
            return Err(violation("date", fact.delivery_date_id as i64));
        }
        if let Some(rider) = fact.delivery_rider_id {
            if !self.riders.contains_key(&(rider as i64)) {
                return Err(violation("rider", rider as i64));
            }
        }
        Ok(())
    }
}

fn replace<R>(existing: &mut R, incoming: R) {
    *existing = incoming;
}

fn update_measures(existing: &mut FactOrderItem, incoming: FactOrderItem) {
    existing.quantity = incoming.quantity;
    existing.notes = incoming.notes;
    existing.total_revenue = incoming.total_revenue;
}

fn put<R: WarehouseRecord>(
    table: &mut BTreeMap<i64, R>,
    rows: Vec<R>,
    mode: WriteMode,
    merge: fn(&mut R, R),
) -> Result<u64> {
    let mut written = 0;
    for row in rows {
        let key = row.key();
        match (table.get_mut(&key), mode) {
            (None, _) => {
                table.insert(key, row);
                written += 1;
            }
            (Some(_), WriteMode::Copy) => {
                return Err(Error::load(
                    R::TABLE.table_name(),
                    format!("duplicate key value {}={}", R::KEY, key),
                ));
            }
            (Some(existing), WriteMode::Upsert) => {
                merge(existing, row);
                written += 1;
            }
            (Some(_), WriteMode::InsertIfAbsent) => {}
        }
    }
    Ok(written)
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    indexes: BTreeSet<&'static str>,
    writes: HashMap<TargetTable, u64>,
    fail_after: HashMap<TargetTable, u64>,
    fail_index_creation: bool,
    unreachable: bool,
    closed: bool,
}

impl State {
    /// Counts a write against `table` and trips an armed failure once.
    fn record_write(&mut self, table: TargetTable) -> Result<()> {
        let done = self.writes.get(&table).copied().unwrap_or(0);
        if self.fail_after.get(&table) == Some(&done) {
            self.fail_after.remove(&table);
            return Err(Error::load(table.table_name(), "injected write failure"));
        }
        self.writes.insert(table, done + 1);
        Ok(())
    }
}

/// Shared handle; clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<Mutex<State>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next write to `table` after `successful` more writes fails.
    pub async fn fail_writes_after(&self, table: TargetTable, successful: u64) {
        let mut state = self.state.lock().await;
        let done = state.writes.get(&table).copied().unwrap_or(0);
        state.fail_after.insert(table, done + successful);
    }

    pub async fn fail_index_creation(&self, fail: bool) {
        self.state.lock().await.fail_index_creation = fail;
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn riders(&self) -> Vec<DimRider> {
        self.state.lock().await.tables.riders.values().cloned().collect()
    }

    pub async fn products(&self) -> Vec<DimProduct> {
        self.state.lock().await.tables.products.values().cloned().collect()
    }

    pub async fn users(&self) -> Vec<DimUser> {
        self.state.lock().await.tables.users.values().cloned().collect()
    }

    pub async fn dates(&self) -> Vec<DimDate> {
        self.state.lock().await.tables.dates.values().cloned().collect()
    }

    pub async fn facts(&self) -> Vec<FactOrderItem> {
        self.state.lock().await.tables.facts.values().cloned().collect()
    }

    pub async fn indexes(&self) -> Vec<&'static str> {
        self.state.lock().await.indexes.iter().copied().collect()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn ping(&self) -> Result<()> {
        if self.state.lock().await.unreachable {
            return Err(Error::Connectivity(
                "warehouse database unreachable: connection refused".into(),
            ));
        }
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.indexes.extend(ddl::FACT_INDEXES.iter().map(|(name, _)| *name));
        Ok(())
    }

    async fn date_keys(&self) -> Result<HashMap<NaiveDate, i32>> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .dates
            .values()
            .map(|d| (d.date, d.date_id))
            .collect())
    }

    async fn product_prices(&self) -> Result<HashMap<i32, Decimal>> {
        let state = self.state.lock().await;
        Ok(state
            .tables
            .products
            .values()
            .map(|p| (p.product_id, p.price))
            .collect())
    }

    async fn rider_ids(&self) -> Result<HashSet<i32>> {
        let state = self.state.lock().await;
        Ok(state.tables.riders.values().map(|r| r.rider_id).collect())
    }

    async fn user_ids(&self) -> Result<HashSet<i32>> {
        let state = self.state.lock().await;
        Ok(state.tables.users.values().map(|u| u.user_id).collect())
    }

    async fn insert_dates(&self, dates: &[DimDate]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.tables.apply(Batch::Dates(dates.to_vec()), false)
    }

    async fn begin_load(
        &self,
        table: TargetTable,
        strategy: LoadStrategy,
    ) -> Result<Box<dyn TableLoad>> {
        let staged = match strategy {
            LoadStrategy::BulkCopy => {
                let mut tables = self.state.lock().await.tables.clone();
                tables.truncate(table);
                Some(tables)
            }
            LoadStrategy::ChunkedUpsert => None,
        };

        Ok(Box::new(MemoryTableLoad {
            state: Arc::clone(&self.state),
            table,
            strategy,
            staged,
        }))
    }

    async fn drop_fact_indexes(&self) -> Result<()> {
        self.state.lock().await.indexes.clear();
        Ok(())
    }

    async fn create_fact_indexes(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_index_creation {
            return Err(Error::Other("index build interrupted".into()));
        }
        state.indexes.extend(ddl::FACT_INDEXES.iter().map(|(name, _)| *name));
        Ok(())
    }

    async fn row_counts(&self) -> Result<Vec<(TargetTable, i64)>> {
        let state = self.state.lock().await;
        let tables = &state.tables;
        Ok(vec![
            (TargetTable::Riders, tables.riders.len() as i64),
            (TargetTable::Products, tables.products.len() as i64),
            (TargetTable::Users, tables.users.len() as i64),
            (TargetTable::Dates, tables.dates.len() as i64),
            (TargetTable::Facts, tables.facts.len() as i64),
        ])
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}

pub struct MemoryTableLoad {
    state: Arc<Mutex<State>>,
    table: TargetTable,
    strategy: LoadStrategy,
    staged: Option<Tables>,
}

#[async_trait]
impl TableLoad for MemoryTableLoad {
    fn table(&self) -> TargetTable {
        self.table
    }

    fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    async fn write(&mut self, batch: Batch) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.lock().await;
        state.record_write(batch.table())?;

        match self.staged.as_mut() {
            Some(staged) => staged.apply(batch, true),
            None => state.tables.apply(batch, false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTableLoad { state, staged, .. } = *self;
        if let Some(staged) = staged {
            state.lock().await.tables = staged;
        }
        Ok(())
    }
}
