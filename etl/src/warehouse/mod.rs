pub mod columnar;
pub mod ddl;
pub mod memory;
pub mod postgres;

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::Result;
use common::config::LoadStrategy;
use rust_decimal::Decimal;

use crate::models::{DimDate, DimProduct, DimRider, DimUser, FactOrderItem};

pub use memory::MemoryWarehouse;
pub use postgres::PgWarehouse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetTable {
    Riders,
    Products,
    Users,
    Dates,
    Facts,
}

impl TargetTable {
    pub const ALL: [TargetTable; 5] = [
        TargetTable::Riders,
        TargetTable::Products,
        TargetTable::Users,
        TargetTable::Dates,
        TargetTable::Facts,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            TargetTable::Riders => "dim_riders",
            TargetTable::Products => "dim_products",
            TargetTable::Users => "dim_users",
            TargetTable::Dates => "dim_date",
            TargetTable::Facts => "fact_order_items",
        }
    }

    /// Dimensions referenced by the fact table; truncating one cascades to facts.
    pub fn is_referenced_by_facts(&self) -> bool {
        !matches!(self, TargetTable::Facts)
    }
}

impl fmt::Display for TargetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// One transformed chunk on its way into the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Riders(Vec<DimRider>),
    Products(Vec<DimProduct>),
    Users(Vec<DimUser>),
    /// Always written insert-if-absent, whatever the session's strategy.
    Dates(Vec<DimDate>),
    Facts(Vec<FactOrderItem>),
}

impl Batch {
    pub fn table(&self) -> TargetTable {
        match self {
            Batch::Riders(_) => TargetTable::Riders,
            Batch::Products(_) => TargetTable::Products,
            Batch::Users(_) => TargetTable::Users,
            Batch::Dates(_) => TargetTable::Dates,
            Batch::Facts(_) => TargetTable::Facts,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batch::Riders(rows) => rows.len(),
            Batch::Products(rows) => rows.len(),
            Batch::Users(rows) => rows.len(),
            Batch::Dates(rows) => rows.len(),
            Batch::Facts(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A write session against one target table.
///
/// Under `BulkCopy` the session owns a single transaction that starts with a
/// truncate and ends at `commit`; dropping the session without committing
/// rolls everything back. Under `ChunkedUpsert` every `write` commits on its own.
#[async_trait]
pub trait TableLoad: Send {
    fn table(&self) -> TargetTable;

    fn strategy(&self) -> LoadStrategy;

    /// Writes one chunk and returns the number of rows it stored.
    async fn write(&mut self, batch: Batch) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Write side of the star schema.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn ensure_schema(&self) -> Result<()>;

    /// Every calendar date already in the date dimension.
    async fn date_keys(&self) -> Result<HashMap<NaiveDate, i32>>;

    /// Current unit price per product, read once per run.
    async fn product_prices(&self) -> Result<HashMap<i32, Decimal>>;

    /// Rider keys present in the rider dimension.
    async fn rider_ids(&self) -> Result<HashSet<i32>>;

    /// User keys present in the user dimension.
    async fn user_ids(&self) -> Result<HashSet<i32>>;

    /// Inserts dates that are not present yet and returns how many were new.
    async fn insert_dates(&self, dates: &[DimDate]) -> Result<u64>;

    async fn begin_load(
        &self,
        table: TargetTable,
        strategy: LoadStrategy,
    ) -> Result<Box<dyn TableLoad>>;

    async fn drop_fact_indexes(&self) -> Result<()>;

    /// Re-runnable: existing indexes are left alone.
    async fn create_fact_indexes(&self) -> Result<()>;

    async fn row_counts(&self) -> Result<Vec<(TargetTable, i64)>>;

    async fn close(&self);
}
