use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::{DatabaseConfig, LoadStrategy};
use common::{Error, Result};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};

use crate::models::{DimDate, DimProduct, DimRider, DimUser, FactOrderItem};
use crate::utils::pool;
use crate::warehouse::columnar::{self, WarehouseRecord, quoted_columns};
use crate::warehouse::ddl;
use crate::warehouse::{Batch, TableLoad, TargetTable, Warehouse};

// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::from_pool(pool::connect("warehouse", config).await?))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn keys_of<R: WarehouseRecord>(&self) -> Result<HashSet<i32>> {
        let sql = format!(r#"SELECT "{}" FROM {}"#, R::KEY, R::TABLE);
        let keys: Vec<i32> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(keys.into_iter().collect())
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Connectivity(format!("warehouse database unreachable: {}", e)))?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in ddl::CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        for (_, statement) in ddl::FACT_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Warehouse schema in place");
        Ok(())
    }

    async fn date_keys(&self) -> Result<HashMap<NaiveDate, i32>> {
        let rows: Vec<(i32, NaiveDate)> =
            sqlx::query_as(r#"SELECT "Date_ID", "Date" FROM dim_date"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(key, date)| (date, key)).collect())
    }

    async fn product_prices(&self) -> Result<HashMap<i32, Decimal>> {
        let rows: Vec<(i32, Decimal)> =
            sqlx::query_as(r#"SELECT "Product_ID", "Price" FROM dim_products"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn rider_ids(&self) -> Result<HashSet<i32>> {
        self.keys_of::<DimRider>().await
    }

    async fn user_ids(&self) -> Result<HashSet<i32>> {
        self.keys_of::<DimUser>().await
    }

    async fn insert_dates(&self, dates: &[DimDate]) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        upsert_rows(&mut conn, dates).await
    }

    async fn begin_load(
        &self,
        table: TargetTable,
        strategy: LoadStrategy,
    ) -> Result<Box<dyn TableLoad>> {
        let load = PgTableLoad::begin(self.pool.clone(), table, strategy).await?;
        Ok(Box::new(load))
    }

    async fn drop_fact_indexes(&self) -> Result<()> {
        for (name, _) in ddl::FACT_INDEXES {
            sqlx::query(&ddl::drop_index(name)).execute(&self.pool).await?;
        }
        info!(count = ddl::FACT_INDEXES.len(), "Dropped fact indexes");
        Ok(())
    }

    async fn create_fact_indexes(&self) -> Result<()> {
        for (name, statement) in ddl::FACT_INDEXES {
            sqlx::query(statement).execute(&self.pool).await?;
            debug!(index = name, "Fact index present");
        }
        info!(count = ddl::FACT_INDEXES.len(), "Fact indexes rebuilt");
        Ok(())
    }

    async fn row_counts(&self) -> Result<Vec<(TargetTable, i64)>> {
        let mut counts = Vec::with_capacity(TargetTable::ALL.len());
        for table in TargetTable::ALL {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await?;
            counts.push((table, count));
        }
        Ok(counts)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Postgres side of a [`TableLoad`] session.
pub struct PgTableLoad {
    pool: PgPool,
    table: TargetTable,
    strategy: LoadStrategy,
    // Some for the whole bulk-copy session, None under chunked upsert.
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTableLoad {
    async fn begin(pool: PgPool, table: TargetTable, strategy: LoadStrategy) -> Result<Self> {
        let tx = match strategy {
            LoadStrategy::BulkCopy => {
                let mut tx = pool.begin().await?;
                if let Some(statement) = truncate_statement(table) {
                    sqlx::query(&statement).execute(&mut *tx).await?;
                    debug!(table = %table, "Truncated inside load transaction");
                }
                Some(tx)
            }
            LoadStrategy::ChunkedUpsert => None,
        };

        Ok(Self {
            pool,
            table,
            strategy,
            tx,
        })
    }
}

#[async_trait]
impl TableLoad for PgTableLoad {
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
        let target = batch.table();

        let written = match self.tx.as_mut() {
            Some(tx) => write_batch(tx, batch, true).await,
            None => upsert_committed(&self.pool, batch).await,
        };

        written.map_err(|e| match e {
            Error::Load { .. } => e,
            other => Error::load(target.table_name(), other),
        })
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgTableLoad { tx, table, .. } = *self;
        if let Some(tx) = tx {
            tx.commit().await?;
            debug!(table = %table, "Load transaction committed");
        }
        Ok(())
    }
}

/// Dates are never truncated: they accumulate across runs.
fn truncate_statement(table: TargetTable) -> Option<String> {
    match table {
        TargetTable::Dates => None,
        TargetTable::Facts => Some(format!("TRUNCATE TABLE {}", table)),
        _ => Some(format!("TRUNCATE TABLE {} CASCADE", table)),
    }
}

async fn upsert_committed(pool: &PgPool, batch: Batch) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let written = write_batch(&mut tx, batch, false).await?;
    tx.commit().await?;
    Ok(written)
}

async fn write_batch(conn: &mut PgConnection, batch: Batch, copy: bool) -> Result<u64> {
    match batch {
        Batch::Dates(rows) => upsert_rows(conn, &rows).await,
        Batch::Riders(rows) => store(conn, &rows, copy).await,
        Batch::Products(rows) => store(conn, &rows, copy).await,
        Batch::Users(rows) => store(conn, &rows, copy).await,
        Batch::Facts(rows) => store(conn, &rows, copy).await,
    }
}

async fn store<R: PgRecord>(conn: &mut PgConnection, rows: &[R], copy: bool) -> Result<u64> {
    if copy {
        copy_rows(conn, rows).await
    } else {
        upsert_rows(conn, rows).await
    }
}

/// Streams rows through `COPY ... FROM STDIN` as Arrow-encoded CSV.
async fn copy_rows<R: WarehouseRecord>(conn: &mut PgConnection, rows: &[R]) -> Result<u64> {
    let batch = R::to_record_batch(rows)?;
    let csv = columnar::to_csv(&batch)?;

    let statement = format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        R::TABLE,
        quoted_columns(R::COLUMNS)
    );

    let mut copy = conn.copy_in_raw(&statement).await?;
    let sent = copy.send(csv).await.map(|_| ());
    if let Err(e) = sent {
        copy.abort(e.to_string()).await?;
        return Err(e.into());
    }
    Ok(copy.finish().await?)
}

async fn upsert_rows<R: PgRecord>(conn: &mut PgConnection, rows: &[R]) -> Result<u64> {
    let rows_per_statement = (MAX_BIND_PARAMS / R::COLUMNS.len()).max(1);
    let mut written = 0;

    for chunk in rows.chunks(rows_per_statement) {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            R::TABLE,
            quoted_columns(R::COLUMNS)
        ));
        qb.push_values(chunk, |mut row, record| record.bind_row(&mut row));
        qb.push(conflict_clause::<R>());

        written += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(written)
}

fn conflict_clause<R: WarehouseRecord>() -> String {
    if R::UPDATE_COLUMNS.is_empty() {
        return " ON CONFLICT DO NOTHING".to_string();
    }

    let assignments = R::UPDATE_COLUMNS
        .iter()
        .map(|c| format!("\"{0}\" = EXCLUDED.\"{0}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" ON CONFLICT (\"{}\") DO UPDATE SET {}", R::KEY, assignments)
}

/// Binds one row in `WarehouseRecord::COLUMNS` order.
trait PgRecord: WarehouseRecord {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>);
}

impl PgRecord for DimRider {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.rider_id)
            .push_bind(self.first_name.clone())
            .push_bind(self.last_name.clone())
            .push_bind(self.vehicle_type.clone())
            .push_bind(self.age)
            .push_bind(self.gender.map(|g| g.as_str()))
            .push_bind(self.courier_name.clone());
    }
}

impl PgRecord for DimProduct {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.product_id)
            .push_bind(self.product_code.clone())
            .push_bind(self.name.clone())
            .push_bind(self.category.clone())
            .push_bind(self.description.clone())
            .push_bind(self.price);
    }
}

impl PgRecord for DimUser {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.user_id)
            .push_bind(self.username.clone())
            .push_bind(self.first_name.clone())
            .push_bind(self.last_name.clone())
            .push_bind(self.address_1.clone())
            .push_bind(self.address_2.clone())
            .push_bind(self.city.clone())
            .push_bind(self.country.clone())
            .push_bind(self.zipcode.clone())
            .push_bind(self.phone_number.clone())
            .push_bind(self.birth_date)
            .push_bind(self.gender.map(|g| g.as_str()));
    }
}

impl PgRecord for DimDate {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.date_id)
            .push_bind(self.date)
            .push_bind(self.year)
            .push_bind(self.month)
            .push_bind(self.day)
            .push_bind(self.quarter)
            .push_bind(self.day_of_week)
            .push_bind(self.week_of_year);
    }
}

impl PgRecord for FactOrderItem {
    fn bind_row(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.order_item_id)
            .push_bind(self.product_id)
            .push_bind(self.quantity)
            .push_bind(self.notes.clone())
            .push_bind(self.delivery_date_id)
            .push_bind(self.delivery_rider_id)
            .push_bind(self.user_id)
            .push_bind(self.order_num.clone())
            .push_bind(self.total_revenue);
    }
}
