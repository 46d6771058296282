use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use common::config::DatabaseConfig;
use common::{Error, Result};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::models::{SourceCourier, SourceOrderLine, SourceProduct, SourceRider, SourceUser};
use crate::source::schema::missing_columns;
use crate::source::{ChunkStream, SourceStore};
use crate::utils::pool;

// Columns are cast so that narrower or wider source types decode into the
// same row structs.
const COURIERS_SQL: &str = r#"
    SELECT "id"::int4 AS id, "name"::text AS name
    FROM "Couriers"
"#;

const RIDERS_SQL: &str = r#"
    SELECT "id"::int4 AS id,
           "firstName"::text AS first_name,
           "lastName"::text AS last_name,
           "vehicleType"::text AS vehicle_type,
           "age"::int4 AS age,
           "gender"::text AS gender,
           "courierId"::int4 AS courier_id
    FROM "Riders"
    ORDER BY "id"
"#;

const PRODUCTS_SQL: &str = r#"
    SELECT "id"::int4 AS id,
           "productCode"::text AS product_code,
           "name"::text AS name,
           "category"::text AS category,
           "description"::text AS description,
           "price"::numeric AS price
    FROM "Products"
    ORDER BY "id"
"#;

const USERS_SQL: &str = r#"
    SELECT "id"::int4 AS id,
           "username"::text AS username,
           "firstName"::text AS first_name,
           "lastName"::text AS last_name,
           "address1"::text AS address_1,
           "address2"::text AS address_2,
           "city"::text AS city,
           "country"::text AS country,
           "zipCode"::text AS zip_code,
           "phoneNumber"::text AS phone_number,
           "birthDate"::text AS birth_date,
           "gender"::text AS gender
    FROM "Users"
    ORDER BY "id"
"#;

const ORDER_LINES_SQL: &str = r#"
    SELECT o."id"::int4 AS order_id,
           o."orderNumber"::text AS order_number,
           o."userId"::int4 AS user_id,
           o."deliveryRiderId"::int4 AS rider_id,
           o."deliveryDate"::text AS delivery_date,
           oi."ProductId"::int4 AS product_id,
           oi."quantity"::int4 AS quantity,
           oi."notes"::text AS notes
    FROM "Orders" o
    JOIN "OrderItems" oi ON oi."OrderId" = o."id"
    ORDER BY o."id", oi."ProductId"
"#;

const COLUMNS_SQL: &str = r#"
    SELECT table_name::text, column_name::text
    FROM information_schema.columns
    WHERE table_schema = current_schema()
"#;

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::from_pool(pool::connect("source", config).await?))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Groups a row cursor into chunks of at most `batch_size` rows.
fn chunked<'a, T: Send + 'a>(
    rows: BoxStream<'a, sqlx::Result<T>>,
    batch_size: usize,
) -> ChunkStream<'a, T> {
    rows.map_err(Error::from)
        .try_chunks(batch_size.max(1))
        .map_err(|e| e.1)
        .boxed()
}

#[async_trait]
impl SourceStore for PgSource {
    async fn ping(&self) -> Result<()> {
        let now: String = sqlx::query_scalar("SELECT NOW()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Connectivity(format!("source database unreachable: {}", e)))?;
        info!(server_time = %now, "Source database reachable");
        Ok(())
    }

    async fn verify_schema(&self) -> Result<()> {
        let rows: Vec<(String, String)> = sqlx::query_as(COLUMNS_SQL).fetch_all(&self.pool).await?;

        let mut present: HashMap<String, HashSet<String>> = HashMap::new();
        for (table, column) in rows {
            present.entry(table).or_default().insert(column);
        }

        let missing = missing_columns(&present);
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch(format!(
                "source is missing {}",
                missing.join(", ")
            )));
        }

        debug!(tables = present.len(), "Source schema matches contract");
        Ok(())
    }

    async fn couriers(&self) -> Result<Vec<SourceCourier>> {
        Ok(sqlx::query_as(COURIERS_SQL).fetch_all(&self.pool).await?)
    }

    fn riders(&self, batch_size: usize) -> ChunkStream<'_, SourceRider> {
        chunked(sqlx::query_as(RIDERS_SQL).fetch(&self.pool), batch_size)
    }

    fn products(&self, batch_size: usize) -> ChunkStream<'_, SourceProduct> {
        chunked(sqlx::query_as(PRODUCTS_SQL).fetch(&self.pool), batch_size)
    }

    fn users(&self, batch_size: usize) -> ChunkStream<'_, SourceUser> {
        chunked(sqlx::query_as(USERS_SQL).fetch(&self.pool), batch_size)
    }

    fn order_lines(&self, batch_size: usize) -> ChunkStream<'_, SourceOrderLine> {
        chunked(sqlx::query_as(ORDER_LINES_SQL).fetch(&self.pool), batch_size)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
