use async_trait::async_trait;
use common::{Error, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{
    DiceRow, DrillDownRow, OrderRow, ProductRow, RiderRow, RollupRow, SalesSummaryRow, SliceRow,
    UserRow,
};
use crate::services::{
    Page, ProductFilter, ReportingStore, RiderFilter, SalesGrouping, UserFilter,
};

const CITY_SUGGESTIONS: i64 = 50;

const PRODUCT_COLUMNS: &str = r#"
    SELECT "Product_ID" AS product_id, "Product_Code" AS product_code, "Name" AS name,
           "Category" AS category, "Description" AS description, "Price" AS price
    FROM dim_products
"#;

const USER_COLUMNS: &str = r#"
    SELECT "Users_ID" AS user_id, "Username" AS username, "First_Name" AS first_name,
           "Last_Name" AS last_name, "Address_1" AS address_1, "Address_2" AS address_2,
           "City" AS city, "Country" AS country, "Zipcode" AS zipcode,
           "Phone_Number" AS phone_number, "Birth_Date" AS birth_date, "Gender" AS gender
    FROM dim_users
"#;

const RIDER_COLUMNS: &str = r#"
    SELECT "Rider_ID" AS rider_id, "First_Name" AS first_name, "Last_Name" AS last_name,
           "Vehicle_Type" AS vehicle_type, "Age" AS age, "Gender" AS gender,
           "Courier_Name" AS courier_name
    FROM dim_riders
"#;

const FACT_JOINS: &str = r#"
    FROM fact_order_items f
    JOIN dim_products p ON p."Product_ID" = f."Product_ID"
    JOIN dim_users u ON u."Users_ID" = f."User_ID"
    JOIN dim_date d ON d."Date_ID" = f."Delivery_Date_ID"
    LEFT JOIN dim_riders r ON r."Rider_ID" = f."Delivery_Rider_ID"
"#;

const ROLLUP_SQL: &str = r#"
    SELECT d."Year" AS year, d."Quarter" AS quarter, d."Month" AS month,
           SUM(f."Total_Revenue") AS revenue
    FROM fact_order_items f
    JOIN dim_date d ON d."Date_ID" = f."Delivery_Date_ID"
    GROUP BY ROLLUP (d."Year", d."Quarter", d."Month")
    ORDER BY 1 NULLS LAST, 2 NULLS LAST, 3 NULLS LAST
"#;

const DRILL_DOWN_SQL: &str = r#"
    SELECT COALESCE(r."Courier_Name", 'UNASSIGNED') AS courier_name,
           COALESCE(r."Vehicle_Type", 'unknown') AS vehicle_type,
           SUM(f."Total_Revenue") AS total_revenue
    FROM fact_order_items f
    LEFT JOIN dim_riders r ON r."Rider_ID" = f."Delivery_Rider_ID"
    GROUP BY 1, 2
    ORDER BY 1, 2
"#;

const SLICE_SQL: &str = r#"
    SELECT p."Category" AS category, SUM(f."Total_Revenue") AS total_revenue
    FROM fact_order_items f
    JOIN dim_products p ON p."Product_ID" = f."Product_ID"
    JOIN dim_users u ON u."Users_ID" = f."User_ID"
    WHERE u."City" = $1
    GROUP BY 1
    ORDER BY 2 DESC
"#;

const DICE_SQL: &str = r#"
    SELECT u."City" AS city, p."Category" AS category, d."Year" AS year,
           d."Quarter" AS quarter, SUM(f."Total_Revenue") AS total_revenue
    FROM fact_order_items f
    JOIN dim_products p ON p."Product_ID" = f."Product_ID"
    JOIN dim_users u ON u."Users_ID" = f."User_ID"
    JOIN dim_date d ON d."Date_ID" = f."Delivery_Date_ID"
    WHERE u."City" = ANY($1) AND p."Category" = ANY($2)
    GROUP BY 1, 2, 3, 4
    ORDER BY 1, 2, 3, 4
"#;

pub struct PgReportingStore {
    pool: PgPool,
}

impl PgReportingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Appends ` WHERE a AND b ...` for the filters that are set.
fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filters: &[(&str, Option<&'a str>)]) {
    let mut first = true;
    for (column, value) in filters {
        let Some(value) = value else { continue };
        qb.push(if first { " WHERE " } else { " AND " });
        qb.push(format!("\"{}\" = ", column)).push_bind(*value);
        first = false;
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, order_by: &str, page: Page) {
    qb.push(" ORDER BY ")
        .push(order_by)
        .push(" OFFSET ")
        .push_bind(page.offset)
        .push(" LIMIT ")
        .push_bind(page.limit);
}

fn group_expression(group_by: SalesGrouping) -> &'static str {
    match group_by {
        SalesGrouping::Category => r#"p."Category""#,
        SalesGrouping::Product => r#"p."Name""#,
        SalesGrouping::User => r#"u."Username""#,
        SalesGrouping::Rider => {
            r#"COALESCE(r."First_Name" || ' ' || r."Last_Name", 'unassigned')"#
        }
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl ReportingStore for PgReportingStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Connectivity(format!("warehouse unreachable: {}", e)))?;
        Ok(())
    }

    async fn products(&self, filter: &ProductFilter, page: Page) -> Result<Vec<ProductRow>> {
        let mut qb = QueryBuilder::new(PRODUCT_COLUMNS);
        push_filters(&mut qb, &[("Category", filter.category.as_deref())]);
        push_page(&mut qb, r#""Product_ID""#, page);
        Ok(qb.build_query_as().fetch_all(&self.pool).await?)
    }

    async fn users(&self, filter: &UserFilter, page: Page) -> Result<Vec<UserRow>> {
        let mut qb = QueryBuilder::new(USER_COLUMNS);
        push_filters(
            &mut qb,
            &[
                ("City", filter.city.as_deref()),
                ("Country", filter.country.as_deref()),
            ],
        );
        push_page(&mut qb, r#""Users_ID""#, page);
        Ok(qb.build_query_as().fetch_all(&self.pool).await?)
    }

    async fn user(&self, user_id: i32) -> Result<Option<UserRow>> {
        let sql = format!(r#"{} WHERE "Users_ID" = $1"#, USER_COLUMNS);
        Ok(sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn riders(&self, filter: &RiderFilter, page: Page) -> Result<Vec<RiderRow>> {
        let mut qb = QueryBuilder::new(RIDER_COLUMNS);
        push_filters(
            &mut qb,
            &[
                ("Vehicle_Type", filter.vehicle_type.as_deref()),
                ("Courier_Name", filter.courier.as_deref()),
            ],
        );
        push_page(&mut qb, r#""Rider_ID""#, page);
        Ok(qb.build_query_as().fetch_all(&self.pool).await?)
    }

    async fn orders(&self, page: Page) -> Result<Vec<OrderRow>> {
        let mut qb = QueryBuilder::new(
            r#"
            SELECT f."Order_Item_ID" AS order_item_id, f."Order_Num" AS order_num,
                   d."Date" AS delivery_date, p."Name" AS product_name,
                   p."Category" AS category, u."Username" AS username,
                   r."First_Name" || ' ' || r."Last_Name" AS rider_name,
                   f."Quantity" AS quantity, f."Notes" AS notes,
                   f."Total_Revenue" AS total_revenue
            "#,
        );
        qb.push(FACT_JOINS);
        push_page(&mut qb, r#"f."Order_Item_ID""#, page);
        Ok(qb.build_query_as().fetch_all(&self.pool).await?)
    }

    async fn sales_summary(
        &self,
        group_by: SalesGrouping,
        page: Page,
    ) -> Result<Vec<SalesSummaryRow>> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(group_expression(group_by)).push(
            r#" AS "group", COUNT(*) AS line_items,
                SUM(f."Quantity")::int8 AS total_quantity,
                SUM(f."Total_Revenue") AS total_revenue"#,
        );
        qb.push(FACT_JOINS).push(" GROUP BY 1");
        push_page(&mut qb, "total_revenue DESC, 1", page);
        Ok(qb.build_query_as().fetch_all(&self.pool).await?)
    }

    async fn rollup(&self) -> Result<Vec<RollupRow>> {
        Ok(sqlx::query_as(ROLLUP_SQL).fetch_all(&self.pool).await?)
    }

    async fn drill_down(&self) -> Result<Vec<DrillDownRow>> {
        Ok(sqlx::query_as(DRILL_DOWN_SQL).fetch_all(&self.pool).await?)
    }

    async fn slice(&self, city: &str) -> Result<Vec<SliceRow>> {
        Ok(sqlx::query_as(SLICE_SQL)
            .bind(city)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn dice(&self, cities: &[String], categories: &[String]) -> Result<Vec<DiceRow>> {
        Ok(sqlx::query_as(DICE_SQL)
            .bind(cities)
            .bind(categories)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn cities(&self, query: Option<&str>) -> Result<Vec<String>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"SELECT DISTINCT "City" FROM dim_users WHERE "City" IS NOT NULL"#,
        );
        if let Some(term) = query {
            qb.push(r#" AND "City" ILIKE "#).push_bind(contains_pattern(term));
        }
        qb.push(" ORDER BY 1 LIMIT ").push_bind(CITY_SUGGESTIONS);
        Ok(qb.build_query_scalar().fetch_all(&self.pool).await?)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        Ok(
            sqlx::query_scalar(r#"SELECT DISTINCT "Category" FROM dim_products ORDER BY 1"#)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
