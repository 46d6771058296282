//! Star-schema DDL. Every statement is safe to re-run against an existing warehouse.

/// Character limits of the bounded text columns, shared with the transforms so
/// an over-long value is caught per row instead of failing a whole load.
pub mod width {
    pub const PERSON_NAME: usize = 100;
    pub const VEHICLE_TYPE: usize = 40;
    pub const COURIER_NAME: usize = 100;
    pub const PRODUCT_CODE: usize = 20;
    pub const PRODUCT_NAME: usize = 100;
    pub const CATEGORY: usize = 50;
    pub const USERNAME: usize = 50;
    pub const ADDRESS: usize = 255;
    pub const CITY: usize = 50;
    pub const COUNTRY: usize = 100;
    pub const ZIPCODE: usize = 20;
    pub const PHONE_NUMBER: usize = 20;
    pub const ORDER_NUM: usize = 50;
}

pub const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS dim_riders (
        "Rider_ID" INTEGER PRIMARY KEY,
        "First_Name" VARCHAR(100) NOT NULL,
        "Last_Name" VARCHAR(100) NOT NULL,
        "Vehicle_Type" VARCHAR(40),
        "Age" INTEGER,
        "Gender" VARCHAR(6),
        "Courier_Name" VARCHAR(100)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS dim_products (
        "Product_ID" INTEGER PRIMARY KEY,
        "Product_Code" VARCHAR(20) NOT NULL,
        "Name" VARCHAR(100) NOT NULL,
        "Category" VARCHAR(50) NOT NULL,
        "Description" TEXT,
        "Price" NUMERIC(10, 2) NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS dim_users (
        "Users_ID" INTEGER PRIMARY KEY,
        "Username" VARCHAR(50) NOT NULL,
        "First_Name" VARCHAR(100) NOT NULL,
        "Last_Name" VARCHAR(100) NOT NULL,
        "Address_1" VARCHAR(255),
        "Address_2" VARCHAR(255),
        "City" VARCHAR(50),
        "Country" VARCHAR(100),
        "Zipcode" VARCHAR(20),
        "Phone_Number" VARCHAR(20),
        "Birth_Date" DATE,
        "Gender" VARCHAR(6)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_city ON dim_users ("City")"#,
    r#"CREATE INDEX IF NOT EXISTS idx_country ON dim_users ("Country")"#,
    r#"CREATE TABLE IF NOT EXISTS dim_date (
        "Date_ID" INTEGER PRIMARY KEY,
        "Date" DATE NOT NULL UNIQUE,
        "Year" INTEGER NOT NULL,
        "Month" INTEGER NOT NULL,
        "Day" INTEGER NOT NULL,
        "Quarter" INTEGER NOT NULL,
        "Day_Of_Week" SMALLINT NOT NULL,
        "Week_Of_Year" SMALLINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS fact_order_items (
        "Order_Item_ID" BIGINT PRIMARY KEY,
        "Product_ID" INTEGER NOT NULL REFERENCES dim_products ("Product_ID"),
        "Quantity" INTEGER NOT NULL,
        "Notes" TEXT,
        "Delivery_Date_ID" INTEGER NOT NULL REFERENCES dim_date ("Date_ID"),
        "Delivery_Rider_ID" INTEGER REFERENCES dim_riders ("Rider_ID"),
        "User_ID" INTEGER NOT NULL REFERENCES dim_users ("Users_ID"),
        "Order_Num" VARCHAR(50) NOT NULL,
        "Total_Revenue" NUMERIC(12, 2) NOT NULL
    )"#,
];

/// Secondary indexes on the fact table backing the aggregate queries.
pub const FACT_INDEXES: &[(&str, &str)] = &[
    (
        "idx_fact_fk",
        r#"CREATE INDEX IF NOT EXISTS idx_fact_fk ON fact_order_items ("Product_ID", "User_ID", "Delivery_Date_ID", "Total_Revenue")"#,
    ),
    (
        "idx_date_revenue",
        r#"CREATE INDEX IF NOT EXISTS idx_date_revenue ON fact_order_items ("Delivery_Date_ID", "Total_Revenue")"#,
    ),
    (
        "idx_rider_revenue",
        r#"CREATE INDEX IF NOT EXISTS idx_rider_revenue ON fact_order_items ("Delivery_Rider_ID", "Total_Revenue")"#,
    ),
];

pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", name)
}
