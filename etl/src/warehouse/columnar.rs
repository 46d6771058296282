//! Arrow representation of warehouse rows for the bulk-copy path.
//!
//! Each transformed chunk becomes one `RecordBatch`, which is serialised with
//! Arrow's CSV writer and streamed into `COPY ... FROM STDIN`.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Decimal128Array, Int16Array, Int32Array, Int64Array, StringArray,
};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use common::Result;
use rust_decimal::Decimal;

use crate::models::{DimDate, DimProduct, DimRider, DimUser, FactOrderItem};
use crate::warehouse::TargetTable;

pub const PRICE_PRECISION: u8 = 10;
pub const REVENUE_PRECISION: u8 = 12;
pub const MONEY_SCALE: i8 = 2;

// 1970-01-01 counted from 0001-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A row type with a fixed warehouse table, column list and Arrow schema.
pub trait WarehouseRecord: Sized + Send + Sync {
    const TABLE: TargetTable;
    /// Column names in insert order, unquoted.
    const COLUMNS: &'static [&'static str];
    const KEY: &'static str;
    /// Columns overwritten when an upsert hits an existing key. Empty means
    /// insert-if-absent.
    const UPDATE_COLUMNS: &'static [&'static str];

    fn key(&self) -> i64;

    fn arrow_schema() -> SchemaRef;

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch>;
}

pub fn quoted_columns(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serialises a batch as header-less CSV, the input `COPY ... WITH (FORMAT csv)` expects.
pub fn to_csv(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().with_header(false).build(Vec::new());
    writer.write(batch)?;
    Ok(writer.into_inner())
}

fn date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn money(value: Decimal) -> i128 {
    let mut scaled = value.round_dp(MONEY_SCALE as u32);
    scaled.rescale(MONEY_SCALE as u32);
    scaled.mantissa()
}

fn decimal_column(values: Vec<i128>, precision: u8) -> Result<ArrayRef> {
    Ok(Arc::new(
        Decimal128Array::from(values).with_precision_and_scale(precision, MONEY_SCALE)?,
    ))
}

impl WarehouseRecord for DimRider {
    const TABLE: TargetTable = TargetTable::Riders;
    const COLUMNS: &'static [&'static str] = &[
        "Rider_ID",
        "First_Name",
        "Last_Name",
        "Vehicle_Type",
        "Age",
        "Gender",
        "Courier_Name",
    ];
    const KEY: &'static str = "Rider_ID";
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "First_Name",
        "Last_Name",
        "Vehicle_Type",
        "Age",
        "Gender",
        "Courier_Name",
    ];

    fn key(&self) -> i64 {
        self.rider_id as i64
    }

    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("Rider_ID", DataType::Int32, false),
            Field::new("First_Name", DataType::Utf8, false),
            Field::new("Last_Name", DataType::Utf8, false),
            Field::new("Vehicle_Type", DataType::Utf8, true),
            Field::new("Age", DataType::Int32, true),
            Field::new("Gender", DataType::Utf8, true),
            Field::new("Courier_Name", DataType::Utf8, true),
        ]))
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.rider_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.first_name.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.last_name.as_str()))),
            Arc::new(rows.iter().map(|r| r.vehicle_type.as_deref()).collect::<StringArray>()),
            Arc::new(rows.iter().map(|r| r.age).collect::<Int32Array>()),
            Arc::new(rows.iter().map(|r| r.gender.map(|g| g.as_str())).collect::<StringArray>()),
            Arc::new(rows.iter().map(|r| r.courier_name.as_deref()).collect::<StringArray>()),
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }
}

impl WarehouseRecord for DimProduct {
    const TABLE: TargetTable = TargetTable::Products;
    const COLUMNS: &'static [&'static str] = &[
        "Product_ID",
        "Product_Code",
        "Name",
        "Category",
        "Description",
        "Price",
    ];
    const KEY: &'static str = "Product_ID";
    const UPDATE_COLUMNS: &'static [&'static str] =
        &["Product_Code", "Name", "Category", "Description", "Price"];

    fn key(&self) -> i64 {
        self.product_id as i64
    }

    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("Product_ID", DataType::Int32, false),
            Field::new("Product_Code", DataType::Utf8, false),
            Field::new("Name", DataType::Utf8, false),
            Field::new("Category", DataType::Utf8, false),
            Field::new("Description", DataType::Utf8, true),
            Field::new(
                "Price",
                DataType::Decimal128(PRICE_PRECISION, MONEY_SCALE),
                false,
            ),
        ]))
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.product_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.product_code.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.name.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.category.as_str()))),
            Arc::new(rows.iter().map(|r| r.description.as_deref()).collect::<StringArray>()),
            decimal_column(rows.iter().map(|r| money(r.price)).collect(), PRICE_PRECISION)?,
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }
}

impl WarehouseRecord for DimUser {
    const TABLE: TargetTable = TargetTable::Users;
    const COLUMNS: &'static [&'static str] = &[
        "Users_ID",
        "Username",
        "First_Name",
        "Last_Name",
        "Address_1",
        "Address_2",
        "City",
        "Country",
        "Zipcode",
        "Phone_Number",
        "Birth_Date",
        "Gender",
    ];
    const KEY: &'static str = "Users_ID";
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "Username",
        "First_Name",
        "Last_Name",
        "Address_1",
        "Address_2",
        "City",
        "Country",
        "Zipcode",
        "Phone_Number",
        "Birth_Date",
        "Gender",
    ];

    fn key(&self) -> i64 {
        self.user_id as i64
    }

    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("Users_ID", DataType::Int32, false),
            Field::new("Username", DataType::Utf8, false),
            Field::new("First_Name", DataType::Utf8, false),
            Field::new("Last_Name", DataType::Utf8, false),
            Field::new("Address_1", DataType::Utf8, true),
            Field::new("Address_2", DataType::Utf8, true),
            Field::new("City", DataType::Utf8, true),
            Field::new("Country", DataType::Utf8, true),
            Field::new("Zipcode", DataType::Utf8, true),
            Field::new("Phone_Number", DataType::Utf8, true),
            Field::new("Birth_Date", DataType::Date32, true),
            Field::new("Gender", DataType::Utf8, true),
        ]))
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let text = |f: fn(&DimUser) -> Option<&str>| -> ArrayRef {
            Arc::new(rows.iter().map(f).collect::<StringArray>())
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.user_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.username.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.first_name.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.last_name.as_str()))),
            text(|r| r.address_1.as_deref()),
            text(|r| r.address_2.as_deref()),
            text(|r| r.city.as_deref()),
            text(|r| r.country.as_deref()),
            text(|r| r.zipcode.as_deref()),
            text(|r| r.phone_number.as_deref()),
            Arc::new(rows.iter().map(|r| r.birth_date.map(date32)).collect::<Date32Array>()),
            text(|r| r.gender.map(|g| g.as_str())),
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }
}

impl WarehouseRecord for DimDate {
    const TABLE: TargetTable = TargetTable::Dates;
    const COLUMNS: &'static [&'static str] = &[
        "Date_ID",
        "Date",
        "Year",
        "Month",
        "Day",
        "Quarter",
        "Day_Of_Week",
        "Week_Of_Year",
    ];
    const KEY: &'static str = "Date_ID";
    const UPDATE_COLUMNS: &'static [&'static str] = &[];

    fn key(&self) -> i64 {
        self.date_id as i64
    }

    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("Date_ID", DataType::Int32, false),
            Field::new("Date", DataType::Date32, false),
            Field::new("Year", DataType::Int32, false),
            Field::new("Month", DataType::Int32, false),
            Field::new("Day", DataType::Int32, false),
            Field::new("Quarter", DataType::Int32, false),
            Field::new("Day_Of_Week", DataType::Int16, false),
            Field::new("Week_Of_Year", DataType::Int16, false),
        ]))
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.date_id))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| date32(r.date)))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.month))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.day))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.quarter))),
            Arc::new(Int16Array::from_iter_values(rows.iter().map(|r| r.day_of_week))),
            Arc::new(Int16Array::from_iter_values(rows.iter().map(|r| r.week_of_year))),
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }
}

impl WarehouseRecord for FactOrderItem {
    const TABLE: TargetTable = TargetTable::Facts;
    const COLUMNS: &'static [&'static str] = &[
        "Order_Item_ID",
        "Product_ID",
        "Quantity",
        "Notes",
        "Delivery_Date_ID",
        "Delivery_Rider_ID",
        "User_ID",
        "Order_Num",
        "Total_Revenue",
    ];
    const KEY: &'static str = "Order_Item_ID";
    // only the measures change on a rerun
    const UPDATE_COLUMNS: &'static [&'static str] = &["Quantity", "Notes", "Total_Revenue"];

    fn key(&self) -> i64 {
        self.order_item_id
    }

    fn arrow_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("Order_Item_ID", DataType::Int64, false),
            Field::new("Product_ID", DataType::Int32, false),
            Field::new("Quantity", DataType::Int32, false),
            Field::new("Notes", DataType::Utf8, true),
            Field::new("Delivery_Date_ID", DataType::Int32, false),
            Field::new("Delivery_Rider_ID", DataType::Int32, true),
            Field::new("User_ID", DataType::Int32, false),
            Field::new("Order_Num", DataType::Utf8, false),
            Field::new(
                "Total_Revenue",
                DataType::Decimal128(REVENUE_PRECISION, MONEY_SCALE),
                false,
            ),
        ]))
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.order_item_id))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.product_id))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.quantity))),
            Arc::new(rows.iter().map(|r| r.notes.as_deref()).collect::<StringArray>()),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.delivery_date_id))),
            Arc::new(rows.iter().map(|r| r.delivery_rider_id).collect::<Int32Array>()),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.user_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.order_num.as_str()))),
            decimal_column(
                rows.iter().map(|r| money(r.total_revenue)).collect(),
                REVENUE_PRECISION,
            )?,
        ];
        Ok(RecordBatch::try_new(Self::arrow_schema(), columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use std::str::FromStr;

    fn fact() -> FactOrderItem {
        FactOrderItem {
            order_item_id: 100_000_003,
            product_id: 3,
            quantity: 4,
            notes: None,
            delivery_date_id: 20250601,
            delivery_rider_id: Some(7),
            user_id: 5,
            order_num: "ORD-100".to_string(),
            total_revenue: Decimal::from_str("40.00").unwrap(),
        }
    }

    #[test]
    fn fact_batch_serialises_for_copy() {
        let batch = FactOrderItem::to_record_batch(&[fact()]).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), FactOrderItem::COLUMNS.len());

        let csv = String::from_utf8(to_csv(&batch).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), "100000003,3,4,,20250601,7,5,ORD-100,40.00");
    }

    #[test]
    fn dates_serialise_as_iso_days() {
        let row = DimDate::from_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let batch = DimDate::to_record_batch(&[row]).unwrap();
        let csv = String::from_utf8(to_csv(&batch).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), "20250601,2025-06-01,2025,6,1,2,7,22");
    }

    #[test]
    fn text_with_commas_is_quoted_and_nulls_are_empty() {
        let rider = DimRider {
            rider_id: 7,
            first_name: "Ann".to_string(),
            last_name: "Lee, Jr".to_string(),
            vehicle_type: Some("bicycle".to_string()),
            age: None,
            gender: Some(Gender::Female),
            courier_name: None,
        };
        let batch = DimRider::to_record_batch(&[rider]).unwrap();
        let csv = String::from_utf8(to_csv(&batch).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), "7,Ann,\"Lee, Jr\",bicycle,,female,");
    }

    #[test]
    fn money_is_scaled_to_cents() {
        assert_eq!(money(Decimal::from_str("19.99").unwrap()), 1999);
        assert_eq!(money(Decimal::from(10)), 1000);
        assert_eq!(money(Decimal::from_str("59.970").unwrap()), 5997);
    }

    #[test]
    fn columns_are_quoted_for_sql() {
        assert_eq!(quoted_columns(&["Date_ID", "Date"]), "\"Date_ID\", \"Date\"");
    }
}
