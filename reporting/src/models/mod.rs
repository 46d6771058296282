//! Rows served by the reporting API.
//!
//! OLAP rows keep the warehouse column casing the dashboards chart against.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ProductRow {
    pub product_id: i32,
    pub product_code: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserRow {
    pub user_id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Address<'a> {
    pub address_1: Option<&'a str>,
    pub address_2: Option<&'a str>,
    pub city: Option<&'a str>,
    pub country: Option<&'a str>,
    pub zipcode: Option<&'a str>,
}

/// JSON shape of a user: the address is nested and a full name added.
#[derive(Debug, Serialize)]
pub struct UserView<'a> {
    pub user_id: i32,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub full_name: String,
    pub address: Address<'a>,
    pub phone_number: Option<&'a str>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<&'a str>,
}

impl UserRow {
    pub fn view(&self) -> UserView<'_> {
        UserView {
            user_id: self.user_id,
            username: &self.username,
            first_name: &self.first_name,
            last_name: &self.last_name,
            full_name: format!("{} {}", self.first_name, self.last_name),
            address: Address {
                address_1: self.address_1.as_deref(),
                address_2: self.address_2.as_deref(),
                city: self.city.as_deref(),
                country: self.country.as_deref(),
                zipcode: self.zipcode.as_deref(),
            },
            phone_number: self.phone_number.as_deref(),
            birth_date: self.birth_date,
            gender: self.gender.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct RiderRow {
    pub rider_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub vehicle_type: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub courier_name: Option<String>,
}

/// A fact row with its dimension attributes resolved.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderRow {
    pub order_item_id: i64,
    pub order_num: String,
    pub delivery_date: NaiveDate,
    pub product_name: String,
    pub category: String,
    pub username: String,
    pub rider_name: Option<String>,
    pub quantity: i32,
    pub notes: Option<String>,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SalesSummaryRow {
    pub group: String,
    pub line_items: i64,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

/// A `None` level marks a subtotal row.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct RollupRow {
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Quarter")]
    pub quarter: Option<i32>,
    #[serde(rename = "Month")]
    pub month: Option<i32>,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DrillDownRow {
    #[serde(rename = "Courier_Name")]
    pub courier_name: String,
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SliceRow {
    #[serde(rename = "Name")]
    pub category: String,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DiceRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Quarter")]
    pub quarter: i32,
    pub total_revenue: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_view_nests_the_address() {
        let user = UserRow {
            user_id: 5,
            username: "user5".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address_1: Some("1 Main St".into()),
            address_2: None,
            city: Some("Springfield".into()),
            country: Some("Usa".into()),
            zipcode: Some("12345".into()),
            phone_number: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 2, 3),
            gender: Some("female".into()),
        };

        let value = serde_json::to_value(user.view()).unwrap();
        assert_eq!(value["full_name"], "Ada Lovelace");
        assert_eq!(value["address"]["city"], "Springfield");
        assert_eq!(value["birth_date"], "1990-02-03");
    }

    #[test]
    fn olap_rows_keep_dashboard_casing() {
        let row = RollupRow {
            year: Some(2025),
            quarter: None,
            month: None,
            revenue: Decimal::new(5997, 2),
        };
        assert_eq!(
            serde_json::to_value(row).unwrap(),
            json!({ "Year": 2025, "Quarter": null, "Month": null, "revenue": 59.97 })
        );
    }
}
