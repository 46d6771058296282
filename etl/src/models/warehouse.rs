use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::transform::dates::{date_key, quarter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimRider {
    pub rider_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub vehicle_type: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub courier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimProduct {
    pub product_id: i32,
    pub product_code: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimUser {
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
    pub gender: Option<Gender>,
}

/// Calendar dimension row keyed by `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq)]
pub struct DimDate {
    pub date_id: i32,
    pub date: NaiveDate,
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub quarter: i32,
    pub day_of_week: i16,
    pub week_of_year: i16,
}

impl DimDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date_id: date_key(date),
            date,
            year: date.year(),
            month: date.month() as i32,
            day: date.day() as i32,
            quarter: quarter(date) as i32,
            day_of_week: date.weekday().number_from_monday() as i16,
            week_of_year: date.iso_week().week() as i16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactOrderItem {
    /// `order_id * ORDER_ITEM_KEY_FACTOR + product_id`
    pub order_item_id: i64,
    pub product_id: i32,
    pub quantity: i32,
    pub notes: Option<String>,
    pub delivery_date_id: i32,
    pub delivery_rider_id: Option<i32>,
    pub user_id: i32,
    pub order_num: String,
    pub total_revenue: Decimal,
}
