//! Typed rows read from the transactional source store.
//!
//! Every field is optional: the source is consumed as-is and required-field
//! checks happen in the transform step, where a failure excludes the row
//! instead of failing the batch.

use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceCourier {
    pub id: Option<i32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceRider {
    pub id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub vehicle_type: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub courier_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceProduct {
    pub id: Option<i32>,
    pub product_code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceUser {
    pub id: Option<i32>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number: Option<String>,
    /// Raw text, parsed with the same two-format policy as delivery dates.
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

/// One order header joined with one of its line items.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SourceOrderLine {
    pub order_id: Option<i32>,
    pub order_number: Option<String>,
    pub user_id: Option<i32>,
    pub rider_id: Option<i32>,
    pub delivery_date: Option<String>,
    pub product_id: Option<i32>,
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}
