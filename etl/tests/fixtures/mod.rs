#![allow(dead_code)]

use std::str::FromStr;

use etl::EtlOptions;
use etl::models::{
    SourceCourier, SourceOrderLine, SourceProduct, SourceRider, SourceUser,
};
use etl::source::MemorySource;
use rust_decimal::Decimal;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn options(strategy: common::config::LoadStrategy, batch_size: usize) -> EtlOptions {
    EtlOptions {
        batch_size,
        strategy,
        ..EtlOptions::default()
    }
}

pub fn rider(id: i32, courier_id: Option<i32>) -> SourceRider {
    SourceRider {
        id: Some(id),
        first_name: Some("sam".into()),
        last_name: Some(format!("rider{}", id)),
        vehicle_type: Some("Bike".into()),
        age: Some(30),
        gender: Some("M".into()),
        courier_id,
    }
}

pub fn product(id: i32, price: &str) -> SourceProduct {
    SourceProduct {
        id: Some(id),
        product_code: Some(format!("SKU-{}", id)),
        name: Some(format!("product {}", id)),
        category: Some("Toys".into()),
        description: None,
        price: Some(dec(price)),
    }
}

pub fn user(id: i32) -> SourceUser {
    SourceUser {
        id: Some(id),
        username: Some(format!("user{}", id)),
        first_name: Some("ada".into()),
        last_name: Some("lovelace".into()),
        address_1: Some("1 Main St".into()),
        address_2: None,
        city: Some("Springfield".into()),
        country: Some("USA".into()),
        zip_code: Some("12345-6789".into()),
        phone_number: Some("1 (555) 123-4567 x89".into()),
        birth_date: Some("1990-02-03".into()),
        gender: Some("female".into()),
    }
}

pub fn line(
    order_id: i32,
    user_id: i32,
    rider_id: Option<i32>,
    date: &str,
    product_id: i32,
    quantity: Option<i32>,
) -> SourceOrderLine {
    SourceOrderLine {
        order_id: Some(order_id),
        order_number: Some(format!("ORD-{}", order_id)),
        user_id: Some(user_id),
        rider_id,
        delivery_date: Some(date.to_string()),
        product_id: Some(product_id),
        quantity,
        notes: None,
    }
}

/// Six order lines: three load, three are excluded for different reasons.
pub fn order_lines() -> Vec<SourceOrderLine> {
    let mut first = line(100, 5, Some(7), "2025-06-01", 3, Some(3));
    first.notes = Some("  leave at door ".into());

    vec![
        first,
        line(100, 5, Some(7), "2025-06-01", 4, Some(1)),
        line(101, 6, None, "06/02/2025", 3, Some(2)),
        line(102, 5, Some(7), "not a date", 3, Some(1)),
        line(103, 5, Some(8), "2025-06-01", 99, Some(1)),
        line(104, 6, None, "2025-06-03", 4, None),
    ]
}

pub fn source() -> MemorySource {
    MemorySource::new()
        .with_couriers(vec![SourceCourier {
            id: Some(1),
            name: Some("Acme".into()),
        }])
        .with_riders(vec![rider(7, Some(1)), rider(8, None)])
        .with_products(vec![product(3, "19.99"), product(4, "10.00")])
        .with_users(vec![user(5), user(6)])
        .with_order_lines(order_lines())
}
