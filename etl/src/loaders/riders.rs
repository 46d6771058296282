use std::collections::HashMap;

use async_trait::async_trait;
use tracing::info;

use common::Result;

use crate::loaders::dimension::{load_dimension, optional_within, required_name};
use crate::loaders::{EtlStep, StepContext};
use crate::models::{DimRider, SourceCourier, SourceRider};
use crate::report::{LoadReport, RowRejection, RowResult};
use crate::transform::{normalize_gender, normalize_vehicle_type};
use crate::warehouse::ddl::width;
use crate::warehouse::{Batch, TargetTable};

/// Courier id → upper-cased courier name, built once per run.
#[derive(Debug, Default)]
pub struct CourierLookup(HashMap<i32, String>);

impl CourierLookup {
    pub fn new(couriers: Vec<SourceCourier>) -> Self {
        Self(
            couriers
                .into_iter()
                .filter_map(|c| {
                    let name = c.name?.trim().to_uppercase();
                    (!name.is_empty()).then_some((c.id?, name))
                })
                .collect(),
        )
    }

    pub fn name_for(&self, courier_id: Option<i32>) -> Option<String> {
        courier_id.and_then(|id| self.0.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn transform_rider(row: SourceRider, couriers: &CourierLookup) -> RowResult<DimRider> {
    Ok(DimRider {
        rider_id: row.id.ok_or(RowRejection::MissingField("id"))?,
        first_name: required_name(row.first_name.as_deref(), "first_name", width::PERSON_NAME)?,
        last_name: required_name(row.last_name.as_deref(), "last_name", width::PERSON_NAME)?,
        vehicle_type: optional_within(
            row.vehicle_type.as_deref().and_then(normalize_vehicle_type),
            width::VEHICLE_TYPE,
        ),
        age: row.age,
        gender: normalize_gender(row.gender.as_deref()),
        courier_name: optional_within(couriers.name_for(row.courier_id), width::COURIER_NAME),
    })
}

pub struct RidersStep;

#[async_trait]
impl EtlStep for RidersStep {
    fn name(&self) -> &'static str {
        "Load Riders"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<LoadReport> {
        let couriers = CourierLookup::new(ctx.source.couriers().await?);
        info!(couriers = couriers.len(), "Courier lookup built");

        load_dimension(
            ctx,
            TargetTable::Riders,
            ctx.source.riders(ctx.options.batch_size),
            |row| transform_rider(row, &couriers),
            Batch::Riders,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn courier(id: i32, name: &str) -> SourceCourier {
        SourceCourier {
            id: Some(id),
            name: Some(name.to_string()),
        }
    }

    fn rider() -> SourceRider {
        SourceRider {
            id: Some(7),
            first_name: Some(" aNNa ".into()),
            last_name: Some("de la cruz".into()),
            vehicle_type: Some("Bike".into()),
            age: Some(31),
            gender: Some("F".into()),
            courier_id: Some(1),
        }
    }

    #[test]
    fn denormalizes_courier_name() {
        let couriers = CourierLookup::new(vec![courier(1, " Acme "), courier(2, "   ")]);
        assert_eq!(couriers.len(), 1);

        let dim = transform_rider(rider(), &couriers).unwrap();
        assert_eq!(dim.first_name, "Anna");
        assert_eq!(dim.last_name, "De La Cruz");
        assert_eq!(dim.vehicle_type.as_deref(), Some("bicycle"));
        assert_eq!(dim.gender, Some(Gender::Female));
        assert_eq!(dim.courier_name.as_deref(), Some("ACME"));
    }

    #[test]
    fn unresolved_courier_is_null_not_a_failure() {
        let couriers = CourierLookup::default();
        let dim = transform_rider(rider(), &couriers).unwrap();
        assert_eq!(dim.courier_name, None);

        let mut unassigned = rider();
        unassigned.courier_id = None;
        assert_eq!(transform_rider(unassigned, &couriers).unwrap().courier_name, None);
    }

    #[test]
    fn missing_identity_or_name_excludes_the_row() {
        let couriers = CourierLookup::default();

        let mut no_id = rider();
        no_id.id = None;
        assert_eq!(
            transform_rider(no_id, &couriers),
            Err(RowRejection::MissingField("id"))
        );

        let mut no_last = rider();
        no_last.last_name = Some(" ".into());
        assert_eq!(
            transform_rider(no_last, &couriers),
            Err(RowRejection::MissingField("last_name"))
        );
    }

    #[test]
    fn over_long_names_exclude_but_vehicle_is_nulled() {
        let couriers = CourierLookup::default();

        let mut long_vehicle = rider();
        long_vehicle.vehicle_type = Some("v".repeat(width::VEHICLE_TYPE + 1));
        assert_eq!(transform_rider(long_vehicle, &couriers).unwrap().vehicle_type, None);

        let mut long_name = rider();
        long_name.first_name = Some("a".repeat(width::PERSON_NAME + 1));
        assert_eq!(
            transform_rider(long_name, &couriers),
            Err(RowRejection::FieldTooLong("first_name"))
        );
    }
}
