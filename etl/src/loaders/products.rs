use async_trait::async_trait;

use common::Result;

use crate::loaders::dimension::{load_dimension, required_name, required_text, within_width};
use crate::loaders::{EtlStep, StepContext};
use crate::models::{DimProduct, SourceProduct};
use crate::report::{LoadReport, RowRejection, RowResult};
use crate::transform::{clean_text, normalize_category};
use crate::warehouse::ddl::width;
use crate::warehouse::{Batch, TargetTable};

pub fn transform_product(row: SourceProduct) -> RowResult<DimProduct> {
    Ok(DimProduct {
        product_id: row.id.ok_or(RowRejection::MissingField("id"))?,
        product_code: required_text(
            row.product_code.as_deref(),
            "product_code",
            width::PRODUCT_CODE,
        )?,
        name: required_name(row.name.as_deref(), "name", width::PRODUCT_NAME)?,
        category: row
            .category
            .as_deref()
            .and_then(normalize_category)
            .ok_or(RowRejection::MissingField("category"))
            .and_then(|category| within_width(category, "category", width::CATEGORY))?,
        description: clean_text(row.description.as_deref()),
        price: row
            .price
            .ok_or(RowRejection::MissingField("price"))?
            .round_dp(2),
    })
}

pub struct ProductsStep;

#[async_trait]
impl EtlStep for ProductsStep {
    fn name(&self) -> &'static str {
        "Load Products"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<LoadReport> {
        load_dimension(
            ctx,
            TargetTable::Products,
            ctx.source.products(ctx.options.batch_size),
            transform_product,
            Batch::Products,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn product() -> SourceProduct {
        SourceProduct {
            id: Some(3),
            product_code: Some(" SKU-3 ".into()),
            name: Some("wooden TRAIN".into()),
            category: Some(" Toy ".into()),
            description: Some("  ".into()),
            price: Some(Decimal::from_str("10.00").unwrap()),
        }
    }

    #[test]
    fn normalizes_product_fields() {
        let dim = transform_product(product()).unwrap();
        assert_eq!(dim.product_code, "SKU-3");
        assert_eq!(dim.name, "Wooden Train");
        assert_eq!(dim.category, "toys");
        assert_eq!(dim.description, None);
        assert_eq!(dim.price, Decimal::from_str("10.00").unwrap());
    }

    #[test]
    fn over_long_code_excludes_the_product() {
        let mut row = product();
        row.product_code = Some("X".repeat(width::PRODUCT_CODE + 1));
        assert_eq!(
            transform_product(row),
            Err(RowRejection::FieldTooLong("product_code"))
        );

        let mut row = product();
        row.category = Some("c".repeat(width::CATEGORY + 1));
        assert_eq!(transform_product(row), Err(RowRejection::FieldTooLong("category")));
    }

    #[test]
    fn price_and_category_are_required() {
        let mut no_price = product();
        no_price.price = None;
        assert_eq!(
            transform_product(no_price),
            Err(RowRejection::MissingField("price"))
        );

        let mut no_category = product();
        no_category.category = Some("".into());
        assert_eq!(
            transform_product(no_category),
            Err(RowRejection::MissingField("category"))
        );
    }
}
