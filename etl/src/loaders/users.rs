use async_trait::async_trait;

use common::Result;

use crate::loaders::dimension::{load_dimension, optional_within, required_name, required_text};
use crate::loaders::{EtlStep, StepContext};
use crate::models::{DimUser, SourceUser};
use crate::report::{LoadReport, RowRejection, RowResult};
use crate::transform::{
    clean_text, normalize_gender, normalize_phone, normalize_postal_code, parse_date, title_case,
};
use crate::warehouse::ddl::width;
use crate::warehouse::{Batch, TargetTable};

fn optional_title(raw: Option<&str>) -> Option<String> {
    clean_text(raw).map(|value| title_case(&value))
}

/// An unparseable birth date is dropped to null; it does not exclude the user.
/// Neither does an optional value too long for its column.
pub fn transform_user(row: SourceUser) -> RowResult<DimUser> {
    Ok(DimUser {
        user_id: row.id.ok_or(RowRejection::MissingField("id"))?,
        username: required_text(row.username.as_deref(), "username", width::USERNAME)?,
        first_name: required_name(row.first_name.as_deref(), "first_name", width::PERSON_NAME)?,
        last_name: required_name(row.last_name.as_deref(), "last_name", width::PERSON_NAME)?,
        address_1: optional_within(clean_text(row.address_1.as_deref()), width::ADDRESS),
        address_2: optional_within(clean_text(row.address_2.as_deref()), width::ADDRESS),
        city: optional_within(optional_title(row.city.as_deref()), width::CITY),
        country: optional_within(optional_title(row.country.as_deref()), width::COUNTRY),
        zipcode: optional_within(
            row.zip_code.as_deref().and_then(normalize_postal_code),
            width::ZIPCODE,
        ),
        phone_number: optional_within(
            row.phone_number.as_deref().and_then(normalize_phone),
            width::PHONE_NUMBER,
        ),
        birth_date: row.birth_date.as_deref().and_then(parse_date),
        gender: normalize_gender(row.gender.as_deref()),
    })
}

pub struct UsersStep;

#[async_trait]
impl EtlStep for UsersStep {
    fn name(&self) -> &'static str {
        "Load Users"
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<LoadReport> {
        load_dimension(
            ctx,
            TargetTable::Users,
            ctx.source.users(ctx.options.batch_size),
            transform_user,
            Batch::Users,
        )
        .await
    }
}
