use tracing::debug;

use common::Result;

use crate::transform::DateResolver;
use crate::transform::dates::DateResolution;
use crate::warehouse::Warehouse;

/// Resolves raw delivery dates against the run's lookup and writes the dates
/// not seen before, insert-if-absent.
pub async fn load_dates<'a, I>(
    warehouse: &dyn Warehouse,
    resolver: &mut DateResolver,
    raws: I,
) -> Result<DateResolution>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let resolution = resolver.resolve_raw(raws);

    if !resolution.new_dates.is_empty() {
        let inserted = warehouse.insert_dates(&resolution.new_dates).await?;
        debug!(
            sighted = resolution.new_dates.len(),
            inserted,
            invalid = resolution.invalid,
            "Date dimension extended"
        );
    }

    Ok(resolution)
}
