use std::time::Instant;

use futures::TryStreamExt;
use tracing::{debug, info, warn};

use common::Result;

use crate::loaders::StepContext;
use crate::report::{Exclusions, LoadReport, RowRejection, RowResult};
use crate::source::ChunkStream;
use crate::transform::{clean_text, title_case};
use crate::warehouse::{Batch, TargetTable};

/// Rejects a value with more than `max` characters.
pub fn within_width(value: String, field: &'static str, max: usize) -> RowResult<String> {
    if value.chars().count() > max {
        return Err(RowRejection::FieldTooLong(field));
    }
    Ok(value)
}

/// Optional columns lose an over-long value instead of the whole row.
pub fn optional_within(value: Option<String>, max: usize) -> Option<String> {
    value.filter(|v| v.chars().count() <= max)
}

/// Trimmed, non-empty text of at most `max` characters.
pub fn required_text(raw: Option<&str>, field: &'static str, max: usize) -> RowResult<String> {
    let text = clean_text(raw).ok_or(RowRejection::MissingField(field))?;
    within_width(text, field, max)
}

/// Like [`required_text`], title-cased.
pub fn required_name(raw: Option<&str>, field: &'static str, max: usize) -> RowResult<String> {
    required_text(raw, field, max).map(|name| title_case(&name))
}

/// Streams one source entity into its dimension table.
///
/// Each chunk is transformed row by row; rejected rows are tallied and the
/// rest written through a single session, so a bulk copy either lands whole
/// or not at all.
pub async fn load_dimension<S, T, F>(
    ctx: &StepContext<'_>,
    table: TargetTable,
    mut chunks: ChunkStream<'_, S>,
    mut transform: F,
    into_batch: fn(Vec<T>) -> Batch,
) -> Result<LoadReport>
where
    S: Send,
    T: Send,
    F: FnMut(S) -> RowResult<T> + Send,
{
    let started = Instant::now();
    let strategy = ctx.options.strategy;
    let mut report = LoadReport::new(table, strategy);
    let mut load = ctx.warehouse.begin_load(table, strategy).await?;

    while let Some(chunk) = chunks.try_next().await? {
        report.extracted += chunk.len() as u64;
        report.chunks += 1;

        let mut rows = Vec::with_capacity(chunk.len());
        let mut excluded = Exclusions::default();
        for source_row in chunk {
            match transform(source_row) {
                Ok(row) => rows.push(row),
                Err(rejection) => excluded.record(rejection),
            }
        }

        let written = load.write(into_batch(rows)).await?;
        report.written += written;
        debug!(
            table = %table,
            chunk = report.chunks,
            written,
            excluded = excluded.total(),
            "Chunk loaded"
        );
        report.excluded.merge(&excluded);
    }

    load.commit().await?;
    report.elapsed = started.elapsed();
    log_exclusions(&report);
    Ok(report)
}

pub fn log_exclusions(report: &LoadReport) {
    if report.excluded.is_empty() {
        info!(table = %report.table, extracted = report.extracted, "No rows excluded");
    } else {
        warn!(
            table = %report.table,
            extracted = report.extracted,
            excluded = report.excluded.total(),
            reasons = %report.excluded,
            "Rows excluded from load"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_reject_blank_values() {
        assert_eq!(required_name(Some("  jOHN "), "first_name", 10), Ok("John".to_string()));
        assert_eq!(
            required_name(Some("   "), "first_name", 10),
            Err(RowRejection::MissingField("first_name"))
        );
        assert_eq!(
            required_text(None, "username", 10),
            Err(RowRejection::MissingField("username"))
        );
        assert_eq!(required_text(Some(" P-1 "), "product_code", 3), Ok("P-1".to_string()));
    }

    #[test]
    fn widths_count_characters_after_trimming() {
        assert_eq!(
            required_text(Some(" SKU-0001 "), "product_code", 7),
            Err(RowRejection::FieldTooLong("product_code"))
        );
        assert_eq!(required_name(Some("élodie"), "first_name", 6), Ok("Élodie".to_string()));

        assert_eq!(optional_within(Some("12345".into()), 5).as_deref(), Some("12345"));
        assert_eq!(optional_within(Some("123456".into()), 5), None);
        assert_eq!(optional_within(None, 5), None);
    }
}
