use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use common::config::LoadStrategy;
use thiserror::Error;

use crate::warehouse::TargetTable;

/// Outcome of transforming one source row.
pub type RowResult<T> = std::result::Result<T, RowRejection>;

/// Why a source row was left out of a load. Rejections are counted, never raised.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowRejection {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("unparseable delivery date")]
    UnparseableDate,

    #[error("unknown product")]
    UnknownProduct,

    #[error("product id out of range")]
    ProductIdOutOfRange,

    #[error("unknown user")]
    UnknownUser,

    #[error("{0} longer than its column")]
    FieldTooLong(&'static str),
}

impl RowRejection {
    pub fn reason(&self) -> String {
        match self {
            RowRejection::MissingField(field) => format!("missing_{}", field),
            RowRejection::UnparseableDate => "unparseable_date".to_string(),
            RowRejection::UnknownProduct => "unknown_product".to_string(),
            RowRejection::ProductIdOutOfRange => "product_id_out_of_range".to_string(),
            RowRejection::UnknownUser => "unknown_user".to_string(),
            RowRejection::FieldTooLong(field) => format!("too_long_{}", field),
        }
    }
}

/// Excluded-row tally, reason → count.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Exclusions(BTreeMap<RowRejection, u64>);

impl Exclusions {
    pub fn record(&mut self, rejection: RowRejection) {
        *self.0.entry(rejection).or_default() += 1;
    }

    pub fn merge(&mut self, other: &Exclusions) {
        for (rejection, count) in &other.0 {
            *self.0.entry(*rejection).or_default() += count;
        }
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn count(&self, rejection: RowRejection) -> u64 {
        self.0.get(&rejection).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowRejection, &u64)> {
        self.0.iter()
    }
}

impl fmt::Display for Exclusions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(rejection, count)| format!("{}={}", rejection.reason(), count))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// What one loader did to its target table.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub table: TargetTable,
    pub strategy: LoadStrategy,
    pub extracted: u64,
    pub written: u64,
    pub chunks: u64,
    pub excluded: Exclusions,
    pub dates_created: u64,
    pub duplicates_merged: u64,
    /// Facts kept with a null rider because their rider is not in the warehouse.
    pub riders_unresolved: u64,
    /// Maintenance problems that did not fail the step, e.g. a missing index.
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn new(table: TargetTable, strategy: LoadStrategy) -> Self {
        Self {
            table,
            strategy,
            extracted: 0,
            written: 0,
            chunks: 0,
            excluded: Exclusions::default(),
            dates_created: 0,
            duplicates_merged: 0,
            riders_unresolved: 0,
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}
