use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::models::DimDate;

const ISO_FORMAT: &str = "%Y-%m-%d";
const US_FORMAT: &str = "%m/%d/%Y";

/// Parses a raw date, ISO `YYYY-MM-DD` first, then US `MM/DD/YYYY`.
///
/// Anything else, including blank input, is `None`. There is no third
/// heuristic.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, US_FORMAT))
        .ok()
}

/// Surrogate key of the date dimension: the calendar date as `YYYYMMDD`.
pub fn date_key(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Outcome of resolving a set of raw date strings.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DateResolution {
    /// Dates not seen before in this run, in first-seen order.
    pub new_dates: Vec<DimDate>,
    pub resolved: u64,
    pub invalid: u64,
}

/// Run-scoped date → surrogate key lookup.
///
/// Seeded from the warehouse at the start of a run and extended as new dates
/// are sighted, so later rows of the same run see them immediately. Never
/// shared between runs.
#[derive(Debug, Default)]
pub struct DateResolver {
    known: HashMap<NaiveDate, i32>,
}

impl DateResolver {
    pub fn new(known: HashMap<NaiveDate, i32>) -> Self {
        Self { known }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn key_for(&self, date: NaiveDate) -> Option<i32> {
        self.known.get(&date).copied()
    }

    /// Returns the surrogate key for `date`, plus the dimension row to insert
    /// when the date is sighted for the first time.
    pub fn resolve(&mut self, date: NaiveDate) -> (i32, Option<DimDate>) {
        if let Some(key) = self.known.get(&date) {
            return (*key, None);
        }

        let row = DimDate::from_date(date);
        self.known.insert(date, row.date_id);
        (row.date_id, Some(row))
    }

    pub fn resolve_raw<'a, I>(&mut self, raws: I) -> DateResolution
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut resolution = DateResolution::default();

        for raw in raws {
            match raw.and_then(parse_date) {
                Some(date) => {
                    resolution.resolved += 1;
                    if let (_, Some(row)) = self.resolve(date) {
                        resolution.new_dates.push(row);
                    }
                }
                None => resolution.invalid += 1,
            }
        }

        resolution
    }
}
