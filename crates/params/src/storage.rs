//! Parameter series storage.
//!
//! Holds the expanded per-year series of every parameter and the model clock
//! whose current year selects the active slice.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::types::{CurrentValue, Series};

/// Model horizon plus the current-year cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelClock {
    start_year: i32,
    num_years: usize,
    end_year: i32,
    last_known_year: i32,
    current_year: i32,
}

impl ModelClock {
    /// Create a clock positioned at `start_year`.
    ///
    /// `last_known_year` defaults to `start_year` and must lie in the horizon.
    pub fn new(start_year: i32, num_years: usize, last_known_year: Option<i32>) -> Result<Self> {
        if num_years == 0 {
            return Err(Error::InvalidConfig("num_years must be at least 1".into()));
        }
        let end_year = i32::try_from(num_years - 1)
            .ok()
            .and_then(|span| start_year.checked_add(span))
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "horizon of {num_years} years from {start_year} overflows the year range"
                ))
            })?;
        let last_known_year = last_known_year.unwrap_or(start_year);
        if last_known_year < start_year || last_known_year > end_year {
            return Err(Error::InvalidConfig(format!(
                "last_known_year {last_known_year} must be in [{start_year}, {end_year}]"
            )));
        }
        Ok(Self {
            start_year,
            num_years,
            end_year,
            last_known_year,
            current_year: start_year,
        })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn num_years(&self) -> usize {
        self.num_years
    }

    pub fn last_known_year(&self) -> i32 {
        self.last_known_year
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Move the cursor. Fails outside `[start_year, end_year]`.
    pub fn set_year(&mut self, year: i32) -> Result<()> {
        self.check_year(year)?;
        trace!(year, "clock moved");
        self.current_year = year;
        Ok(())
    }

    pub fn check_year(&self, year: i32) -> Result<()> {
        if year < self.start_year || year > self.end_year {
            return Err(Error::YearOutOfRange {
                year,
                min: self.start_year,
                max: self.end_year(),
            });
        }
        Ok(())
    }

    /// Offset of `year` from the start year.
    pub fn offset(&self, year: i32) -> usize {
        (i64::from(year) - i64::from(self.start_year)).max(0) as usize
    }

    /// Years from `year` through the end of the horizon, inclusive.
    pub fn remaining_from(&self, year: i32) -> usize {
        (i64::from(self.end_year) - i64::from(year) + 1).max(0) as usize
    }

    pub(crate) fn current_offset(&self) -> usize {
        self.offset(self.current_year)
    }
}

/// Expanded series of every parameter, in metadata order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesStore {
    series: IndexMap<String, Series>,
}

impl SeriesStore {
    pub fn insert(&mut self, name: impl Into<String>, series: Series) {
        self.series.insert(name.into(), series);
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    /// Value of `name` for the year at `offset`.
    pub fn value_at(&self, name: &str, offset: usize) -> Result<CurrentValue> {
        let series = self
            .series
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        series.at(offset).ok_or_else(|| {
            Error::type_mismatch(
                name,
                format!("series of {} years has no entry at offset {offset}", series.len()),
            )
        })
    }

    /// Overwrite `name` from `offset` onward.
    pub fn splice(&mut self, name: &str, offset: usize, replacement: Series) -> Result<()> {
        let series = self
            .series
            .get_mut(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        series.splice_from(name, offset, replacement)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
