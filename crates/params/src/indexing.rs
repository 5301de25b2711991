//! Indexing rates and CPI-offset re-basing.
//!
//! Indexed parameters compound against one of two externally supplied rate
//! series: wage growth for the family's wage-indexed parameters, price
//! inflation for everything else. The `CPI_offset` parameter shifts the
//! inflation series; once at load time from its default values, and again
//! whenever a revision changes it, after which indexed parameters are rebuilt
//! from their law defaults using only their [`KnownYears`].

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expand::round_rate;
use crate::metadata::MetadataTable;
use crate::storage::ModelClock;

/// Name of the parameter that offsets the inflation series.
pub const CPI_OFFSET: &str = "CPI_offset";

/// Externally supplied growth rates, one decimal per model year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSeries {
    #[serde(default)]
    pub inflation_rates: Vec<f64>,
    #[serde(default)]
    pub wage_growth_rates: Vec<f64>,
}

/// Which rate series a parameter compounds against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    Inflation,
    WageGrowth,
}

/// How many leading law-default years to keep when rebuilding series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownYears {
    /// Keep every default year and rebuild every parameter.
    All,
    /// Rebuild only the listed parameters, each truncated to its count.
    PerParameter(IndexMap<String, usize>),
}

/// Rate series plus the routing of parameters to them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexingRates {
    rates: RateSeries,
    wage_indexed: IndexSet<String>,
}

impl IndexingRates {
    pub fn new<I, S>(rates: RateSeries, wage_indexed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rates,
            wage_indexed: wage_indexed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind_for(&self, name: &str) -> RateKind {
        if self.wage_indexed.contains(name) {
            RateKind::WageGrowth
        } else {
            RateKind::Inflation
        }
    }

    pub fn series(&self, kind: RateKind) -> &[f64] {
        match kind {
            RateKind::Inflation => &self.rates.inflation_rates,
            RateKind::WageGrowth => &self.rates.wage_growth_rates,
        }
    }

    /// Full rate series (position 0 = start year) for `name`.
    pub fn rates_for(&self, name: &str) -> &[f64] {
        self.series(self.kind_for(name))
    }

    /// Rates for `name` starting at `offset` years after the start year.
    ///
    /// `None` when the family supplies no rates of that kind.
    pub fn rates_from(&self, name: &str, offset: usize, len: usize) -> Option<&[f64]> {
        let rates = self.rates_for(name);
        if rates.is_empty() {
            return None;
        }
        let start = offset.min(rates.len());
        let end = (offset + len).min(rates.len());
        Some(&rates[start..end])
    }

    pub fn inflation_rates(&self) -> &[f64] {
        &self.rates.inflation_rates
    }

    pub fn wage_growth_rates(&self) -> &[f64] {
        &self.rates.wage_growth_rates
    }

    /// Fail if any parameter that is or may become indexed lacks a full rate
    /// series for the horizon.
    pub fn check_covers(&self, table: &MetadataTable, num_years: usize) -> Result<()> {
        let offset_needs_rates = table.contains(CPI_OFFSET);
        let needed_by = table
            .iter()
            .filter(|param| param.indexed || param.indexable)
            .map(|param| self.rates_for(&param.name).len());
        let inflation = offset_needs_rates.then(|| self.rates.inflation_rates.len());
        for available in needed_by.chain(inflation) {
            if available < num_years {
                return Err(Error::InsufficientRates {
                    needed: num_years,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Fold a law-default CPI offset into the inflation series.
    ///
    /// The offset values are extended to the horizon by repeating the last
    /// one, then added year by year, rounded to six decimals.
    pub fn apply_default_cpi_offset(&mut self, offsets: &[f64], num_years: usize) -> Result<()> {
        let Some(&last) = offsets.last() else {
            return Ok(());
        };
        let extended: Vec<f64> = offsets
            .iter()
            .copied()
            .chain(std::iter::repeat(last))
            .take(num_years.max(offsets.len()))
            .collect();
        self.add_cpi_offset(&extended, 0, num_years)
    }

    /// Add `offsets[i]` into the inflation rate of every year `i` in
    /// `[from, num_years)`.
    pub fn add_cpi_offset(&mut self, offsets: &[f64], from: usize, num_years: usize) -> Result<()> {
        let available = self.rates.inflation_rates.len().min(offsets.len());
        if available < num_years {
            return Err(Error::InsufficientRates {
                needed: num_years,
                available,
            });
        }
        for idx in from..num_years {
            let rate = &mut self.rates.inflation_rates[idx];
            *rate = round_rate(*rate + offsets[idx]);
        }
        Ok(())
    }
}

/// Known-year counts after an offset change first taking effect in
/// `first_offset_year`.
///
/// Indexed parameters named in `touched` are authoritative only through the
/// offset year itself; every other indexed parameter keeps its defaults
/// through the later of the offset year and the last known year.
pub fn known_years<'a, I>(
    first_offset_year: i32,
    clock: &ModelClock,
    table: &MetadataTable,
    touched: I,
) -> IndexMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let start = clock.start_year();
    let in_revision = (first_offset_year - start + 1).max(0) as usize;
    let not_in_revision = (first_offset_year.max(clock.last_known_year()) - start + 1).max(0) as usize;

    let mut known = IndexMap::new();
    for name in touched {
        if table.is_indexed(name) && !known.contains_key(name) {
            known.insert(name.to_string(), in_revision);
        }
    }
    for param in table.iter().filter(|param| param.indexed) {
        known.entry(param.name.clone()).or_insert(not_in_revision);
    }
    known
}
