//! The parameter engine.
//!
//! [`Parameters`] owns the metadata table, the expanded series store, the
//! model clock and the indexing rates, and is the only thing that mutates
//! them. Revisions are applied in four stages:
//!
//! 1. structural validation of the whole revision (nothing is touched on
//!    failure)
//! 2. CPI-offset re-basing, when the revision changes `CPI_offset`
//! 3. chronological replay, one [`YearBatch`] at a time
//! 4. semantic validation of the installed values
//!
//! Out-of-range values found in stage 4 stay installed; they are reported
//! and, on request, raised.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::expand::expand_array;
use crate::indexing::{known_years, IndexingRates, KnownYears, RateSeries, CPI_OFFSET};
use crate::metadata::{InvalidAction, MetadataTable, ValidValues};
use crate::revision::{Revision, RevisionKey, RevisionValue, YearBatch};
use crate::storage::{ModelClock, SeriesStore};
use crate::types::{CurrentValue, RawValue, Scalar, Series, ValueType};
use crate::validate::{validate_structure, validate_values, Diagnostic, Diagnostics};

/// Keys of the defaults document that the snapshot recomputes.
const SNAPSHOT_KEYS: [&str; 3] = ["start_year", "value_yrs", "value"];

/// Configures and builds a [`Parameters`] engine.
#[derive(Debug, Clone)]
pub struct ParametersBuilder {
    table: MetadataTable,
    start_year: i32,
    num_years: usize,
    last_known_year: Option<i32>,
    rates: RateSeries,
    wage_indexed: Vec<String>,
    removed: IndexMap<String, String>,
    redefined: IndexMap<String, String>,
}

impl ParametersBuilder {
    pub fn new(table: MetadataTable, start_year: i32, num_years: usize) -> Self {
        Self {
            table,
            start_year,
            num_years,
            last_known_year: None,
            rates: RateSeries::default(),
            wage_indexed: Vec::new(),
            removed: IndexMap::new(),
            redefined: IndexMap::new(),
        }
    }

    /// Last year whose law-default values are known. Defaults to the start
    /// year.
    pub fn last_known_year(mut self, year: i32) -> Self {
        self.last_known_year = Some(year);
        self
    }

    pub fn rates(mut self, rates: RateSeries) -> Self {
        self.rates = rates;
        self
    }

    /// Parameters that compound against wage growth instead of inflation.
    pub fn wage_indexed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wage_indexed = names.into_iter().map(Into::into).collect();
        self
    }

    /// Retired parameter names and the message reported when a revision
    /// still uses one.
    pub fn removed<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.removed = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Parameters whose meaning changed and the warning emitted when one is
    /// revised.
    pub fn redefined<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.redefined = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Validate the configuration and expand every parameter over the
    /// horizon.
    pub fn build(self) -> Result<Parameters> {
        let clock = ModelClock::new(self.start_year, self.num_years, self.last_known_year)?;
        let mut rates = IndexingRates::new(self.rates, self.wage_indexed);
        rates.check_covers(&self.table, self.num_years)?;

        if let Some(param) = self.table.get(CPI_OFFSET) {
            let offsets = Series::from_raw(CPI_OFFSET, &param.value, param.value_type)?;
            let offsets = offsets.as_reals().ok_or_else(|| Error::InvalidMetadata {
                name: CPI_OFFSET.to_string(),
                message: "must be a real scalar parameter".to_string(),
            })?;
            rates.apply_default_cpi_offset(offsets, self.num_years)?;
        }

        let mut params = Parameters {
            table: self.table,
            store: SeriesStore::default(),
            clock,
            rates,
            removed: self.removed,
            redefined: self.redefined,
            diagnostics: Diagnostics::default(),
        };
        params.set_default_vals(&KnownYears::All)?;
        info!(
            start_year = params.clock.start_year(),
            num_years = params.clock.num_years(),
            parameters = params.table.len(),
            "parameters initialized"
        );
        Ok(params)
    }
}

/// One parameter of a [`Parameters::metadata`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSnapshot {
    /// The snapshot year, as text.
    pub start_year: String,
    pub value_yrs: Vec<String>,
    /// Value in the snapshot year.
    pub value: CurrentValue,
    pub value_type: ValueType,
    pub indexed: bool,
    pub indexable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vi_vals: Vec<String>,
    #[serde(skip_serializing_if = "ValidValues::is_empty")]
    pub valid_values: ValidValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_minmsg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_maxmsg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_action: Option<InvalidAction>,
    #[serde(flatten)]
    pub extra: IndexMap<String, JsonValue>,
}

/// Metadata of every parameter restricted to one year, in table order.
pub type MetadataSnapshot = IndexMap<String, ParameterSnapshot>;

/// A versioned, time-indexed parameter store.
#[derive(Debug, Clone)]
pub struct Parameters {
    table: MetadataTable,
    store: SeriesStore,
    clock: ModelClock,
    rates: IndexingRates,
    removed: IndexMap<String, String>,
    redefined: IndexMap<String, String>,
    diagnostics: Diagnostics,
}

impl Parameters {
    pub fn builder(table: MetadataTable, start_year: i32, num_years: usize) -> ParametersBuilder {
        ParametersBuilder::new(table, start_year, num_years)
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Move the current-year cursor. Fails outside `[start_year, end_year]`.
    pub fn set_year(&mut self, year: i32) -> Result<()> {
        self.clock.set_year(year)?;
        debug!(year, "current year set");
        Ok(())
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    pub fn start_year(&self) -> i32 {
        self.clock.start_year()
    }

    pub fn end_year(&self) -> i32 {
        self.clock.end_year()
    }

    pub fn num_years(&self) -> usize {
        self.clock.num_years()
    }

    pub fn last_known_year(&self) -> i32 {
        self.clock.last_known_year()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Value of `name` in the current year.
    pub fn value(&self, name: &str) -> Result<CurrentValue> {
        self.store.value_at(name, self.clock.current_offset())
    }

    /// Full per-year series of `name`.
    pub fn series(&self, name: &str) -> Result<&Series> {
        self.store
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    /// Current indexing status of `name`.
    pub fn is_indexed(&self, name: &str) -> Result<bool> {
        self.table
            .get(name)
            .map(|param| param.indexed)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    /// Inflation rates, including any CPI offset.
    pub fn inflation_rates(&self) -> &[f64] {
        self.rates.inflation_rates()
    }

    pub fn wage_growth_rates(&self) -> &[f64] {
        self.rates.wage_growth_rates()
    }

    /// Every parameter's metadata with its value for the current year.
    pub fn metadata(&self) -> Result<MetadataSnapshot> {
        let year = self.clock.current_year().to_string();
        let mut snapshot = MetadataSnapshot::new();
        for param in self.table.iter() {
            let extra = param
                .extra
                .iter()
                .filter(|(key, _)| !SNAPSHOT_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            snapshot.insert(
                param.name.clone(),
                ParameterSnapshot {
                    start_year: year.clone(),
                    value_yrs: vec![year.clone()],
                    value: self.value(&param.name)?,
                    value_type: param.value_type,
                    indexed: param.indexed,
                    indexable: param.indexable,
                    vi_vals: param.vi_vals.clone(),
                    valid_values: param.valid_values.clone(),
                    invalid_minmsg: param.invalid_minmsg.clone(),
                    invalid_maxmsg: param.invalid_maxmsg.clone(),
                    invalid_action: param.invalid_action,
                    extra,
                },
            );
        }
        Ok(snapshot)
    }

    /// Warnings of the latest revision, one per line.
    pub fn parameter_warnings(&self) -> String {
        self.diagnostics.warning_text()
    }

    /// Errors of the latest revision, one per line.
    pub fn parameter_errors(&self) -> String {
        self.diagnostics.error_text()
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        self.diagnostics.warnings()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.diagnostics.errors()
    }

    // ------------------------------------------------------------------
    // Revisions
    // ------------------------------------------------------------------

    /// Apply a revision and validate the result.
    ///
    /// Fails without mutating anything if a revision year lies outside
    /// `[current_year, end_year]` or if structural validation finds errors.
    /// Otherwise every year is installed, the cursor is restored, and the
    /// revised parameters are checked against their bounds. Range warnings
    /// are logged when `print_warnings` is set; range errors are returned as
    /// [`Error::RangeViolation`] when `raise_on_error` is set. Either way the
    /// revised values stay in place and the diagnostics stay readable.
    #[instrument(skip_all, fields(current_year = self.clock.current_year()))]
    pub fn apply_revision(
        &mut self,
        revision: &Revision,
        print_warnings: bool,
        raise_on_error: bool,
    ) -> Result<()> {
        if revision.is_empty() {
            debug!("empty revision ignored");
            return Ok(());
        }
        let batches = revision.by_year();
        let (Some(&first), Some(&last)) = (batches.keys().next(), batches.keys().next_back())
        else {
            return Ok(());
        };
        let current = self.clock.current_year();
        let end = self.clock.end_year();
        for year in [first, last] {
            if year < current || year > end {
                return Err(Error::YearOutOfRange {
                    year,
                    min: current,
                    max: end,
                });
            }
        }

        self.diagnostics.clear();
        validate_structure(&batches, &self.table, &self.removed, &mut self.diagnostics);
        if self.diagnostics.has_errors() {
            return Err(Error::InvalidRevision {
                report: self.diagnostics.error_text(),
            });
        }

        let replayed = self.replay(&batches);
        self.clock.set_year(current)?;
        replayed?;

        let revised: BTreeSet<String> = batches
            .values()
            .flat_map(|batch| batch.keys())
            .filter_map(|key| match key {
                RevisionKey::Value(name) => Some(name.clone()),
                RevisionKey::Indexed(_) => None,
            })
            .collect();
        validate_values(
            &revised,
            &self.table,
            &self.store,
            &self.clock,
            &self.redefined,
            &mut self.diagnostics,
        )?;

        if print_warnings {
            for diagnostic in self.diagnostics.warnings() {
                warn!(kind = ?diagnostic.kind, name = %diagnostic.name, "{}", diagnostic);
            }
        }
        info!(
            years = batches.len(),
            parameters = revised.len(),
            warnings = self.diagnostics.warnings().len(),
            errors = self.diagnostics.errors().len(),
            "revision applied"
        );
        if raise_on_error && self.diagnostics.has_errors() {
            return Err(Error::RangeViolation {
                report: self.diagnostics.error_text(),
            });
        }
        Ok(())
    }

    fn replay(&mut self, batches: &BTreeMap<i32, YearBatch>) -> Result<()> {
        if let Some(known) = self.apply_cpi_offset_in_revision(batches)? {
            self.set_default_vals(&KnownYears::PerParameter(known))?;
        }
        for (&year, batch) in batches {
            self.clock.set_year(year)?;
            self.update_for_year(year, batch)?;
        }
        Ok(())
    }

    /// Install one year's worth of revised entries.
    ///
    /// The cursor must already be at `year`. Every value is re-expanded
    /// from `year` to the end of the horizon and spliced over the stored
    /// series; earlier years are never touched. A `name-indexed` switch in
    /// the same batch takes effect before its value is expanded. A switch
    /// without a value re-expands from the value already stored at `year`.
    ///
    /// Entries are not validated here; [`Parameters::apply_revision`] is the
    /// checked entry point.
    pub fn update_for_year(&mut self, year: i32, batch: &YearBatch) -> Result<()> {
        let current = self.clock.current_year();
        if year != current {
            return Err(Error::YearOutOfRange {
                year,
                min: current,
                max: current,
            });
        }
        let offset = self.clock.offset(year);
        let remaining = self.clock.remaining_from(year);

        for (key, value) in batch {
            let RevisionKey::Value(name) = key else {
                continue;
            };
            if let Some(switch) = batch.get(&RevisionKey::Indexed(name.clone())) {
                self.table.set_indexed(name, indexed_switch(key, switch)?)?;
            }
            self.install(name, &value.to_raw(), offset, remaining)?;
        }

        for (key, switch) in batch {
            let RevisionKey::Indexed(name) = key else {
                continue;
            };
            if batch.contains_key(&RevisionKey::Value(name.clone())) {
                continue;
            }
            self.table.set_indexed(name, indexed_switch(key, switch)?)?;
            let stored = self
                .store
                .get(name)
                .and_then(|series| series.raw_at(offset))
                .ok_or_else(|| Error::UnknownParameter(name.clone()))?;
            self.install(name, &stored, offset, remaining)?;
        }
        debug!(year, entries = batch.len(), "year replayed");
        Ok(())
    }

    /// Expand `raw` over the `remaining` years from `offset` and splice it in.
    fn install(&mut self, name: &str, raw: &RawValue, offset: usize, remaining: usize) -> Result<()> {
        let param = self
            .table
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        let rates = self.rates.rates_from(name, offset, remaining);
        let series = expand_array(name, raw, param.value_type, param.indexed, rates, remaining)?;
        self.store.splice(name, offset, series)
    }

    /// Re-base inflation on a revised `CPI_offset`.
    ///
    /// Replays only the offset entries, adds the revised offset into the
    /// inflation rates from its first revised year onward, and returns how
    /// many law-default years each indexed parameter keeps. `None` when the
    /// revision leaves the offset alone.
    fn apply_cpi_offset_in_revision(
        &mut self,
        batches: &BTreeMap<i32, YearBatch>,
    ) -> Result<Option<IndexMap<String, usize>>> {
        let offset_key = RevisionKey::Value(CPI_OFFSET.to_string());
        let mut first_year = None;
        for (&year, batch) in batches {
            let Some(value) = batch.get(&offset_key) else {
                continue;
            };
            first_year.get_or_insert(year);
            self.clock.set_year(year)?;
            let mut single = YearBatch::new();
            single.insert(offset_key.clone(), value.clone());
            self.update_for_year(year, &single)?;
        }
        let Some(first_year) = first_year else {
            return Ok(None);
        };

        let offsets = self
            .store
            .get(CPI_OFFSET)
            .and_then(Series::as_reals)
            .ok_or_else(|| Error::type_mismatch(CPI_OFFSET, "offset series is not real"))?
            .to_vec();
        self.rates
            .add_cpi_offset(&offsets, self.clock.offset(first_year), self.clock.num_years())?;

        let touched = batches
            .values()
            .flat_map(|batch| batch.keys())
            .map(RevisionKey::base_name);
        let known = known_years(first_year, &self.clock, &self.table, touched);
        info!(
            first_year,
            reverted = known.len(),
            "inflation rates re-based on revised CPI offset"
        );
        Ok(Some(known))
    }

    /// Rebuild series from law-default values.
    ///
    /// With [`KnownYears::All`] every parameter is rebuilt from all of its
    /// default values. With [`KnownYears::PerParameter`] only the listed
    /// parameters are rebuilt, each from its leading default values.
    fn set_default_vals(&mut self, known: &KnownYears) -> Result<()> {
        let num_years = self.clock.num_years();
        for param in self.table.iter() {
            let raw = match known {
                KnownYears::All => param.value.clone(),
                KnownYears::PerParameter(counts) => match counts.get(&param.name) {
                    Some(&count) => param.value.truncated(count),
                    None => continue,
                },
            };
            let rates = param
                .indexed
                .then(|| self.rates.rates_for(&param.name));
            let series = expand_array(
                &param.name,
                &raw,
                param.value_type,
                param.indexed,
                rates,
                num_years,
            )?;
            self.store.insert(param.name.clone(), series);
        }
        Ok(())
    }
}

fn indexed_switch(key: &RevisionKey, value: &RevisionValue) -> Result<bool> {
    match value {
        RevisionValue::Scalar(Scalar::Boolean(flag)) => Ok(*flag),
        other => Err(Error::type_mismatch(
            key.to_string(),
            format!("value {other} is not true or false"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Bound, BoundKind, ParameterMetadata};
    use crate::validate::IssueKind;

    fn cells(values: &[f64]) -> RawValue {
        RawValue::Cells(values.iter().map(|v| Scalar::Real(*v)).collect())
    }

    fn table() -> MetadataTable {
        MetadataTable::from_params([
            ParameterMetadata::new(
                "exemption",
                ValueType::Real,
                RawValue::Rows(vec![vec![1000.0.into(), 2000.0.into()]]),
            )
            .with_labels(["single", "joint"])
            .indexed(true),
            ParameterMetadata::new("rate", ValueType::Real, cells(&[0.1]))
                .with_bound(BoundKind::Min, Bound::Literal(0.0))
                .with_bound(BoundKind::Max, Bound::Literal(1.0)),
            ParameterMetadata::new("amount", ValueType::Real, cells(&[100.0])).indexed(true),
            ParameterMetadata::new("threshold", ValueType::Real, cells(&[50.0]))
                .indexable(true)
                .with_bound(BoundKind::Min, Bound::Literal(0.0))
                .with_action(InvalidAction::Warn),
            ParameterMetadata::new("earnings_cap", ValueType::Real, cells(&[1000.0])).indexed(true),
            ParameterMetadata::new("flag", ValueType::Boolean, RawValue::Cells(vec![true.into()])),
            ParameterMetadata::new("count", ValueType::Integer, RawValue::Cells(vec![2_i64.into()]))
                .with_bound(BoundKind::Min, Bound::Literal(0.0)),
            ParameterMetadata::new(CPI_OFFSET, ValueType::Real, cells(&[0.0])),
        ])
        .unwrap()
    }

    fn params() -> Parameters {
        Parameters::builder(table(), 2020, 5)
            .rates(RateSeries {
                inflation_rates: vec![0.02; 5],
                wage_growth_rates: vec![0.03; 5],
            })
            .wage_indexed(["earnings_cap"])
            .removed([("old_credit", "was repealed in 2019")])
            .redefined([("rate", "rate now applies to net income")])
            .build()
            .unwrap()
    }

    fn reals(params: &Parameters, name: &str) -> Vec<f64> {
        params.series(name).unwrap().as_reals().unwrap().to_vec()
    }

    #[test]
    fn test_build_expands_defaults() {
        let params = params();
        assert_eq!(reals(&params, "amount"), vec![100.0, 102.0, 104.04, 106.12, 108.24]);
        assert_eq!(reals(&params, "threshold"), vec![50.0; 5]);
        assert_eq!(reals(&params, "earnings_cap")[..3], [1000.0, 1030.0, 1060.9]);
        assert_eq!(params.current_year(), 2020);
        assert_eq!(params.end_year(), 2024);
        assert_eq!(params.last_known_year(), 2020);
        assert_eq!(params.value("flag").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_build_requires_rates_for_indexed_parameters() {
        let err = Parameters::builder(table(), 2020, 5)
            .rates(RateSeries {
                inflation_rates: vec![0.02; 3],
                wage_growth_rates: vec![0.03; 5],
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientRates { needed: 5, available: 3 }));
    }

    #[test]
    fn test_build_folds_default_cpi_offset() {
        let table = MetadataTable::from_params([
            ParameterMetadata::new("amount", ValueType::Real, cells(&[100.0])).indexed(true),
            ParameterMetadata::new(CPI_OFFSET, ValueType::Real, cells(&[0.0, -0.005])),
        ])
        .unwrap();
        let params = Parameters::builder(table, 2020, 4)
            .rates(RateSeries {
                inflation_rates: vec![0.02; 4],
                wage_growth_rates: vec![],
            })
            .build()
            .unwrap();
        assert_eq!(params.inflation_rates(), &[0.02, 0.015, 0.015, 0.015]);
        assert_eq!(reals(&params, "amount")[..2], [100.0, 102.0]);
    }

    #[test]
    fn test_set_year_boundaries() {
        let mut params = params();
        params.set_year(2024).unwrap();
        assert_eq!(params.value("amount").unwrap().as_real(), Some(108.24));
        assert!(matches!(
            params.set_year(2025),
            Err(Error::YearOutOfRange { .. })
        ));
        assert!(params.set_year(2019).is_err());
        assert_eq!(params.current_year(), 2024);
    }

    #[test]
    fn test_empty_revision_is_noop() {
        let mut params = params();
        params
            .apply_revision(&Revision::new().with("rate", 2021, -1.0), false, false)
            .unwrap();
        let errors = params.parameter_errors();
        assert!(!errors.is_empty());
        params.set_year(2022).unwrap();
        let before: Vec<(String, Series)> = params
            .table()
            .names()
            .map(|name| (name.to_string(), params.series(name).unwrap().clone()))
            .collect();

        params.apply_revision(&Revision::new(), true, true).unwrap();
        assert_eq!(params.parameter_errors(), errors);
        assert_eq!(params.current_year(), 2022);
        for (name, series) in &before {
            assert_eq!(params.series(name).unwrap(), series, "{name} changed");
        }
        assert_eq!(params.inflation_rates(), &[0.02; 5]);
    }

    #[test]
    fn test_early_and_late_years_rejected_without_mutation() {
        let mut params = params();
        params.set_year(2022).unwrap();
        let before = params.series("amount").unwrap().clone();

        let early = Revision::new().with("amount", 2021, 1.0).with("amount", 2023, 1.0);
        assert!(matches!(
            params.apply_revision(&early, false, true),
            Err(Error::YearOutOfRange { year: 2021, min: 2022, max: 2024 })
        ));
        let late = Revision::new().with("amount", 2025, 1.0);
        assert!(matches!(
            params.apply_revision(&late, false, true),
            Err(Error::YearOutOfRange { year: 2025, .. })
        ));
        assert_eq!(params.series("amount").unwrap(), &before);
    }

    #[test]
    fn test_revised_value_reindexes_forward() {
        let mut params = params();
        params.set_year(2021).unwrap();
        params
            .apply_revision(&Revision::new().with("amount", 2022, 200.0), false, true)
            .unwrap();
        assert_eq!(reals(&params, "amount"), vec![100.0, 102.0, 200.0, 204.0, 208.08]);
        assert_eq!(params.current_year(), 2021);
    }

    #[test]
    fn test_indexed_switch_in_same_year() {
        let mut params = params();
        let revision = Revision::new()
            .with("amount", 2022, 200.0)
            .with("amount-indexed", 2022, false);
        params.apply_revision(&revision, false, true).unwrap();
        assert_eq!(reals(&params, "amount"), vec![100.0, 102.0, 200.0, 200.0, 200.0]);
        assert!(!params.is_indexed("amount").unwrap());
    }

    #[test]
    fn test_indexed_switch_alone_expands_stored_value() {
        let mut params = params();
        params
            .apply_revision(&Revision::new().with("amount-indexed", 2022, false), false, true)
            .unwrap();
        assert_eq!(reals(&params, "amount"), vec![100.0, 102.0, 104.04, 104.04, 104.04]);

        params
            .apply_revision(&Revision::new().with("threshold-indexed", 2023, true), false, true)
            .unwrap();
        assert_eq!(reals(&params, "threshold"), vec![50.0, 50.0, 50.0, 50.0, 51.0]);
        assert!(params.is_indexed("threshold").unwrap());
    }

    #[test]
    fn test_wage_indexed_parameter_uses_wage_growth() {
        let mut params = params();
        params
            .apply_revision(&Revision::new().with("earnings_cap", 2022, 2000.0), false, true)
            .unwrap();
        assert_eq!(reals(&params, "earnings_cap")[2..], [2000.0, 2060.0, 2121.8]);
    }

    #[test]
    fn test_vector_and_integer_revisions() {
        let mut params = params();
        let revision = Revision::new()
            .with("exemption", 2021, vec![1500.0, 3000.0])
            .with("count", 2023, 5_i64);
        params.apply_revision(&revision, false, true).unwrap();

        params.set_year(2022).unwrap();
        assert_eq!(
            params.value("exemption").unwrap().as_real_row(),
            Some(vec![1530.0, 3060.0])
        );
        assert_eq!(params.value("count").unwrap().as_integer(), Some(2));
        params.set_year(2024).unwrap();
        assert_eq!(params.value("count").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn test_structural_errors_leave_store_untouched() {
        let mut params = params();
        let revision = Revision::new()
            .with("amount", 2021, 1.0)
            .with("rate", 2021, true)
            .with("old_credit", 2022, 1.0)
            .with("rate-indexed", 2022, true);
        let err = params.apply_revision(&revision, false, false).unwrap_err();
        let Error::InvalidRevision { report } = err else {
            panic!("expected InvalidRevision, got {err:?}");
        };
        assert_eq!(
            report,
            "ERROR: 2021 rate value true is not a number\n\
             ERROR: 2022 old_credit was repealed in 2019\n\
             ERROR: 2022 rate parameter is not indexable\n"
        );
        assert_eq!(reals(&params, "amount")[1], 102.0);
        assert_eq!(params.errors().len(), 3);
    }

    #[test]
    fn test_range_violation_is_committed_then_raised() {
        let mut params = params();
        let revision = Revision::new().with("rate", 2021, 1.5);
        let err = params.apply_revision(&revision, false, true).unwrap_err();
        assert!(matches!(err, Error::RangeViolation { .. }));
        assert_eq!(reals(&params, "rate"), vec![0.1, 1.5, 1.5, 1.5, 1.5]);
        assert!(params
            .parameter_errors()
            .starts_with("ERROR: 2021 rate value 1.5 > max value 1\n"));
        assert_eq!(params.errors()[0].kind, IssueKind::RangeViolation);
        assert_eq!(params.warnings()[0].kind, IssueKind::Redefined);

        let mut lenient = self::params();
        lenient.apply_revision(&revision, false, false).unwrap();
        assert_eq!(lenient.errors().len(), 4);
    }

    #[test]
    fn test_warn_action_does_not_raise() {
        let mut params = params();
        params
            .apply_revision(&Revision::new().with("threshold", 2024, -5.0), true, true)
            .unwrap();
        assert_eq!(
            params.parameter_warnings(),
            "WARNING: 2024 threshold value -5 < min value 0\n"
        );
        assert!(params.parameter_errors().is_empty());
    }

    #[test]
    fn test_cpi_offset_rebases_indexed_parameters() {
        let mut params = params();
        params
            .apply_revision(&Revision::new().with(CPI_OFFSET, 2022, -0.01), false, true)
            .unwrap();
        assert_eq!(params.inflation_rates(), &[0.02, 0.02, 0.01, 0.01, 0.01]);
        assert_eq!(reals(&params, "amount"), vec![100.0, 102.0, 104.04, 105.08, 106.13]);
        assert_eq!(reals(&params, "earnings_cap")[..2], [1000.0, 1030.0]);
        assert_eq!(reals(&params, CPI_OFFSET), vec![0.0, 0.0, -0.01, -0.01, -0.01]);
    }

    #[test]
    fn test_cpi_offset_untouched_parameters_match_across_revisions() {
        let mut plain = params();
        plain
            .apply_revision(&Revision::new().with(CPI_OFFSET, 2022, -0.01), false, true)
            .unwrap();
        let mut combined = params();
        let revision = Revision::new()
            .with(CPI_OFFSET, 2022, -0.01)
            .with("rate", 2023, 0.2);
        combined.apply_revision(&revision, false, true).unwrap();
        assert_eq!(
            plain.series("amount").unwrap(),
            combined.series("amount").unwrap()
        );
        assert_eq!(plain.inflation_rates(), combined.inflation_rates());
    }

    #[test]
    fn test_cpi_offset_touched_parameter_keeps_fewer_years() {
        let table = MetadataTable::from_params([
            ParameterMetadata::new("amount", ValueType::Real, cells(&[100.0, 110.0, 120.0]))
                .indexed(true),
            ParameterMetadata::new("other", ValueType::Real, cells(&[100.0, 110.0, 120.0]))
                .indexed(true),
            ParameterMetadata::new(CPI_OFFSET, ValueType::Real, cells(&[0.0])),
        ])
        .unwrap();
        let mut params = Parameters::builder(table, 2020, 4)
            .last_known_year(2022)
            .rates(RateSeries {
                inflation_rates: vec![0.1; 4],
                wage_growth_rates: vec![],
            })
            .build()
            .unwrap();
        let revision = Revision::new()
            .with(CPI_OFFSET, 2021, 0.0)
            .with("amount-indexed", 2023, true);
        params.apply_revision(&revision, false, true).unwrap();
        assert_eq!(reals(&params, "amount"), vec![100.0, 110.0, 121.0, 133.1]);
        assert_eq!(reals(&params, "other"), vec![100.0, 110.0, 120.0, 132.0]);
    }

    #[test]
    fn test_update_for_year_requires_cursor() {
        let mut params = params();
        let batch = Revision::new().with("amount", 2022, 1.0).by_year().remove(&2022).unwrap();
        assert!(matches!(
            params.update_for_year(2022, &batch),
            Err(Error::YearOutOfRange { .. })
        ));
        params.set_year(2022).unwrap();
        params.update_for_year(2022, &batch).unwrap();
        assert_eq!(reals(&params, "amount")[2..], [1.0, 1.02, 1.04]);
    }

    #[test]
    fn test_metadata_snapshot_for_current_year() {
        let mut params = params();
        params.set_year(2022).unwrap();
        let snapshot = params.metadata().unwrap();
        let amount = &snapshot["amount"];
        assert_eq!(amount.start_year, "2022");
        assert_eq!(amount.value_yrs, vec!["2022"]);
        assert_eq!(amount.value.as_real(), Some(104.04));
        assert!(amount.indexed);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["exemption"]["vi_vals"], serde_json::json!(["single", "joint"]));
        assert_eq!(json["flag"]["value"], serde_json::json!(true));
        assert!(json["flag"].get("valid_values").is_none());

        let threshold = &json["threshold"];
        assert_eq!(threshold["valid_values"], serde_json::json!({"min": 0.0}));
        assert_eq!(threshold["invalid_action"], "warn");
        assert_eq!(json["rate"]["valid_values"], serde_json::json!({"min": 0.0, "max": 1.0}));
    }
}
