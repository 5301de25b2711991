//! Integration test harness for Horizon.
//!
//! This crate provides utilities for end-to-end testing of the full
//! parameter pipeline: Load family → Expand defaults → Apply revision → Query.

use std::path::PathBuf;

use horizon_params::{
    DefaultsSource, FamilyConfig, JsonFamily, ParameterFamily, Parameters, Result,
};

/// Test harness wrapping a parameter family and its engine.
pub struct TestHarness {
    family: JsonFamily,
    params: Parameters,
}

impl TestHarness {
    /// Path of a file under this crate's `fixtures/` directory.
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    /// Create a harness from `fixtures/family.json` and `fixtures/defaults.json`.
    ///
    /// # Panics
    ///
    /// Panics if either document fails to load.
    pub fn from_fixtures() -> Self {
        let family = JsonFamily::from_paths(
            Self::fixture_path("family.json"),
            Self::fixture_path("defaults.json"),
        )
        .expect("fixture family failed to load");
        Self::from_family(family)
    }

    /// Create a harness from inline family and defaults documents.
    ///
    /// # Panics
    ///
    /// Panics if either document is invalid.
    pub fn from_documents(family: &str, defaults: &str) -> Self {
        let config = FamilyConfig::from_json_str(family).expect("invalid family document");
        Self::from_family(JsonFamily::new(
            config,
            DefaultsSource::Text(defaults.to_string()),
        ))
    }

    fn from_family(family: JsonFamily) -> Self {
        let params = match Parameters::from_family(&family) {
            Ok(params) => params,
            Err(err) => panic!("parameter initialization failed: {err}"),
        };
        Self { family, params }
    }

    /// Apply a revision (path or inline JSON), raising on range errors.
    pub fn apply(&mut self, source: &str) -> Result<()> {
        let revision = self.family.read_revision(Some(source))?;
        self.params.apply_revision(&revision, false, true)
    }

    /// Apply a revision (path or inline JSON), keeping range errors as
    /// diagnostics only.
    pub fn apply_lenient(&mut self, source: &str) -> Result<()> {
        let revision = self.family.read_revision(Some(source))?;
        self.params.apply_revision(&revision, false, false)
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// Full series of a real scalar parameter.
    ///
    /// # Panics
    ///
    /// Panics if the parameter is unknown or not a real scalar.
    pub fn real_series(&self, name: &str) -> Vec<f64> {
        self.params
            .series(name)
            .ok()
            .and_then(|series| series.as_reals())
            .unwrap_or_else(|| panic!("{name} is not a real scalar parameter"))
            .to_vec()
    }

    /// Value of a real scalar parameter in `year`; leaves the cursor there.
    pub fn real_at(&mut self, name: &str, year: i32) -> Option<f64> {
        self.params.set_year(year).ok()?;
        self.params.value(name).ok()?.as_real()
    }

    /// Row of a real vector parameter in `year`; leaves the cursor there.
    pub fn row_at(&mut self, name: &str, year: i32) -> Option<Vec<f64>> {
        self.params.set_year(year).ok()?;
        self.params.value(name).ok()?.as_real_row()
    }
}
