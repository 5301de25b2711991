//! Parameter families.
//!
//! A family is one concrete parameter set (policy, behavior, growth
//! assumptions, ...) served by the generic engine. It supplies the defaults
//! document, the horizon, the rate series and the registries; everything
//! else is shared.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::config::FamilyConfig;
use crate::engine::Parameters;
use crate::error::Result;
use crate::indexing::RateSeries;
use crate::metadata::MetadataTable;
use crate::revision::{read_json_revision, Revision};

/// Strategy describing one parameter family.
pub trait ParameterFamily {
    /// Family name, also the top-level key of compound revision documents.
    fn name(&self) -> &str;

    /// Load the defaults document.
    fn metadata(&self) -> Result<MetadataTable>;

    fn start_year(&self) -> i32;

    fn num_years(&self) -> usize;

    fn last_known_year(&self) -> Option<i32> {
        None
    }

    fn rates(&self) -> RateSeries {
        RateSeries::default()
    }

    fn wage_indexed(&self) -> Vec<String> {
        Vec::new()
    }

    fn removed(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn redefined(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    /// Read a revision for this family from a `.json` path or JSON text.
    fn read_revision(&self, source: Option<&str>) -> Result<Revision> {
        read_json_revision(source, self.name())
    }
}

/// Where a [`JsonFamily`] reads its defaults from.
#[derive(Debug, Clone)]
pub enum DefaultsSource {
    Path(PathBuf),
    Text(String),
}

/// A family described by a [`FamilyConfig`] plus a JSON defaults document.
#[derive(Debug, Clone)]
pub struct JsonFamily {
    config: FamilyConfig,
    defaults: DefaultsSource,
}

impl JsonFamily {
    pub fn new(config: FamilyConfig, defaults: DefaultsSource) -> Self {
        Self { config, defaults }
    }

    /// Load the family document from `family` and defaults from `defaults`.
    pub fn from_paths(family: impl AsRef<Path>, defaults: impl Into<PathBuf>) -> Result<Self> {
        let config = FamilyConfig::from_path(family)?;
        Ok(Self::new(config, DefaultsSource::Path(defaults.into())))
    }

    pub fn config(&self) -> &FamilyConfig {
        &self.config
    }
}

impl ParameterFamily for JsonFamily {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn metadata(&self) -> Result<MetadataTable> {
        match &self.defaults {
            DefaultsSource::Path(path) => {
                debug!(path = %path.display(), "loading defaults");
                MetadataTable::from_path(path)
            }
            DefaultsSource::Text(text) => MetadataTable::from_json_str(text),
        }
    }

    fn start_year(&self) -> i32 {
        self.config.start_year
    }

    fn num_years(&self) -> usize {
        self.config.num_years
    }

    fn last_known_year(&self) -> Option<i32> {
        self.config.last_known_year
    }

    fn rates(&self) -> RateSeries {
        self.config.rates.clone()
    }

    fn wage_indexed(&self) -> Vec<String> {
        self.config.wage_indexed.clone()
    }

    fn removed(&self) -> IndexMap<String, String> {
        self.config.removed.clone()
    }

    fn redefined(&self) -> IndexMap<String, String> {
        self.config.redefined.clone()
    }
}

impl Parameters {
    /// Build an engine for `family`.
    pub fn from_family<F: ParameterFamily + ?Sized>(family: &F) -> Result<Parameters> {
        let mut builder = Parameters::builder(family.metadata()?, family.start_year(), family.num_years())
            .rates(family.rates())
            .wage_indexed(family.wage_indexed())
            .removed(family.removed())
            .redefined(family.redefined());
        if let Some(year) = family.last_known_year() {
            builder = builder.last_known_year(year);
        }
        builder.build()
    }
}
