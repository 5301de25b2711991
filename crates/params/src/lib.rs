//! Horizon Parameters
//!
//! A versioned, time-indexed parameter store for policy simulation models.
//!
//! Parameters are declared in a defaults document with a few known years of
//! values. The engine expands them over the model horizon, compounding
//! indexed parameters against inflation or wage growth, and then applies
//! revisions: sparse, future-dated overrides replayed year by year and
//! validated against each parameter's declared type and bounds.
//!
//! ```ignore
//! let mut params = Parameters::from_family(&family)?;
//! params.apply_revision(&family.read_revision(Some("reform.json"))?, true, true)?;
//! params.set_year(2024)?;
//! let exemption = params.value("exemption")?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod expand;
pub mod family;
pub mod indexing;
pub mod metadata;
pub mod revision;
pub mod storage;
pub mod types;
pub mod validate;

pub use config::FamilyConfig;
pub use engine::{MetadataSnapshot, ParameterSnapshot, Parameters, ParametersBuilder};
pub use error::{Error, Result};
pub use family::{DefaultsSource, JsonFamily, ParameterFamily};
pub use indexing::{RateSeries, CPI_OFFSET};
pub use metadata::{
    Bound, BoundKind, InvalidAction, MetadataTable, ParameterMetadata, ValidValues,
};
pub use revision::{read_json_revision, Revision, RevisionKey, RevisionValue};
pub use types::{CurrentValue, RawValue, Scalar, Series, ValueType};
pub use validate::{Diagnostic, IssueKind, Severity};
